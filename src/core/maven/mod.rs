mod artifact;
mod metadata;

pub use artifact::MavenArtifact;
pub use metadata::MavenMetadata;

/// Library repository used when a manifest library has neither `downloads` nor `url`.
pub const MOJANG_LIBRARIES: &str = "https://libraries.minecraft.net";
