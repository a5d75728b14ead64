pub mod context;
mod direct;
pub mod fabric;
pub mod forge;
pub mod installer;
mod process;
pub mod quilt;
pub mod vanilla;

pub use context::InstallContext;
pub use direct::MetaVersion;
pub use forge::{find_forge_version, forge_to_installed_version, list_forge_versions, resolve_forge_version};
pub use installer::{InstallStage, Installer, LoaderInstallResult, LoaderInstaller, LoaderKind, StageTracker};
pub use vanilla::{install_version, logging_config_path};
