pub mod index;
pub mod inherit;
pub mod resolver;
pub mod rules;
pub mod version_file;

pub use index::{VersionEntry, VersionIndex};
pub use resolver::{
    installed_versions, jar_path, manifest_path, resolve_local, ManifestSource, VersionResolver,
    MAX_INHERITANCE_DEPTH,
};
pub use rules::{rules_allow, FeatureSet, Platform, Rule, RuleAction};
pub use version_file::{Argument, Library, VersionManifest};
