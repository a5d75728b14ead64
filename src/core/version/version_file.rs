// ─── Version File ───
// Typed view over a client version manifest (`versions/<id>/<id>.json`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::rules::{rules_allow, FeatureSet, Platform, Rule};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::MavenArtifact;

/// A parsed client version manifest. After inheritance resolution the parent
/// pointer is gone and `libraries` holds the merged list.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionManifest {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits_from: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub version_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_class: Option<String>,
    #[serde(default)]
    pub libraries: Vec<Library>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Arguments>,
    /// Legacy space-separated game arguments (pre-1.13).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minecraft_arguments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_index: Option<AssetIndexRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_version: Option<JavaVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<VersionDownloads>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<Logging>,
    /// Version whose jar this version launches with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jar: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersion {
    #[serde(default = "default_runtime_component")]
    pub component: String,
    pub major_version: u32,
}

fn default_runtime_component() -> String {
    "jre-legacy".into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VersionDownloads {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<DownloadArtifact>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadArtifact {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexRef {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Logging {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub argument: String,
    pub file: LoggingFile,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingFile {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
}

// ─── Arguments ───

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<Argument>,
    #[serde(default)]
    pub jvm: Vec<Argument>,
}

/// One entry of `arguments.game` / `arguments.jvm`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Argument {
    Plain(String),
    Conditional {
        #[serde(default)]
        rules: Vec<Rule>,
        #[serde(
            default,
            rename = "compatibilityRules",
            skip_serializing_if = "Vec::is_empty"
        )]
        compatibility_rules: Vec<Rule>,
        value: ArgumentValue,
    },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    One(String),
    Many(Vec<String>),
}

impl Argument {
    /// Tokens this entry contributes, or nothing when its rules reject the platform.
    pub fn tokens(&self, platform: &Platform, features: &FeatureSet) -> Vec<&str> {
        match self {
            Argument::Plain(s) => vec![s.as_str()],
            Argument::Conditional {
                rules,
                compatibility_rules,
                value,
            } => {
                if !rules_allow(compatibility_rules, platform, features)
                    || !rules_allow(rules, platform, features)
                {
                    return vec![];
                }
                match value {
                    ArgumentValue::One(s) => vec![s.as_str()],
                    ArgumentValue::Many(v) => v.iter().map(String::as_str).collect(),
                }
            }
        }
    }
}

// ─── Libraries ───

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Library {
    pub name: String,
    /// Maven repository base for libraries without `downloads`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<Rule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natives: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract: Option<ExtractRules>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LibraryDownloads {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<LibraryArtifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifiers: Option<BTreeMap<String, LibraryArtifact>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryArtifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExtractRules {
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Library {
    /// Coordinate without the version (`group:artifact[:classifier]` minus last part).
    pub fn name_without_version(&self) -> &str {
        match self.name.rfind(':') {
            Some(idx) => &self.name[..idx],
            None => &self.name,
        }
    }

    pub fn is_allowed(&self, platform: &Platform, features: &FeatureSet) -> bool {
        match &self.rules {
            Some(rules) => rules_allow(rules, platform, features),
            None => true,
        }
    }

    /// Native classifier for this platform with `${arch}` expanded, if any.
    pub fn native_classifier(&self, platform: &Platform) -> Option<String> {
        let natives = self.natives.as_ref()?;
        natives
            .get(platform.os)
            .map(|s| s.replace("${arch}", platform.arch_bits()))
            .filter(|s| !s.is_empty())
    }

    /// Absolute path of the main artifact under `libraries_dir`.
    pub fn artifact_path(&self, libraries_dir: &Path) -> LauncherResult<PathBuf> {
        let declared = self
            .downloads
            .as_ref()
            .and_then(|d| d.artifact.as_ref())
            .and_then(|a| a.path.as_deref());
        match declared {
            Some(path) => Ok(libraries_dir.join(path)),
            None => Ok(libraries_dir.join(MavenArtifact::parse(&self.name)?.local_path())),
        }
    }

    /// Absolute path of the native classifier artifact, if this platform has one.
    pub fn native_path(
        &self,
        libraries_dir: &Path,
        platform: &Platform,
    ) -> LauncherResult<Option<PathBuf>> {
        let Some(classifier) = self.native_classifier(platform) else {
            return Ok(None);
        };
        let declared = self
            .downloads
            .as_ref()
            .and_then(|d| d.classifiers.as_ref())
            .and_then(|c| c.get(&classifier))
            .and_then(|a| a.path.as_deref());
        if let Some(path) = declared {
            return Ok(Some(libraries_dir.join(path)));
        }

        let mut artifact = MavenArtifact::parse(&self.name)?;
        artifact.classifier = Some(classifier);
        Ok(Some(libraries_dir.join(artifact.local_path())))
    }

    pub fn native_artifact(&self, platform: &Platform) -> Option<&LibraryArtifact> {
        let classifier = self.native_classifier(platform)?;
        self.downloads
            .as_ref()?
            .classifiers
            .as_ref()?
            .get(&classifier)
    }

    pub fn exclusions(&self) -> &[String] {
        self.extract
            .as_ref()
            .map(|e| e.exclude.as_slice())
            .unwrap_or(&[])
    }
}

impl VersionManifest {
    pub fn parse(raw: &str) -> LauncherResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn main_class(&self) -> LauncherResult<&str> {
        self.main_class
            .as_deref()
            .ok_or_else(|| LauncherError::Other(format!("Version {} has no mainClass", self.id)))
    }

    /// Asset index name (`assets`, else the asset index id, else the version id).
    pub fn assets_name(&self) -> &str {
        self.assets
            .as_deref()
            .or(self.asset_index.as_ref().map(|a| a.id.as_str()))
            .unwrap_or(&self.id)
    }

    /// Name of the version directory whose jar is launched.
    pub fn jar_name(&self) -> &str {
        self.jar.as_deref().unwrap_or(&self.id)
    }

    /// Libraries whose rules allow this platform with no launch features.
    pub fn allowed_libraries<'a>(
        &'a self,
        platform: &'a Platform,
    ) -> impl Iterator<Item = &'a Library> + 'a {
        let none = FeatureSet::default();
        self.libraries
            .iter()
            .filter(move |lib| lib.is_allowed(platform, &none))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux() -> Platform {
        Platform {
            os: "linux",
            is_32bit: false,
            os_version: String::new(),
        }
    }

    #[test]
    fn parses_structured_arguments() {
        let parsed: VersionManifest = serde_json::from_value(serde_json::json!({
            "id": "test",
            "mainClass": "net.minecraft.client.main.Main",
            "arguments": {
                "game": [
                    "--username",
                    "${auth_player_name}",
                    {
                        "rules": [{"action": "allow", "os": {"name": "linux"}}],
                        "value": ["--demo"]
                    },
                    {
                        "rules": [{"action": "allow", "os": {"name": "windows"}}],
                        "value": "--should-not-appear"
                    }
                ]
            }
        }))
        .unwrap();

        let platform = linux();
        let tokens: Vec<&str> = parsed
            .arguments
            .as_ref()
            .unwrap()
            .game
            .iter()
            .flat_map(|a| a.tokens(&platform, &FeatureSet::default()))
            .collect();
        assert_eq!(tokens, vec!["--username", "${auth_player_name}", "--demo"]);
    }

    #[test]
    fn native_classifier_expands_arch() {
        let lib: Library = serde_json::from_value(serde_json::json!({
            "name": "org.lwjgl.lwjgl:lwjgl-platform:2.9.0",
            "natives": {"linux": "natives-linux", "windows": "natives-windows-${arch}"}
        }))
        .unwrap();

        assert_eq!(lib.native_classifier(&linux()).as_deref(), Some("natives-linux"));
        let windows = Platform {
            os: "windows",
            is_32bit: true,
            os_version: String::new(),
        };
        assert_eq!(
            lib.native_classifier(&windows).as_deref(),
            Some("natives-windows-32")
        );
    }

    #[test]
    fn native_path_falls_back_to_coordinate_layout() {
        let lib: Library = serde_json::from_value(serde_json::json!({
            "name": "org.lwjgl.lwjgl:lwjgl-platform:2.9.0",
            "natives": {"linux": "natives-linux"}
        }))
        .unwrap();
        let path = lib.native_path(Path::new("/libs"), &linux()).unwrap().unwrap();
        assert_eq!(
            path,
            PathBuf::from("/libs/org/lwjgl/lwjgl/lwjgl-platform/2.9.0/lwjgl-platform-2.9.0-natives-linux.jar")
        );
    }

    #[test]
    fn name_without_version_drops_last_segment() {
        let lib: Library = serde_json::from_value(serde_json::json!({"name": "org.ow2.asm:asm:9.6"})).unwrap();
        assert_eq!(lib.name_without_version(), "org.ow2.asm:asm");
    }

    #[test]
    fn assets_name_prefers_assets_field() {
        let m: VersionManifest = serde_json::from_value(serde_json::json!({
            "id": "1.20.1",
            "assets": "5",
            "assetIndex": {"id": "5", "url": "https://example.invalid/5.json"}
        }))
        .unwrap();
        assert_eq!(m.assets_name(), "5");
        assert_eq!(m.jar_name(), "1.20.1");
    }
}
