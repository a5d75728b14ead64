use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::error::{io_err, LauncherResult};
use crate::core::maven::MOJANG_LIBRARIES;

pub const SETTINGS_FILE: &str = "launcher_settings.json";

/// Every remote the engine talks to. Overridable so installs can be pointed
/// at mirrors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Endpoints {
    pub version_index: String,
    pub resources: String,
    pub libraries: String,
    pub fabric_meta: String,
    pub fabric_maven: String,
    pub quilt_meta: String,
    pub quilt_maven: String,
    pub forge_maven: String,
    pub java_runtime_api: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            version_index: "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json".into(),
            resources: "https://resources.download.minecraft.net".into(),
            libraries: MOJANG_LIBRARIES.into(),
            fabric_meta: "https://meta.fabricmc.net/v2".into(),
            fabric_maven: "https://maven.fabricmc.net".into(),
            quilt_meta: "https://meta.quiltmc.org/v3".into(),
            quilt_maven: "https://maven.quiltmc.org/repository/release".into(),
            forge_maven: "https://maven.minecraftforge.net".into(),
            java_runtime_api: "https://api.adoptium.net/v3".into(),
        }
    }
}

/// Where a content package is published.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageSource {
    pub name: String,
    /// Raw `modrinth.index.json`; its ETag is the cheap update check.
    pub index_url: String,
    /// Zip holding the index and override trees.
    pub archive_url: String,
    /// Directory prefix inside the archive, e.g. `modpack-main/`.
    #[serde(default)]
    pub archive_prefix: String,
    /// Optional files the user opted into, by path.
    #[serde(default)]
    pub optional_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSettings {
    pub concurrency: usize,
    pub retries: u32,
    pub retry_delay_ms: u64,
    /// Override files never replaced once they exist (user-editable config).
    pub protected_override_files: Vec<String>,
    pub install_java_runtime: bool,
    pub java_path: Option<PathBuf>,
    pub jvm_arguments: Vec<String>,
    pub max_memory_mb: u32,
    pub min_memory_mb: u32,
    pub custom_resolution: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub launcher_name: String,
    pub username: String,
    pub packages: Vec<PackageSource>,
    pub endpoints: Endpoints,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            concurrency: 8,
            retries: 3,
            retry_delay_ms: 1000,
            protected_override_files: vec!["options.txt".into()],
            install_java_runtime: true,
            java_path: None,
            jvm_arguments: Vec::new(),
            max_memory_mb: 4096,
            min_memory_mb: 1024,
            custom_resolution: false,
            window_width: 854,
            window_height: 480,
            launcher_name: "cubelaunch".into(),
            username: "Player".into(),
            packages: Vec::new(),
            endpoints: Endpoints::default(),
        }
    }
}

impl LauncherSettings {
    /// Settings from `<data_dir>/launcher_settings.json`; defaults when the
    /// file is missing or unreadable.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(SETTINGS_FILE);
        let Ok(raw) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring unreadable settings at {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self, data_dir: &Path) -> LauncherResult<()> {
        std::fs::create_dir_all(data_dir).map_err(io_err(data_dir))?;
        let path = data_dir.join(SETTINGS_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(io_err(&path))
    }

    pub fn package(&self, name: &str) -> Option<&PackageSource> {
        self.packages.iter().find(|p| p.name == name)
    }
}
