use std::path::PathBuf;

use crate::core::auth::LaunchIdentity;
use crate::core::version::FeatureSet;

/// Quick-play target, at most one per launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuickPlay {
    /// Path of the quick-play log file.
    Path(String),
    Singleplayer(String),
    Multiplayer(String),
    Realms(String),
}

/// Runtime choices for one launch.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub identity: LaunchIdentity,
    pub launcher_name: String,
    pub launcher_version: String,
    /// Explicit java binary; wins over the manifest runtime.
    pub executable_path: Option<PathBuf>,
    /// Used when neither an explicit nor a manifest runtime is available.
    pub default_executable_path: Option<PathBuf>,
    pub jvm_arguments: Vec<String>,
    /// Defaults to the Minecraft root.
    pub game_directory: Option<PathBuf>,
    pub natives_directory: Option<PathBuf>,
    pub custom_resolution: bool,
    pub resolution_width: u32,
    pub resolution_height: u32,
    pub demo: bool,
    pub quick_play: Option<QuickPlay>,
    pub server: Option<String>,
    pub port: Option<u16>,
    pub disable_multiplayer: bool,
    pub disable_chat: bool,
    pub enable_logging_config: bool,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            identity: LaunchIdentity::default(),
            launcher_name: "cubelaunch".into(),
            launcher_version: env!("CARGO_PKG_VERSION").into(),
            executable_path: None,
            default_executable_path: None,
            jvm_arguments: Vec::new(),
            game_directory: None,
            natives_directory: None,
            custom_resolution: false,
            resolution_width: 854,
            resolution_height: 480,
            demo: false,
            quick_play: None,
            server: None,
            port: None,
            disable_multiplayer: false,
            disable_chat: false,
            enable_logging_config: false,
        }
    }
}

impl LaunchOptions {
    /// Features conditional arguments are matched against.
    pub fn features(&self) -> FeatureSet {
        FeatureSet {
            custom_resolution: self.custom_resolution,
            demo_user: self.demo,
            quick_play_path: matches!(self.quick_play, Some(QuickPlay::Path(_))),
            quick_play_singleplayer: matches!(self.quick_play, Some(QuickPlay::Singleplayer(_))),
            quick_play_multiplayer: matches!(self.quick_play, Some(QuickPlay::Multiplayer(_))),
            quick_play_realms: matches!(self.quick_play, Some(QuickPlay::Realms(_))),
        }
    }
}
