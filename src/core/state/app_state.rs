use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use tracing::info;

use crate::core::downloader::Downloader;
use crate::core::error::{io_err, LauncherError, LauncherResult};
use crate::core::http::{build_http_client, ResponseCache};
use crate::core::package::PackageManager;
use crate::core::version::VersionResolver;

use super::settings::{LauncherSettings, PackageSource};

const APP_DIR_NAME: &str = "cubelaunch";
const DATA_DIR_ENV: &str = "CUBELAUNCH_DATA_DIR";

/// Services shared by every command, built once from the data directory.
pub struct AppState {
    pub data_dir: PathBuf,
    pub settings: LauncherSettings,
    pub http_client: Client,
    pub cache: ResponseCache,
    pub downloader: Downloader,
    pub resolver: VersionResolver,
    pub packages: PackageManager,
}

impl AppState {
    pub fn new(data_dir: PathBuf) -> LauncherResult<Self> {
        std::fs::create_dir_all(&data_dir).map_err(io_err(&data_dir))?;
        let settings = LauncherSettings::load(&data_dir);

        let http_client = build_http_client()?;
        let cache = ResponseCache::new(http_client.clone());
        let downloader = Downloader::new(http_client.clone())
            .with_concurrency(settings.concurrency)
            .with_retries(settings.retries, Duration::from_millis(settings.retry_delay_ms));
        let resolver = VersionResolver::new(cache.clone(), &settings.endpoints.version_index);
        let packages = PackageManager::new(&data_dir, downloader.clone(), resolver.clone())
            .with_endpoints(settings.endpoints.clone())
            .with_protected_files(settings.protected_override_files.clone())
            .with_java(settings.java_path.clone())
            .with_runtime_install(settings.install_java_runtime);

        info!("Data directory: {:?}", data_dir);
        Ok(Self {
            data_dir,
            settings,
            http_client,
            cache,
            downloader,
            resolver,
            packages,
        })
    }

    pub fn package_source(&self, name: &str) -> LauncherResult<&PackageSource> {
        self.settings
            .package(name)
            .ok_or_else(|| LauncherError::PackageNotFound(name.to_string()))
    }

    pub fn save_settings(&self) -> LauncherResult<()> {
        self.settings.save(&self.data_dir)
    }
}

/// `$CUBELAUNCH_DATA_DIR`, else `<platform data dir>/cubelaunch`.
pub fn default_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}
