// ─── Package Manager ───
// Install, update, verify and select content packages. Each package lives in
// `<data_dir>/<name>`, which is also the Minecraft root it launches from.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::Utc;
use reqwest::header::ETAG;
use tracing::{debug, error, info, warn};

use crate::core::downloader::{sha1_file, DownloadJob, Downloader};
use crate::core::error::{io_err, LauncherError, LauncherResult};
use crate::core::loaders::{resolve_forge_version, InstallContext, Installer, LoaderKind};
use crate::core::paths::normalize;
use crate::core::progress::{ProgressReporter, StatusOnly};
use crate::core::state::{Endpoints, PackageSource};
use crate::core::version::{Platform, VersionResolver};

use super::index::{PackageFile, PackageIndex, INDEX_FILE};
use super::overrides::{bundled_resource_packs, extract_overrides, merge_resource_packs};
use super::state::{InstalledPackage, PackagesState};

/// Copy of the index behind the last successful install.
pub const INDEX_SNAPSHOT: &str = "package.index.json";

#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// Leave the base game and loader alone.
    pub skip_dependencies: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    NotInstalled,
    UpToDate,
    UpdateAvailable { installed: String, remote: String },
}

/// A freshly fetched index plus its cache validator.
#[derive(Debug, Clone)]
pub struct RemoteIndex {
    pub index: PackageIndex,
    pub etag: Option<String>,
}

pub struct PackageManager {
    data_dir: PathBuf,
    downloader: Downloader,
    resolver: VersionResolver,
    endpoints: Endpoints,
    platform: Platform,
    protected_files: Vec<String>,
    java: Option<PathBuf>,
    install_runtime: bool,
}

impl PackageManager {
    pub fn new(data_dir: impl Into<PathBuf>, downloader: Downloader, resolver: VersionResolver) -> Self {
        Self {
            data_dir: data_dir.into(),
            downloader,
            resolver,
            endpoints: Endpoints::default(),
            platform: Platform::current(),
            protected_files: vec!["options.txt".into()],
            java: None,
            install_runtime: true,
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_protected_files(mut self, files: Vec<String>) -> Self {
        self.protected_files = files;
        self
    }

    pub fn with_java(mut self, java: Option<PathBuf>) -> Self {
        self.java = java;
        self
    }

    pub fn with_runtime_install(mut self, install: bool) -> Self {
        self.install_runtime = install;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn install_dir(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    pub async fn state(&self) -> PackagesState {
        PackagesState::load(&self.data_dir).await
    }

    // ── Remote index ──

    /// ETag of the remote index, `None` when the server sends none or the
    /// request fails.
    pub async fn fetch_etag(&self, source: &PackageSource) -> Option<String> {
        match self.downloader.client().head(&source.index_url).send().await {
            Ok(response) if response.status().is_success() => response
                .headers()
                .get(ETAG)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            Ok(response) => {
                warn!("HEAD {} returned {}", source.index_url, response.status());
                None
            }
            Err(e) => {
                warn!("Could not fetch ETag for {}: {}", source.name, e);
                None
            }
        }
    }

    pub async fn fetch_index(&self, source: &PackageSource) -> LauncherResult<RemoteIndex> {
        let etag = self.fetch_etag(source).await;
        let response = self.downloader.client().get(&source.index_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: source.index_url.clone(),
                status: status.as_u16(),
            });
        }
        let index: PackageIndex = serde_json::from_str(&response.text().await?)?;
        debug!("Remote index of {} is at {}", source.name, index.version_id);
        Ok(RemoteIndex { index, etag })
    }

    /// Compare the installed version with the remote one. An unchanged ETag
    /// answers without downloading the index.
    pub async fn check_for_update(&self, source: &PackageSource) -> LauncherResult<UpdateStatus> {
        let mut state = self.state().await;
        let Some(installed) = state.get(&source.name).cloned() else {
            return Ok(UpdateStatus::NotInstalled);
        };

        let latest = self.fetch_etag(source).await;
        if latest.is_some() && latest == installed.etag {
            debug!("Index of {} unchanged ({:?})", source.name, latest);
            return Ok(UpdateStatus::UpToDate);
        }

        let remote = self.fetch_index(source).await?;
        let remote_version = remote.index.version_id;
        if let Some(entry) = state.packages.get_mut(&source.name) {
            entry.remote_version = Some(remote_version.clone());
        }
        state.save(&self.data_dir).await?;

        if remote_version == installed.installed_version {
            Ok(UpdateStatus::UpToDate)
        } else {
            info!(
                "Update available for {}: {} -> {}",
                source.name, installed.installed_version, remote_version
            );
            Ok(UpdateStatus::UpdateAvailable {
                installed: installed.installed_version,
                remote: remote_version,
            })
        }
    }

    pub async fn is_up_to_date(&self, source: &PackageSource) -> LauncherResult<bool> {
        Ok(self.check_for_update(source).await? == UpdateStatus::UpToDate)
    }

    // ── Install / update ──

    /// Full install including the base game and loader. Failures are logged
    /// and reported as `false`.
    pub async fn install(&self, source: &PackageSource, progress: &dyn ProgressReporter) -> bool {
        self.run_logged("install", source, InstallOptions::default(), progress)
            .await
    }

    /// Re-run the pipeline against the latest index without touching the
    /// base game or loader.
    pub async fn update(&self, source: &PackageSource, progress: &dyn ProgressReporter) -> bool {
        let options = InstallOptions {
            skip_dependencies: true,
        };
        self.run_logged("update", source, options, progress).await
    }

    async fn run_logged(
        &self,
        action: &str,
        source: &PackageSource,
        options: InstallOptions,
        progress: &dyn ProgressReporter,
    ) -> bool {
        match self.install_with(source, options, progress).await {
            Ok(installed) => {
                info!("Package {} {} finished at {}", source.name, action, installed.installed_version);
                true
            }
            Err(e) => {
                error!("Package {} {} failed: {}", source.name, action, e);
                false
            }
        }
    }

    pub async fn install_with(
        &self,
        source: &PackageSource,
        options: InstallOptions,
        progress: &dyn ProgressReporter,
    ) -> LauncherResult<InstalledPackage> {
        progress.set_status(&format!("Fetching {}", source.name));
        let remote = self.fetch_index(source).await?;
        let (archive_path, mut archive) = self.open_archive(source, &remote.index.version_id, progress).await?;
        let index = read_archive_index(&mut archive, &source.archive_prefix)?;
        let install_dir = self.install_dir(&source.name);
        tokio::fs::create_dir_all(&install_dir)
            .await
            .map_err(io_err(&install_dir))?;

        let files = index.client_files(&source.optional_files);
        remove_stale_mods(&install_dir, &files).await?;

        progress.set_status(&format!("Downloading {} files", files.len()));
        let jobs = files
            .iter()
            .filter_map(|file| download_job(file, &install_dir))
            .collect();
        let fetched = self.downloader.download_all(jobs, progress).await?;
        debug!("Fetched {} package files for {}", fetched, source.name);

        let extracted = extract_overrides(&mut archive, &source.archive_prefix, &install_dir, &self.protected_files)?;
        debug!("Extracted {} override files", extracted);
        let packs = bundled_resource_packs(&archive, &source.archive_prefix);
        merge_resource_packs(&install_dir.join("options.txt"), &packs)?;
        drop(archive);

        let previous = self.state().await.get(&source.name).cloned();
        let (launch_version, loader_version) = if options.skip_dependencies {
            reuse_launch_version(&index, previous.as_ref())?
        } else {
            self.install_dependencies(&index, &install_dir, progress).await?
        };

        if !verify_files(&install_dir, &files).await? {
            return Err(LauncherError::Other(format!(
                "Verification of {} failed after install",
                source.name
            )));
        }

        let snapshot = install_dir.join(INDEX_SNAPSHOT);
        tokio::fs::write(&snapshot, serde_json::to_string_pretty(&index)?)
            .await
            .map_err(io_err(&snapshot))?;

        let installed = InstalledPackage {
            name: source.name.clone(),
            installed_version: index.version_id.clone(),
            remote_version: Some(remote.index.version_id.clone()),
            base_version: index.minecraft_version()?.to_string(),
            loader: index.loader().map(|(kind, _)| kind).unwrap_or(LoaderKind::Vanilla),
            loader_version,
            launch_version,
            etag: remote.etag,
            updated_at: Utc::now(),
        };
        let mut state = self.state().await;
        state.packages.insert(source.name.clone(), installed.clone());
        state.save(&self.data_dir).await?;

        if let Err(e) = tokio::fs::remove_file(&archive_path).await {
            warn!("Could not remove {:?}: {}", archive_path, e);
        }
        Ok(installed)
    }

    /// Open the cached archive. One that does not read as a zip (left behind
    /// by an interrupted run) is deleted and downloaded again.
    async fn open_archive(
        &self,
        source: &PackageSource,
        version: &str,
        progress: &dyn ProgressReporter,
    ) -> LauncherResult<(PathBuf, zip::ZipArchive<File>)> {
        let path = self.ensure_archive(source, version, progress).await?;
        match read_zip(&path) {
            Ok(archive) => Ok((path, archive)),
            Err(e) => {
                warn!("Archive {:?} is unreadable ({}), downloading it again", path, e);
                tokio::fs::remove_file(&path).await.map_err(io_err(&path))?;
                let path = self.ensure_archive(source, version, progress).await?;
                let archive = read_zip(&path)?;
                Ok((path, archive))
            }
        }
    }

    /// `<data_dir>/archives/<name>-<version>.<ext>`, downloaded when missing.
    async fn ensure_archive(
        &self,
        source: &PackageSource,
        version: &str,
        progress: &dyn ProgressReporter,
    ) -> LauncherResult<PathBuf> {
        let extension = if source.archive_url.ends_with(".mrpack") { "mrpack" } else { "zip" };
        let path = self
            .data_dir
            .join("archives")
            .join(format!("{}-{}.{}", source.name, version, extension));
        let job = DownloadJob::new(&source.archive_url, &path, &self.data_dir);
        self.downloader.download(&job, false, &StatusOnly(progress)).await?;
        Ok(path)
    }

    /// Install the base game and the declared loader into the package root.
    /// Returns the launch version id and the installed loader version.
    async fn install_dependencies(
        &self,
        index: &PackageIndex,
        root: &Path,
        progress: &dyn ProgressReporter,
    ) -> LauncherResult<(String, Option<String>)> {
        let minecraft = index.minecraft_version()?;
        let (kind, declared) = match index.loader() {
            Some((kind, version)) => (kind, Some(version)),
            None => (LoaderKind::Vanilla, None),
        };

        let loader_version = match (kind, declared) {
            (LoaderKind::Forge, Some(forge)) => Some(
                resolve_forge_version(self.downloader.client(), &self.endpoints.forge_maven, minecraft, forge)
                    .await?,
            ),
            (_, declared) => declared.map(str::to_string),
        };

        let ctx = InstallContext {
            minecraft_version: minecraft,
            loader_version: loader_version.as_deref(),
            root,
            downloader: &self.downloader,
            resolver: &self.resolver,
            endpoints: &self.endpoints,
            platform: &self.platform,
            progress,
            java: self.java.as_deref(),
            install_runtime: self.install_runtime,
        };
        let result = Installer::new(kind).install(&ctx).await?;
        Ok((result.version_id, result.loader_version.or(loader_version)))
    }

    // ── Verify / select ──

    /// Check the installed files against the index snapshot. `false` means
    /// an update should be re-run; it is not an error.
    pub async fn verify(&self, source: &PackageSource) -> LauncherResult<bool> {
        let install_dir = self.install_dir(&source.name);
        let snapshot = install_dir.join(INDEX_SNAPSHOT);
        let raw = match tokio::fs::read_to_string(&snapshot).await {
            Ok(raw) => raw,
            Err(_) => {
                info!("{} has no installed index", source.name);
                return Ok(false);
            }
        };
        let index: PackageIndex = serde_json::from_str(&raw)?;
        verify_files(&install_dir, &index.client_files(&source.optional_files)).await
    }

    /// Make `source` the selected package and refresh its remote version.
    /// A network failure is logged and does not block the selection.
    pub async fn select(&self, source: &PackageSource) -> LauncherResult<()> {
        let mut state = self.state().await;
        state.selected = Some(source.name.clone());

        match self.fetch_index(source).await {
            Ok(remote) => {
                if let Some(entry) = state.packages.get_mut(&source.name) {
                    entry.remote_version = Some(remote.index.version_id);
                }
            }
            Err(e) => warn!("Could not refresh {}: {}", source.name, e),
        }

        state.save(&self.data_dir).await?;
        info!("Selected package {}", source.name);
        Ok(())
    }

    pub async fn launch_version(&self, name: &str) -> LauncherResult<String> {
        self.state()
            .await
            .get(name)
            .map(|p| p.launch_version.clone())
            .ok_or_else(|| LauncherError::PackageNotFound(name.to_string()))
    }
}

fn read_zip(path: &Path) -> LauncherResult<zip::ZipArchive<File>> {
    let file = File::open(path).map_err(io_err(path))?;
    Ok(zip::ZipArchive::new(file)?)
}

fn read_archive_index(archive: &mut zip::ZipArchive<File>, prefix: &str) -> LauncherResult<PackageIndex> {
    let name = format!("{}{}", prefix, INDEX_FILE);
    let entry = archive
        .by_name(&name)
        .map_err(|e| LauncherError::Other(format!("Missing {} in package archive: {}", name, e)))?;
    Ok(serde_json::from_reader(entry)?)
}

fn download_job(file: &PackageFile, install_dir: &Path) -> Option<DownloadJob> {
    let Some(url) = file.downloads.first() else {
        warn!("{} has no download url", file.path);
        return None;
    };
    Some(
        DownloadJob::new(url, install_dir.join(&file.path), install_dir)
            .with_sha1(file.sha1().map(str::to_string)),
    )
}

/// Delete `mods/*.jar` files the new file set no longer names.
async fn remove_stale_mods(install_dir: &Path, files: &[&PackageFile]) -> LauncherResult<()> {
    let mods_dir = install_dir.join("mods");
    let mut entries = match tokio::fs::read_dir(&mods_dir).await {
        Ok(entries) => entries,
        Err(_) => return Ok(()),
    };

    let keep: HashSet<PathBuf> = files
        .iter()
        .map(|f| normalize(&install_dir.join(&f.path)))
        .collect();

    while let Some(entry) = entries.next_entry().await.map_err(io_err(&mods_dir))? {
        let path = entry.path();
        let is_jar = path.extension().is_some_and(|ext| ext == "jar");
        if is_jar && path.is_file() && !keep.contains(&normalize(&path)) {
            info!("Removing stale mod {:?}", path);
            tokio::fs::remove_file(&path).await.map_err(io_err(&path))?;
        }
    }
    Ok(())
}

async fn verify_files(install_dir: &Path, files: &[&PackageFile]) -> LauncherResult<bool> {
    for file in files.iter().filter(|f| f.is_verified()) {
        let path = install_dir.join(&file.path);
        if !path.is_file() {
            info!("Missing package file {:?}", path);
            return Ok(false);
        }
        if let Some(expected) = file.sha1() {
            if sha1_file(&path).await? != expected {
                info!("Checksum mismatch for {:?}", path);
                return Ok(false);
            }
        }
    }
    Ok(true)
}

/// Launch version when dependencies are skipped: keep the recorded one while
/// the base and loader are unchanged.
fn reuse_launch_version(
    index: &PackageIndex,
    previous: Option<&InstalledPackage>,
) -> LauncherResult<(String, Option<String>)> {
    let minecraft = index.minecraft_version()?;
    let declared = index.loader().map(|(_, v)| v.to_string());

    if let Some(previous) = previous {
        let same_loader = match (previous.loader_version.as_deref(), declared.as_deref()) {
            (Some(recorded), Some(wanted)) => recorded_loader_matches(recorded, minecraft, wanted),
            (None, None) => true,
            _ => false,
        };
        if previous.base_version == minecraft && same_loader {
            return Ok((previous.launch_version.clone(), previous.loader_version.clone()));
        }
    }
    Ok((index.launch_version()?, declared))
}

/// Forge records the probed installer version (`<mc>-<forge>[-<mc>]`), the
/// other loaders their bare version.
fn recorded_loader_matches(recorded: &str, minecraft: &str, wanted: &str) -> bool {
    recorded == wanted
        || recorded == format!("{}-{}", minecraft, wanted)
        || recorded == format!("{}-{}-{}", minecraft, wanted, minecraft)
}
