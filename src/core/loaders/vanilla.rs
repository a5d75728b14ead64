use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::core::assets::install_assets;
use crate::core::downloader::DownloadJob;
use crate::core::error::{io_err, LauncherError, LauncherResult};
use crate::core::java::RuntimeInstaller;
use crate::core::maven::MavenArtifact;
use crate::core::natives::{extract_natives, natives_dir};
use crate::core::progress::StatusOnly;
use crate::core::version::{
    jar_path, manifest_path, resolve_local, Library, ManifestSource, VersionManifest,
    MAX_INHERITANCE_DEPTH,
};

use super::context::InstallContext;
use super::installer::{InstallStage, LoaderInstallResult, LoaderInstaller, StageTracker};

/// Installs a plain version: manifest chain, libraries, natives, assets,
/// logging config, client jar and Java runtime.
pub struct VanillaInstaller;

#[async_trait]
impl LoaderInstaller for VanillaInstaller {
    async fn install(
        &self,
        ctx: &InstallContext<'_>,
        stages: &mut StageTracker<'_>,
    ) -> LauncherResult<LoaderInstallResult> {
        stages.advance(InstallStage::BaseInstalling)?;
        install_version(ctx.minecraft_version, ctx).await?;
        stages.advance(InstallStage::Installed)?;

        Ok(LoaderInstallResult {
            version_id: ctx.minecraft_version.to_string(),
            loader_version: None,
            stages: Vec::new(),
        })
    }
}

/// Install `id` and every ancestor it inherits from, oldest first.
/// Files already present with a matching checksum are left alone.
pub async fn install_version(id: &str, ctx: &InstallContext<'_>) -> LauncherResult<()> {
    let mut chain = Vec::new();
    let mut next = Some(id.to_string());
    while let Some(current) = next {
        if chain.len() > MAX_INHERITANCE_DEPTH {
            return Err(LauncherError::Other(format!(
                "Inheritance chain of {} is too deep",
                id
            )));
        }
        let manifest = persist_manifest(&current, ctx).await?;
        next = manifest.inherits_from.clone();
        chain.push(manifest);
    }

    for own in chain.iter().rev() {
        // Each level installs against its merged view so natives and the
        // client jar land in that level's own directory.
        let merged = resolve_local(&own.id, ctx.root)?;
        install_files(own, &merged, ctx).await?;
    }

    info!("Version {} installed", id);
    Ok(())
}

/// Make sure `versions/<id>/<id>.json` exists locally and return it unmerged.
async fn persist_manifest(id: &str, ctx: &InstallContext<'_>) -> LauncherResult<VersionManifest> {
    let path = match ctx.resolver.locate(id, ctx.root).await? {
        ManifestSource::Local(path) => path,
        ManifestSource::Remote(entry) => {
            let path = manifest_path(ctx.root, id);
            debug!("Saving manifest {} from {}", id, entry.url);
            let job = DownloadJob::new(&entry.url, &path, ctx.root).with_sha1(entry.sha1.clone());
            ctx.downloader.download(&job, false, &StatusOnly(ctx.progress)).await?;
            path
        }
    };

    let raw = tokio::fs::read_to_string(&path).await.map_err(io_err(&path))?;
    VersionManifest::parse(&raw)
}

async fn install_files(
    own: &VersionManifest,
    merged: &VersionManifest,
    ctx: &InstallContext<'_>,
) -> LauncherResult<()> {
    ctx.progress.set_status(&format!("Installing {}", merged.id));

    install_libraries(merged, ctx).await?;
    install_assets(merged, ctx.root, ctx.downloader, &ctx.endpoints.resources, ctx.progress).await?;
    install_logging_config(merged, ctx).await?;
    install_client_jar(own, merged, ctx).await?;

    if ctx.install_runtime {
        if let Some(java) = &merged.java_version {
            RuntimeInstaller::new(ctx.downloader, &ctx.endpoints.java_runtime_api)
                .install(ctx.root, &java.component, java.major_version, &StatusOnly(ctx.progress))
                .await?;
        }
    }
    Ok(())
}

// ── Libraries ──

struct NativeArchive {
    path: PathBuf,
    exclude: Vec<String>,
}

async fn install_libraries(manifest: &VersionManifest, ctx: &InstallContext<'_>) -> LauncherResult<()> {
    let libs_dir = ctx.libraries_dir();
    let mut jobs = Vec::new();
    let mut natives = Vec::new();

    for lib in manifest.allowed_libraries(ctx.platform) {
        if let Some(job) = artifact_job(lib, &libs_dir, ctx)? {
            jobs.push(job);
        }
        if let Some(job) = native_job(lib, &libs_dir, ctx)? {
            natives.push(NativeArchive {
                path: job.dest.clone(),
                exclude: lib.exclusions().to_vec(),
            });
            jobs.push(job);
        }
    }

    ctx.progress.set_status(&format!("Downloading libraries for {}", manifest.id));
    let fetched = ctx.downloader.download_all(jobs, ctx.progress).await?;
    debug!("Fetched {} libraries for {}", fetched, manifest.id);

    let target = natives_dir(ctx.root, &manifest.id);
    for archive in natives {
        extract_natives(&archive.path, &target, &archive.exclude)?;
    }
    Ok(())
}

/// Main artifact of a library. Libraries without `downloads` come from
/// their `url` repository (or the default one) by coordinate.
pub(super) fn artifact_job(lib: &Library, libs_dir: &Path, ctx: &InstallContext<'_>) -> LauncherResult<Option<DownloadJob>> {
    let Some(downloads) = &lib.downloads else {
        let artifact = MavenArtifact::parse(&lib.name)?;
        let repo = lib.url.as_deref().unwrap_or(&ctx.endpoints.libraries);
        return Ok(Some(DownloadJob::new(
            artifact.url(repo),
            artifact.path_in(libs_dir),
            ctx.root,
        )));
    };

    let Some(artifact) = downloads.artifact.as_ref().filter(|a| !a.url.is_empty()) else {
        return Ok(None);
    };
    Ok(Some(
        DownloadJob::new(&artifact.url, lib.artifact_path(libs_dir)?, ctx.root)
            .with_sha1(artifact.sha1.clone()),
    ))
}

fn native_job(lib: &Library, libs_dir: &Path, ctx: &InstallContext<'_>) -> LauncherResult<Option<DownloadJob>> {
    let Some(dest) = lib.native_path(libs_dir, ctx.platform)? else {
        return Ok(None);
    };

    if let Some(native) = lib.native_artifact(ctx.platform) {
        if native.url.is_empty() {
            return Ok(None);
        }
        return Ok(Some(
            DownloadJob::new(&native.url, dest, ctx.root).with_sha1(native.sha1.clone()),
        ));
    }

    if lib.downloads.is_some() {
        return Ok(None);
    }
    let mut artifact = MavenArtifact::parse(&lib.name)?;
    artifact.classifier = lib.native_classifier(ctx.platform);
    let repo = lib.url.as_deref().unwrap_or(&ctx.endpoints.libraries);
    Ok(Some(DownloadJob::new(artifact.url(repo), dest, ctx.root)))
}

// ── Logging, client jar ──

async fn install_logging_config(manifest: &VersionManifest, ctx: &InstallContext<'_>) -> LauncherResult<()> {
    let Some(config) = manifest.logging.as_ref().and_then(|l| l.client.as_ref()) else {
        return Ok(());
    };
    let dest = logging_config_path(ctx.root, &config.file.id);
    let job = DownloadJob::new(&config.file.url, dest, ctx.root).with_sha1(config.file.sha1.clone());
    ctx.downloader.download(&job, false, &StatusOnly(ctx.progress)).await?;
    Ok(())
}

/// `<root>/assets/log_configs/<file id>`
pub fn logging_config_path(root: &Path, file_id: &str) -> PathBuf {
    root.join("assets").join("log_configs").join(file_id)
}

async fn install_client_jar(
    own: &VersionManifest,
    merged: &VersionManifest,
    ctx: &InstallContext<'_>,
) -> LauncherResult<()> {
    let dest = jar_path(ctx.root, &merged.id);
    let client = merged
        .downloads
        .as_ref()
        .and_then(|d| d.client.as_ref())
        .filter(|c| !c.url.is_empty());

    if let Some(client) = client {
        let job = DownloadJob::new(&client.url, &dest, ctx.root).with_sha1(client.sha1.clone());
        ctx.downloader.download(&job, false, &StatusOnly(ctx.progress)).await?;
        return Ok(());
    }

    // Loader versions without their own jar launch with the parent's.
    let Some(parent) = &own.inherits_from else {
        return Ok(());
    };
    let parent_jar = jar_path(ctx.root, parent);
    if !dest.exists() && parent_jar.is_file() {
        debug!("Copying {:?} to {:?}", parent_jar, dest);
        tokio::fs::copy(&parent_jar, &dest).await.map_err(io_err(&dest))?;
    }
    Ok(())
}
