// ─── Direct-merge loaders ───
// Fabric and Quilt publish an installer jar that writes a composite version
// manifest straight into the Minecraft root. Both share this pipeline and
// differ only in endpoints, artifact names and installer arguments.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::core::downloader::DownloadJob;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::ResponseCache;
use crate::core::maven::MavenMetadata;
use crate::core::progress::StatusOnly;

use super::context::InstallContext;
use super::installer::{InstallStage, LoaderInstallResult, StageTracker};
use super::process::{run_program, ScratchDir};
use super::vanilla::install_version;

/// One entry of a loader meta `versions/game` or `versions/loader` list.
#[derive(Debug, Clone, Deserialize)]
pub struct MetaVersion {
    pub version: String,
    #[serde(default)]
    pub stable: bool,
}

pub(crate) struct MergeLoader {
    pub name: &'static str,
    pub meta_base: String,
    /// Maven directory of the installer artifact, without trailing slash.
    pub installer_dir: String,
    pub installer_artifact: &'static str,
    /// Prefix of the composite id, `<prefix>-<loader>-<minecraft>`.
    pub id_prefix: &'static str,
    pub installer_args: fn(root: &Path, minecraft: &str, loader: &str) -> Vec<String>,
}

impl MergeLoader {
    pub fn composite_id(&self, minecraft: &str, loader: &str) -> String {
        format!("{}-{}-{}", self.id_prefix, loader, minecraft)
    }

    pub async fn game_versions(&self, cache: &ResponseCache) -> LauncherResult<Vec<MetaVersion>> {
        self.meta_list(cache, "versions/game").await
    }

    pub async fn loader_versions(&self, cache: &ResponseCache) -> LauncherResult<Vec<MetaVersion>> {
        self.meta_list(cache, "versions/loader").await
    }

    pub async fn stable_game_versions(&self, cache: &ResponseCache) -> LauncherResult<Vec<String>> {
        Ok(self
            .game_versions(cache)
            .await?
            .into_iter()
            .filter(|v| v.stable)
            .map(|v| v.version)
            .collect())
    }

    pub async fn is_supported(&self, cache: &ResponseCache, minecraft: &str) -> LauncherResult<bool> {
        Ok(self
            .game_versions(cache)
            .await?
            .iter()
            .any(|v| v.version == minecraft))
    }

    /// Newest loader version; meta lists them newest first.
    pub async fn latest_loader(&self, cache: &ResponseCache) -> LauncherResult<String> {
        self.loader_versions(cache)
            .await?
            .into_iter()
            .next()
            .map(|v| v.version)
            .ok_or_else(|| LauncherError::LoaderApi(format!("{} meta lists no loader versions", self.name)))
    }

    pub async fn latest_installer(&self, cache: &ResponseCache) -> LauncherResult<String> {
        let url = format!("{}/maven-metadata.xml", self.installer_dir);
        Ok(MavenMetadata::fetch(cache, &url).await?.newest()?.to_string())
    }

    async fn meta_list(&self, cache: &ResponseCache, path: &str) -> LauncherResult<Vec<MetaVersion>> {
        let url = format!("{}/{}", self.meta_base.trim_end_matches('/'), path);
        cache.get_json(&url).await.map_err(|e| match e {
            LauncherError::DownloadFailed { url, status } => {
                LauncherError::LoaderApi(format!("{} meta returned {} for {}", self.name, status, url))
            }
            other => other,
        })
    }

    pub async fn install(
        &self,
        ctx: &InstallContext<'_>,
        stages: &mut StageTracker<'_>,
    ) -> LauncherResult<LoaderInstallResult> {
        let minecraft = ctx.minecraft_version;
        let cache = ctx.cache();

        // Locally installed or listed in the index, and known to the loader.
        ctx.resolver.locate(minecraft, ctx.root).await?;
        if !self.is_supported(cache, minecraft).await? {
            return Err(LauncherError::UnsupportedVersion {
                loader: self.name.to_string(),
                version: minecraft.to_string(),
            });
        }

        let loader = match ctx.loader_version {
            Some(v) => v.to_string(),
            None => self.latest_loader(cache).await?,
        };

        stages.advance(InstallStage::BaseInstalling)?;
        install_version(minecraft, ctx).await?;

        stages.advance(InstallStage::LoaderDownloading)?;
        let installer_version = self.latest_installer(cache).await?;
        let file_name = format!("{}-{}.jar", self.installer_artifact, installer_version);
        let url = format!("{}/{}/{}", self.installer_dir, installer_version, file_name);

        let scratch = ScratchDir::create(self.installer_artifact)?;
        let installer_path = scratch.path().join(&file_name);
        let job = DownloadJob::new(url, &installer_path, scratch.path());
        ctx.downloader.download(&job, true, &StatusOnly(ctx.progress)).await?;

        stages.advance(InstallStage::InstallerRunning)?;
        let java = ctx.installer_java();
        let mut args = vec!["-jar".to_string(), installer_path.to_string_lossy().into_owned()];
        args.extend((self.installer_args)(ctx.root, minecraft, &loader));
        info!("Running {} installer {} for {}", self.name, installer_version, minecraft);
        run_program(&java, &args, scratch.path()).await?;
        drop(scratch);

        stages.advance(InstallStage::CompositeVersionInstalling)?;
        let version_id = self.composite_id(minecraft, &loader);
        install_version(&version_id, ctx).await?;
        stages.advance(InstallStage::Installed)?;

        Ok(LoaderInstallResult {
            version_id,
            loader_version: Some(loader),
            stages: Vec::new(),
        })
    }
}
