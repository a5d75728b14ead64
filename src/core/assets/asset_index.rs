use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::core::downloader::{DownloadJob, Downloader};
use crate::core::error::{io_err, LauncherResult};
use crate::core::progress::{ProgressReporter, StatusOnly};
use crate::core::version::VersionManifest;

/// Top-level asset index JSON structure.
#[derive(Debug, Deserialize)]
pub struct AssetIndex {
    pub objects: HashMap<String, AssetObject>,
}

#[derive(Debug, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    #[serde(default)]
    pub size: u64,
}

impl AssetIndex {
    /// Distinct object hashes; many names share one object.
    pub fn hashes(&self) -> BTreeSet<&str> {
        self.objects.values().map(|o| o.hash.as_str()).collect()
    }
}

/// Download the asset index of `manifest` to `assets/indexes/<assets>.json`
/// and every object it lists to `assets/objects/<xx>/<hash>`.
pub async fn install_assets(
    manifest: &VersionManifest,
    root: &Path,
    downloader: &Downloader,
    resources_base: &str,
    progress: &dyn ProgressReporter,
) -> LauncherResult<()> {
    let Some(index_ref) = &manifest.asset_index else {
        return Ok(());
    };

    let index_path = root
        .join("assets")
        .join("indexes")
        .join(format!("{}.json", manifest.assets_name()));
    let job = DownloadJob::new(&index_ref.url, &index_path, root).with_sha1(index_ref.sha1.clone());
    downloader.download(&job, false, &StatusOnly(progress)).await?;

    let raw = tokio::fs::read_to_string(&index_path)
        .await
        .map_err(io_err(&index_path))?;
    let index: AssetIndex = serde_json::from_str(&raw)?;

    let objects_dir = root.join("assets").join("objects");
    let base = resources_base.trim_end_matches('/');
    let jobs: Vec<DownloadJob> = index
        .hashes()
        .into_iter()
        .filter(|hash| hash.len() > 2)
        .map(|hash| {
            let prefix = &hash[..2];
            DownloadJob::new(
                format!("{}/{}/{}", base, prefix, hash),
                objects_dir.join(prefix).join(hash),
                root,
            )
            .with_sha1(Some(hash))
        })
        .collect();

    info!("Checking {} asset objects", jobs.len());
    progress.set_status("Downloading assets");
    let fetched = downloader.download_all(jobs, progress).await?;
    info!("Downloaded {} asset objects", fetched);
    Ok(())
}
