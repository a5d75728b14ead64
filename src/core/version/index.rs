// ─── Version Index ───
// The global list of published versions (`version_manifest_v2.json`).

use serde::Deserialize;
use tracing::info;

use crate::core::error::LauncherResult;
use crate::core::http::ResponseCache;

#[derive(Debug, Clone, Deserialize)]
pub struct VersionIndex {
    #[serde(default)]
    pub latest: Option<LatestVersions>,
    pub versions: Vec<VersionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LatestVersions {
    pub release: String,
    pub snapshot: String,
}

/// A single entry in the index.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    #[serde(default, rename = "releaseTime")]
    pub release_time: Option<String>,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

impl VersionIndex {
    /// Fetch through the shared response cache.
    pub async fn fetch(cache: &ResponseCache, url: &str) -> LauncherResult<Self> {
        let index: VersionIndex = cache.get_json(url).await?;
        info!("Loaded {} versions from index", index.versions.len());
        Ok(index)
    }

    pub fn find_version(&self, id: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.id == id)
    }

    pub fn releases(&self) -> impl Iterator<Item = &VersionEntry> {
        self.versions.iter().filter(|v| v.version_type == "release")
    }
}
