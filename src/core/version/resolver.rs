// ─── Manifest Resolver ───
// Loads a version manifest from disk or the version index and flattens its
// inheritance chain.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use super::index::{VersionEntry, VersionIndex};
use super::inherit::merge_with_parent;
use super::version_file::VersionManifest;
use crate::core::error::{io_err, LauncherError, LauncherResult};
use crate::core::http::ResponseCache;

/// Longest `inheritsFrom` chain followed before giving up.
pub const MAX_INHERITANCE_DEPTH: usize = 8;

/// `<root>/versions/<id>/<id>.json`
pub fn manifest_path(root: &Path, id: &str) -> PathBuf {
    root.join("versions").join(id).join(format!("{}.json", id))
}

/// `<root>/versions/<id>/<id>.jar`
pub fn jar_path(root: &Path, id: &str) -> PathBuf {
    root.join("versions").join(id).join(format!("{}.jar", id))
}

/// Where a manifest comes from.
#[derive(Debug, Clone)]
pub enum ManifestSource {
    Local(PathBuf),
    Remote(VersionEntry),
}

#[derive(Clone)]
pub struct VersionResolver {
    cache: ResponseCache,
    index_url: String,
}

impl VersionResolver {
    pub fn new(cache: ResponseCache, index_url: impl Into<String>) -> Self {
        Self {
            cache,
            index_url: index_url.into(),
        }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub async fn index(&self) -> LauncherResult<VersionIndex> {
        VersionIndex::fetch(&self.cache, &self.index_url).await
    }

    /// Local file first, then the version index.
    pub async fn locate(&self, id: &str, root: &Path) -> LauncherResult<ManifestSource> {
        let local = manifest_path(root, id);
        if tokio::fs::try_exists(&local).await.unwrap_or(false) {
            return Ok(ManifestSource::Local(local));
        }

        let index = self.index().await?;
        index
            .find_version(id)
            .cloned()
            .map(ManifestSource::Remote)
            .ok_or_else(|| LauncherError::VersionNotFound(id.to_string()))
    }

    async fn load_raw(&self, id: &str, root: &Path) -> LauncherResult<Value> {
        match self.locate(id, root).await? {
            ManifestSource::Local(path) => read_json(&path),
            ManifestSource::Remote(entry) => {
                debug!("Fetching manifest {} from {}", id, entry.url);
                let body = self.cache.get_text(&entry.url).await?;
                Ok(serde_json::from_str(&body)?)
            }
        }
    }

    /// Resolve `id` with every ancestor merged in. Ancestors may be local or remote.
    pub async fn resolve(&self, id: &str, root: &Path) -> LauncherResult<VersionManifest> {
        let mut chain = vec![self.load_raw(id, root).await?];
        while let Some(parent) = parent_id(chain.last()) {
            if chain.len() > MAX_INHERITANCE_DEPTH {
                return Err(LauncherError::Other(format!(
                    "Inheritance chain of {} exceeds {} levels",
                    id, MAX_INHERITANCE_DEPTH
                )));
            }
            chain.push(self.load_raw(&parent, root).await?);
        }
        flatten(chain)
    }
}

/// Resolve an installed version purely from disk.
pub fn resolve_local(id: &str, root: &Path) -> LauncherResult<VersionManifest> {
    let mut chain = vec![read_local(id, root)?];
    while let Some(parent) = parent_id(chain.last()) {
        if chain.len() > MAX_INHERITANCE_DEPTH {
            return Err(LauncherError::Other(format!(
                "Inheritance chain of {} exceeds {} levels",
                id, MAX_INHERITANCE_DEPTH
            )));
        }
        chain.push(read_local(&parent, root)?);
    }
    flatten(chain)
}

/// Ids of every version with a manifest under `<root>/versions`.
pub fn installed_versions(root: &Path) -> LauncherResult<Vec<String>> {
    let versions_dir = root.join("versions");
    if !versions_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut ids = Vec::new();
    for entry in std::fs::read_dir(&versions_dir).map_err(io_err(&versions_dir))? {
        let entry = entry.map_err(io_err(&versions_dir))?;
        let id = entry.file_name().to_string_lossy().to_string();
        if manifest_path(root, &id).is_file() {
            ids.push(id);
        }
    }
    ids.sort();
    Ok(ids)
}

fn read_local(id: &str, root: &Path) -> LauncherResult<Value> {
    let path = manifest_path(root, id);
    if !path.is_file() {
        return Err(LauncherError::VersionNotFound(id.to_string()));
    }
    read_json(&path)
}

fn read_json(path: &Path) -> LauncherResult<Value> {
    let raw = std::fs::read_to_string(path).map_err(io_err(path))?;
    Ok(serde_json::from_str(&raw)?)
}

fn parent_id(value: Option<&Value>) -> Option<String> {
    value?
        .get("inheritsFrom")?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `chain[0]` is the requested version, each next element its parent.
fn flatten(mut chain: Vec<Value>) -> LauncherResult<VersionManifest> {
    let mut merged = chain.pop().unwrap_or(Value::Null);
    while let Some(child) = chain.pop() {
        merged = merge_with_parent(&child, &merged);
    }
    Ok(serde_json::from_value(merged)?)
}
