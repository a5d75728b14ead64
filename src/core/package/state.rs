// ─── Package State ───
// `packages.json`: what is installed where, and which package is selected.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::error::{io_err, LauncherResult};
use crate::core::loaders::LoaderKind;

pub const STATE_FILE: &str = "packages.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstalledPackage {
    pub name: String,
    pub installed_version: String,
    /// Last `versionId` seen on the remote index.
    pub remote_version: Option<String>,
    pub base_version: String,
    pub loader: LoaderKind,
    pub loader_version: Option<String>,
    /// Version id handed to the command builder.
    pub launch_version: String,
    /// Cache validator of the index the install came from.
    pub etag: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl InstalledPackage {
    pub fn is_up_to_date(&self) -> bool {
        self.remote_version
            .as_deref()
            .is_some_and(|remote| remote == self.installed_version)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagesState {
    pub selected: Option<String>,
    pub packages: BTreeMap<String, InstalledPackage>,
}

impl PackagesState {
    /// Empty state when the file is missing; a corrupt file is logged and
    /// treated as empty so the next install rewrites it.
    pub async fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(STATE_FILE);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(e) => {
                warn!("Ignoring unreadable package state at {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub async fn save(&self, data_dir: &Path) -> LauncherResult<()> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .map_err(io_err(data_dir))?;
        let path = data_dir.join(STATE_FILE);
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, json).await.map_err(io_err(&path))
    }

    pub fn get(&self, name: &str) -> Option<&InstalledPackage> {
        self.packages.get(name)
    }
}
