// ─── Package Index ───
// `modrinth.index.json`: the file list and dependency table of a content
// package.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::loaders::LoaderKind;

pub const INDEX_FILE: &str = "modrinth.index.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageIndex {
    #[serde(default)]
    pub format_version: u32,
    #[serde(default)]
    pub game: String,
    pub version_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub files: Vec<PackageFile>,
    /// `minecraft` plus at most one of `fabric-loader`, `quilt-loader`, `forge`.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageFile {
    /// Relative to the package directory.
    pub path: String,
    #[serde(default)]
    pub hashes: FileHashes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<FileEnv>,
    #[serde(default)]
    pub downloads: Vec<String>,
    #[serde(default)]
    pub file_size: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileHashes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha512: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEnv {
    pub client: EnvSupport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<EnvSupport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvSupport {
    Required,
    Optional,
    Unsupported,
}

impl PackageFile {
    pub fn client_support(&self) -> Option<EnvSupport> {
        self.env.as_ref().map(|env| env.client)
    }

    pub fn sha1(&self) -> Option<&str> {
        self.hashes.sha1.as_deref().filter(|s| !s.is_empty())
    }

    /// Files that must be present after an install: client-required or
    /// carrying a checksum.
    pub fn is_verified(&self) -> bool {
        self.client_support() == Some(EnvSupport::Required) || self.sha1().is_some()
    }
}

impl PackageIndex {
    /// Files to install on a client. Untagged and client-required entries are
    /// kept; optional ones only when their path is in `requested`.
    pub fn client_files<'a>(&'a self, requested: &[String]) -> Vec<&'a PackageFile> {
        self.files
            .iter()
            .filter(|file| match file.client_support() {
                None | Some(EnvSupport::Required) => true,
                Some(EnvSupport::Optional) => requested.iter().any(|p| p == &file.path),
                Some(EnvSupport::Unsupported) => false,
            })
            .collect()
    }

    /// Paths of client-optional files, in index order.
    pub fn optional_files(&self) -> Vec<&str> {
        self.files
            .iter()
            .filter(|file| file.client_support() == Some(EnvSupport::Optional))
            .map(|file| file.path.as_str())
            .collect()
    }

    pub fn minecraft_version(&self) -> LauncherResult<&str> {
        self.dependencies
            .get("minecraft")
            .map(String::as_str)
            .ok_or_else(|| {
                LauncherError::Other(format!("Package {} does not declare a Minecraft version", self.name))
            })
    }

    /// The declared loader, if any. Only the first of Forge, Fabric, Quilt is
    /// honoured.
    pub fn loader(&self) -> Option<(LoaderKind, &str)> {
        [
            ("forge", LoaderKind::Forge),
            ("fabric-loader", LoaderKind::Fabric),
            ("quilt-loader", LoaderKind::Quilt),
        ]
        .into_iter()
        .find_map(|(key, kind)| self.dependencies.get(key).map(|v| (kind, v.as_str())))
    }

    /// Version id the game is launched with once dependencies are installed.
    pub fn launch_version(&self) -> LauncherResult<String> {
        let minecraft = self.minecraft_version()?;
        Ok(match self.loader() {
            Some((LoaderKind::Forge, forge)) => format!("{}-forge-{}", minecraft, forge),
            Some((LoaderKind::Fabric, fabric)) => format!("fabric-loader-{}-{}", fabric, minecraft),
            Some((LoaderKind::Quilt, quilt)) => format!("quilt-loader-{}-{}", quilt, minecraft),
            _ => minecraft.to_string(),
        })
    }
}
