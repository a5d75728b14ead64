use std::path::{Path, PathBuf};

use crate::core::downloader::Downloader;
use crate::core::http::ResponseCache;
use crate::core::java::java_executable;
use crate::core::progress::ProgressReporter;
use crate::core::state::Endpoints;
use crate::core::version::{resolve_local, Platform, VersionResolver};

/// Everything an installer needs. Built per install so the same services
/// can target different roots.
#[derive(Clone, Copy)]
pub struct InstallContext<'a> {
    pub minecraft_version: &'a str,
    /// Requested loader version; `None` picks the newest one.
    pub loader_version: Option<&'a str>,
    /// Minecraft root (`versions/`, `libraries/`, `assets/`, `runtime/`).
    pub root: &'a Path,
    pub downloader: &'a Downloader,
    pub resolver: &'a VersionResolver,
    pub endpoints: &'a Endpoints,
    pub platform: &'a Platform,
    pub progress: &'a dyn ProgressReporter,
    /// Explicit java used for installer subprocesses.
    pub java: Option<&'a Path>,
    pub install_runtime: bool,
}

impl<'a> InstallContext<'a> {
    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    pub fn cache(&self) -> &ResponseCache {
        self.resolver.cache()
    }

    /// Java for installer subprocesses: the explicit path, else the runtime
    /// the installed base version asks for, else `java` from `PATH`.
    pub fn installer_java(&self) -> PathBuf {
        if let Some(java) = self.java {
            return java.to_path_buf();
        }
        resolve_local(self.minecraft_version, self.root)
            .ok()
            .and_then(|manifest| manifest.java_version)
            .and_then(|jv| java_executable(self.root, &jv.component))
            .unwrap_or_else(|| PathBuf::from("java"))
    }
}
