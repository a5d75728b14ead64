// ─── Java Runtime ───
// Provisions the JRE a version manifest asks for (`javaVersion`) under
// `<root>/runtime/<component>` using Temurin builds from the Adoptium API.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::downloader::{DownloadJob, Downloader};
use crate::core::error::{io_err, LauncherError, LauncherResult};
use crate::core::progress::ProgressReporter;

#[derive(Debug, Clone, Deserialize)]
struct AdoptiumRelease {
    binary: AdoptiumBinary,
    #[serde(default)]
    release_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AdoptiumBinary {
    package: AdoptiumPackage,
}

#[derive(Debug, Clone, Deserialize)]
struct AdoptiumPackage {
    checksum: String,
    link: String,
    name: String,
}

fn java_exe() -> &'static str {
    if cfg!(windows) {
        "java.exe"
    } else {
        "java"
    }
}

/// `<root>/runtime/<component>`
pub fn runtime_dir(root: &Path, component: &str) -> PathBuf {
    root.join("runtime").join(component)
}

/// Java binary of an installed runtime component, if present.
pub fn java_executable(root: &Path, component: &str) -> Option<PathBuf> {
    let base = runtime_dir(root, component);
    let candidates = [
        base.join("bin").join(java_exe()),
        base.join("jre.bundle")
            .join("Contents")
            .join("Home")
            .join("bin")
            .join(java_exe()),
        base.join("Contents").join("Home").join("bin").join(java_exe()),
    ];
    candidates.into_iter().find(|p| p.is_file())
}

/// Adoptium `os` query value for this machine.
fn adoptium_os() -> Option<&'static str> {
    match std::env::consts::OS {
        "windows" => Some("windows"),
        "linux" => Some("linux"),
        "macos" => Some("mac"),
        _ => None,
    }
}

/// Adoptium `architecture` query value for this machine.
fn adoptium_arch() -> Option<&'static str> {
    match std::env::consts::ARCH {
        "x86_64" => Some("x64"),
        "x86" => Some("x32"),
        "aarch64" => Some("aarch64"),
        "arm" => Some("arm"),
        _ => None,
    }
}

pub struct RuntimeInstaller<'a> {
    downloader: &'a Downloader,
    api_base: &'a str,
}

impl<'a> RuntimeInstaller<'a> {
    pub fn new(downloader: &'a Downloader, api_base: &'a str) -> Self {
        Self {
            downloader,
            api_base,
        }
    }

    /// Install `component` (Java `major`) unless it is already present.
    /// Returns the java binary.
    pub async fn install(
        &self,
        root: &Path,
        component: &str,
        major: u32,
        progress: &dyn ProgressReporter,
    ) -> LauncherResult<PathBuf> {
        if let Some(existing) = java_executable(root, component) {
            debug!("Runtime {} already installed at {:?}", component, existing);
            return Ok(existing);
        }

        let (Some(os), Some(arch)) = (adoptium_os(), adoptium_arch()) else {
            return Err(LauncherError::PlatformNotSupported {
                os: std::env::consts::OS.to_string(),
                arch: std::env::consts::ARCH.to_string(),
            });
        };

        progress.set_status(&format!("Installing Java {} ({})", major, component));
        let release = self.find_release(major, os, arch).await?;
        info!(
            "Installing runtime {} from {}",
            release.release_name.as_deref().unwrap_or("unknown"),
            release.binary.package.link
        );

        let runtime_root = root.join("runtime");
        let staging = runtime_root.join(format!(".staging-{}", Uuid::new_v4()));
        let archive_path = staging.join(&release.binary.package.name);
        let unpack_dir = staging.join("unpacked");

        let result: LauncherResult<()> = async {
            let job = DownloadJob::new(&release.binary.package.link, &archive_path, root);
            self.downloader.download(&job, true, progress).await?;

            let actual = sha256_file(&archive_path)?;
            if !actual.eq_ignore_ascii_case(&release.binary.package.checksum) {
                return Err(LauncherError::InvalidChecksum {
                    url: release.binary.package.link.clone(),
                    path: archive_path.clone(),
                    expected: release.binary.package.checksum.clone(),
                    actual,
                });
            }

            unpack(&archive_path, &unpack_dir)?;
            let home = single_top_level_dir(&unpack_dir)?;
            let target = runtime_dir(root, component);
            if target.exists() {
                std::fs::remove_dir_all(&target).map_err(io_err(&target))?;
            }
            std::fs::rename(&home, &target).map_err(io_err(&target))?;
            Ok(())
        }
        .await;

        let _ = std::fs::remove_dir_all(&staging);
        result?;

        let java = java_executable(root, component).ok_or_else(|| {
            LauncherError::Other(format!("Runtime {} has no java binary", component))
        })?;
        make_executable(&java)?;
        Ok(java)
    }

    async fn find_release(&self, major: u32, os: &str, arch: &str) -> LauncherResult<AdoptiumRelease> {
        let mut last_error = None;
        for image_type in ["jre", "jdk"] {
            let url = format!(
                "{}/assets/latest/{}/hotspot?architecture={}&image_type={}&os={}&vendor=eclipse",
                self.api_base.trim_end_matches('/'),
                major,
                arch,
                image_type,
                os
            );
            let response = self.downloader.client().get(&url).send().await?;
            if !response.status().is_success() {
                last_error = Some(LauncherError::DownloadFailed {
                    url,
                    status: response.status().as_u16(),
                });
                continue;
            }
            let releases: Vec<AdoptiumRelease> = response.json().await?;
            if let Some(release) = releases.into_iter().next() {
                return Ok(release);
            }
        }

        Err(last_error.unwrap_or_else(|| {
            LauncherError::Other(format!("No Java {} runtime published for {}/{}", major, os, arch))
        }))
    }
}

fn sha256_file(path: &Path) -> LauncherResult<String> {
    let mut file = std::fs::File::open(path).map_err(io_err(path))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).map_err(io_err(path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn unpack(archive: &Path, dest: &Path) -> LauncherResult<()> {
    std::fs::create_dir_all(dest).map_err(io_err(dest))?;
    let file = std::fs::File::open(archive).map_err(io_err(archive))?;
    let name = archive.to_string_lossy();

    if name.ends_with(".zip") {
        zip::ZipArchive::new(file)?.extract(dest)?;
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(file));
        tar.set_preserve_permissions(true);
        tar.unpack(dest).map_err(io_err(dest))?;
    } else {
        return Err(LauncherError::Other(format!(
            "Unsupported runtime archive {:?}",
            archive
        )));
    }
    Ok(())
}

/// Runtime archives wrap everything in one `jdk-<version>-jre` directory.
fn single_top_level_dir(dir: &Path) -> LauncherResult<PathBuf> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err(dir))? {
        let entry = entry.map_err(io_err(dir))?;
        if entry.path().is_dir() {
            dirs.push(entry.path());
        }
    }
    match dirs.len() {
        1 => Ok(dirs.remove(0)),
        _ => Ok(dir.to_path_buf()),
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> LauncherResult<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path).map_err(io_err(path))?.permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).map_err(io_err(path))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> LauncherResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::http::build_http_client;
    use crate::core::progress::NoProgress;
    use httpmock::prelude::*;
    use std::io::Write;

    #[test]
    fn finds_plain_and_bundle_layouts() {
        let root = tempfile::tempdir().unwrap();
        assert!(java_executable(root.path(), "java-runtime-gamma").is_none());

        let bundle = runtime_dir(root.path(), "jre-legacy")
            .join("jre.bundle/Contents/Home/bin");
        std::fs::create_dir_all(&bundle).unwrap();
        std::fs::write(bundle.join(java_exe()), "").unwrap();
        assert_eq!(
            java_executable(root.path(), "jre-legacy"),
            Some(bundle.join(java_exe()))
        );
    }

    #[tokio::test]
    async fn installs_zip_runtime_and_checks_sha256() {
        if adoptium_os().is_none() || adoptium_arch().is_none() {
            return;
        }

        let mut zip_bytes = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut zip_bytes));
            let opts = zip::write::SimpleFileOptions::default();
            zip.start_file(format!("jdk-17.0.9+9-jre/bin/{}", java_exe()), opts)
                .unwrap();
            zip.write_all(b"#!/bin/sh\n").unwrap();
            zip.finish().unwrap();
        }
        let checksum = hex::encode(Sha256::digest(&zip_bytes));

        let server = MockServer::start_async().await;
        let link = server.url("/binary/jre17.zip");
        server
            .mock_async(|when, then| {
                when.method(GET).path_contains("/assets/latest/17/hotspot");
                then.status(200).json_body(serde_json::json!([{
                    "release_name": "jdk-17.0.9+9",
                    "binary": {"package": {"checksum": checksum, "link": link, "name": "jre17.zip"}}
                }]));
            })
            .await;
        let binary = server
            .mock_async(|when, then| {
                when.method(GET).path("/binary/jre17.zip");
                then.status(200).body(zip_bytes.clone());
            })
            .await;

        let root = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(build_http_client().unwrap());
        let base = server.base_url();
        let installer = RuntimeInstaller::new(&downloader, &base);

        let java = installer
            .install(root.path(), "java-runtime-gamma", 17, &NoProgress)
            .await
            .unwrap();
        assert_eq!(java, runtime_dir(root.path(), "java-runtime-gamma").join("bin").join(java_exe()));

        // Second call finds the installed runtime without downloading again.
        installer
            .install(root.path(), "java-runtime-gamma", 17, &NoProgress)
            .await
            .unwrap();
        assert_eq!(binary.hits_async().await, 1);
    }
}
