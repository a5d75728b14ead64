// ─── Forge ───
// Installer-jar driven install: read `install_profile.json`, lay down the
// profile libraries, run the client processors in order and only then write
// the composite version manifest.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::context::InstallContext;
use super::installer::{InstallStage, LoaderInstallResult, LoaderInstaller, StageTracker};
use super::process::{read_main_class_from_jar, run_program, ScratchDir};
use super::vanilla::{artifact_job, install_version};
use crate::core::downloader::DownloadJob;
use crate::core::error::{io_err, LauncherError, LauncherResult};
use crate::core::http::ResponseCache;
use crate::core::launch::classpath_separator;
use crate::core::maven::{MavenArtifact, MavenMetadata};
use crate::core::progress::StatusOnly;
use crate::core::version::{jar_path, manifest_path, Library};

const FORGE_PATH: &str = "net/minecraftforge/forge";

/// Subset of Forge's `install_profile.json` (both the 1.13+ and legacy layouts).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgeInstallProfile {
    #[serde(default)]
    pub minecraft: Option<String>,
    /// Path of the client manifest inside the installer.
    #[serde(default)]
    pub json: Option<String>,
    #[serde(default)]
    pub libraries: Vec<Library>,
    #[serde(default)]
    pub processors: Vec<ForgeProcessor>,
    #[serde(default)]
    pub data: BTreeMap<String, SidedValue>,
    /// Legacy installers embed the client manifest here.
    #[serde(default)]
    pub version_info: Option<Value>,
    #[serde(default)]
    pub install: Option<LegacyInstall>,
}

#[derive(Debug, Deserialize)]
pub struct SidedValue {
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub server: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyInstall {
    /// Coordinate the universal jar is installed as.
    #[serde(default)]
    pub path: Option<String>,
    /// Universal jar inside the installer.
    #[serde(default)]
    pub file_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgeProcessor {
    #[serde(default)]
    pub sides: Option<Vec<String>>,
    pub jar: String,
    #[serde(default)]
    pub classpath: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ForgeProcessor {
    fn runs_on_client(&self) -> bool {
        match &self.sides {
            Some(sides) => sides.iter().any(|s| s == "client"),
            None => true,
        }
    }
}

pub struct ForgeInstaller;

#[async_trait]
impl LoaderInstaller for ForgeInstaller {
    async fn install(
        &self,
        ctx: &InstallContext<'_>,
        stages: &mut StageTracker<'_>,
    ) -> LauncherResult<LoaderInstallResult> {
        let minecraft = ctx.minecraft_version;
        let forge_version = match ctx.loader_version {
            Some(v) => v.to_string(),
            None => find_forge_version(ctx.cache(), &ctx.endpoints.forge_maven, minecraft)
                .await?
                .ok_or_else(|| LauncherError::UnsupportedVersion {
                    loader: "Forge".into(),
                    version: minecraft.to_string(),
                })?,
        };

        // The installer names the base it patches; that one is installed.
        stages.advance(InstallStage::BaseInstalling)?;
        let scratch = ScratchDir::create("forge")?;
        let installer_path = scratch
            .path()
            .join(format!("forge-{}-installer.jar", forge_version));
        let job = DownloadJob::new(
            installer_url(&ctx.endpoints.forge_maven, &forge_version),
            &installer_path,
            scratch.path(),
        );
        ctx.downloader.download(&job, true, &StatusOnly(ctx.progress)).await?;

        let libs_dir = ctx.libraries_dir();
        let unpacked = unpack_installer(&installer_path, &libs_dir, scratch.path())?;
        let profile = unpacked.profile;

        let base = profile.minecraft.clone().unwrap_or_else(|| minecraft.to_string());
        if base != minecraft {
            info!("Forge {} targets {}, installing that base instead of {}", forge_version, base, minecraft);
        }
        let ctx = &InstallContext {
            minecraft_version: &base,
            ..*ctx
        };
        install_version(&base, ctx).await?;

        stages.advance(InstallStage::LoaderDownloading)?;
        let jobs = profile
            .libraries
            .iter()
            .map(|lib| artifact_job(lib, &libs_dir, ctx))
            .filter_map(Result::transpose)
            .collect::<LauncherResult<Vec<_>>>()?;
        ctx.downloader.download_all(jobs, ctx.progress).await?;

        // Staged in memory; written only once every processor succeeded.
        let version_id = match unpacked.client_manifest.get("id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => forge_to_installed_version(&forge_version)?,
        };

        stages.advance(InstallStage::ProcessorsRunning)?;
        let vars = processor_variables(
            &profile,
            ctx,
            &installer_path,
            unpacked.binpatch.as_deref(),
            scratch.path(),
        )?;
        let java = ctx.installer_java();
        for processor in profile.processors.iter().filter(|p| p.runs_on_client()) {
            run_processor(processor, &vars, &java, &libs_dir, scratch.path()).await?;
        }
        drop(scratch);

        stages.advance(InstallStage::CompositeVersionInstalling)?;
        let manifest_file = manifest_path(ctx.root, &version_id);
        if let Some(parent) = manifest_file.parent() {
            std::fs::create_dir_all(parent).map_err(io_err(parent))?;
        }
        let json = serde_json::to_string_pretty(&unpacked.client_manifest)?;
        std::fs::write(&manifest_file, json).map_err(io_err(&manifest_file))?;
        install_version(&version_id, ctx).await?;
        stages.advance(InstallStage::Installed)?;

        Ok(LoaderInstallResult {
            version_id,
            loader_version: Some(forge_version),
            stages: Vec::new(),
        })
    }
}

// ── Installer archive ──

struct UnpackedInstaller {
    profile: ForgeInstallProfile,
    client_manifest: Value,
    binpatch: Option<PathBuf>,
}

/// Read the profile and client manifest and lay down everything the installer
/// carries: `maven/` artifacts, the legacy universal jar and the client binpatch.
fn unpack_installer(installer: &Path, libs_dir: &Path, scratch: &Path) -> LauncherResult<UnpackedInstaller> {
    let file = File::open(installer).map_err(io_err(installer))?;
    let mut archive = zip::ZipArchive::new(file)?;

    let profile: ForgeInstallProfile = read_json_entry(&mut archive, "install_profile.json")?;
    let client_manifest = match &profile.version_info {
        Some(info) => info.clone(),
        None => {
            let name = profile.json.as_deref().unwrap_or("version.json");
            read_json_entry(&mut archive, name.trim_start_matches('/'))?
        }
    };

    let embedded = extract_maven_tree(&mut archive, libs_dir)?;
    debug!("Extracted {} embedded libraries from {:?}", embedded, installer);

    if let Some(LegacyInstall {
        path: Some(coord),
        file_path: Some(entry),
    }) = &profile.install
    {
        let target = MavenArtifact::parse(coord)?.path_in(libs_dir);
        extract_entry(&mut archive, entry, &target)?;
    }

    let binpatch_target = scratch.join("data").join("client.lzma");
    let binpatch = extract_entry(&mut archive, "data/client.lzma", &binpatch_target)?
        .then_some(binpatch_target);

    Ok(UnpackedInstaller {
        profile,
        client_manifest,
        binpatch,
    })
}

fn read_json_entry<T: serde::de::DeserializeOwned>(
    archive: &mut zip::ZipArchive<File>,
    name: &str,
) -> LauncherResult<T> {
    let entry = archive
        .by_name(name)
        .map_err(|e| LauncherError::Loader(format!("Missing {} in Forge installer: {}", name, e)))?;
    Ok(serde_json::from_reader(entry)?)
}

/// Copy `maven/**` into the libraries dir without replacing existing files.
fn extract_maven_tree(archive: &mut zip::ZipArchive<File>, libs_dir: &Path) -> LauncherResult<usize> {
    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let Some(relative) = entry
            .enclosed_name()
            .and_then(|p| p.strip_prefix("maven").ok().map(Path::to_path_buf))
        else {
            continue;
        };
        let target = libs_dir.join(relative);
        if target.exists() {
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(io_err(parent))?;
        }
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        std::fs::write(&target, bytes).map_err(io_err(&target))?;
        written += 1;
    }
    Ok(written)
}

/// Returns whether `name` existed in the archive.
fn extract_entry(archive: &mut zip::ZipArchive<File>, name: &str, target: &Path) -> LauncherResult<bool> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes)?;
    std::fs::write(target, bytes).map_err(io_err(target))?;
    Ok(true)
}

// ── Processors ──

fn processor_variables(
    profile: &ForgeInstallProfile,
    ctx: &InstallContext<'_>,
    installer: &Path,
    binpatch: Option<&Path>,
    scratch: &Path,
) -> LauncherResult<BTreeMap<String, String>> {
    let libs_dir = ctx.libraries_dir();
    let minecraft = profile.minecraft.as_deref().unwrap_or(ctx.minecraft_version);
    let mut vars = BTreeMap::new();

    for (key, value) in &profile.data {
        if let Some(client) = &value.client {
            vars.insert(key.clone(), data_value(client, &libs_dir)?);
        }
    }

    let lossy = |p: &Path| p.to_string_lossy().into_owned();
    vars.insert("SIDE".into(), "client".into());
    vars.insert("MINECRAFT_VERSION".into(), minecraft.to_string());
    vars.insert("MINECRAFT_JAR".into(), lossy(&jar_path(ctx.root, minecraft)));
    // Processors treat ROOT as their working area, not the game directory.
    vars.insert("ROOT".into(), lossy(scratch));
    vars.insert("LIBRARY_DIR".into(), lossy(&libs_dir));
    vars.insert("INSTALLER".into(), lossy(installer));
    if let Some(binpatch) = binpatch {
        vars.insert("BINPATCH".into(), lossy(binpatch));
    }
    Ok(vars)
}

/// `[coord]` names a library file, `'text'` is a literal.
fn data_value(raw: &str, libs_dir: &Path) -> LauncherResult<String> {
    if let Some(coord) = raw.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        return Ok(MavenArtifact::parse(coord)?
            .path_in(libs_dir)
            .to_string_lossy()
            .into_owned());
    }
    if let Some(literal) = raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        return Ok(literal.to_string());
    }
    Ok(raw.to_string())
}

fn substitute(value: &str, vars: &BTreeMap<String, String>) -> String {
    if !value.contains('{') {
        return value.to_string();
    }
    vars.iter().fold(value.to_string(), |acc, (key, replacement)| {
        acc.replace(&format!("{{{}}}", key), replacement)
    })
}

fn resolve_processor_arg(
    arg: &str,
    vars: &BTreeMap<String, String>,
    libs_dir: &Path,
) -> LauncherResult<String> {
    if arg.starts_with('[') && arg.ends_with(']') {
        return data_value(arg, libs_dir);
    }
    Ok(substitute(arg, vars))
}

/// Command line of one processor, before the whole-line substitution pass.
fn processor_command(
    processor: &ForgeProcessor,
    vars: &BTreeMap<String, String>,
    java: &Path,
    libs_dir: &Path,
) -> LauncherResult<Vec<String>> {
    let jar = MavenArtifact::parse(&processor.jar)?.path_in(libs_dir);
    if !jar.is_file() {
        return Err(LauncherError::Loader(format!(
            "Missing Forge processor jar {}",
            jar.display()
        )));
    }

    let mut classpath = vec![jar.to_string_lossy().into_owned()];
    for coord in &processor.classpath {
        let path = MavenArtifact::parse(coord)?.path_in(libs_dir);
        classpath.push(path.to_string_lossy().into_owned());
    }

    let mut command = vec![
        java.to_string_lossy().into_owned(),
        "-cp".to_string(),
        classpath.join(classpath_separator()),
        read_main_class_from_jar(&jar)?,
    ];
    for arg in &processor.args {
        command.push(resolve_processor_arg(arg, vars, libs_dir)?);
    }
    Ok(command)
}

async fn run_processor(
    processor: &ForgeProcessor,
    vars: &BTreeMap<String, String>,
    java: &Path,
    libs_dir: &Path,
    cwd: &Path,
) -> LauncherResult<()> {
    let command: Vec<String> = processor_command(processor, vars, java, libs_dir)?
        .iter()
        .map(|part| substitute(part, vars))
        .collect();

    info!("Running Forge processor {}", processor.jar);
    let (program, args) = command
        .split_first()
        .ok_or_else(|| LauncherError::Loader("Empty processor command".into()))?;
    run_program(Path::new(program), args, cwd).await
}

// ── Version helpers ──

pub fn installer_url(forge_maven: &str, forge_version: &str) -> String {
    format!(
        "{}/{}/{v}/forge-{v}-installer.jar",
        forge_maven.trim_end_matches('/'),
        FORGE_PATH,
        v = forge_version
    )
}

/// Every published Forge version (`<minecraft>-<forge>`), as listed by maven.
pub async fn list_forge_versions(cache: &ResponseCache, forge_maven: &str) -> LauncherResult<Vec<String>> {
    let url = format!("{}/{}/maven-metadata.xml", forge_maven.trim_end_matches('/'), FORGE_PATH);
    Ok(MavenMetadata::fetch(cache, &url).await?.versions)
}

/// Newest Forge version for `minecraft`, if any.
pub async fn find_forge_version(
    cache: &ResponseCache,
    forge_maven: &str,
    minecraft: &str,
) -> LauncherResult<Option<String>> {
    let prefix = format!("{}-", minecraft);
    let versions = list_forge_versions(cache, forge_maven).await?;
    // Maven metadata lists oldest first.
    Ok(versions.into_iter().rev().find(|v| v.starts_with(&prefix)))
}

/// `1.20.1-47.2.0` → `1.20.1-forge-47.2.0`
pub fn forge_to_installed_version(forge_version: &str) -> LauncherResult<String> {
    match forge_version.split_once('-') {
        Some((minecraft, forge)) if !minecraft.is_empty() && !forge.is_empty() => {
            Ok(format!("{}-forge-{}", minecraft, forge))
        }
        _ => Err(LauncherError::Loader(format!(
            "{} is not a Forge version",
            forge_version
        ))),
    }
}

/// Maven version of a package's `forge` dependency. Older builds carry a
/// trailing `-<minecraft>`; the first candidate with a published installer wins.
pub async fn resolve_forge_version(
    client: &reqwest::Client,
    forge_maven: &str,
    minecraft: &str,
    forge: &str,
) -> LauncherResult<String> {
    let candidates = [
        format!("{}-{}", minecraft, forge),
        format!("{}-{}-{}", minecraft, forge, minecraft),
    ];
    for candidate in &candidates {
        let url = installer_url(forge_maven, candidate);
        let status = client.head(&url).send().await?.status();
        debug!("HEAD {} -> {}", url, status);
        if status.is_success() {
            return Ok(candidate.clone());
        }
    }
    Err(LauncherError::VersionNotFound(format!("forge {} for {}", forge, minecraft)))
}
