use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::progress::ProgressReporter;

use super::{
    context::InstallContext, fabric::FabricInstaller, forge::ForgeInstaller,
    quilt::QuiltInstaller, vanilla::VanillaInstaller,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderKind {
    Vanilla,
    Fabric,
    Quilt,
    Forge,
}

impl fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoaderKind::Vanilla => "vanilla",
            LoaderKind::Fabric => "fabric",
            LoaderKind::Quilt => "quilt",
            LoaderKind::Forge => "forge",
        };
        f.write_str(name)
    }
}

impl FromStr for LoaderKind {
    type Err = LauncherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vanilla" | "minecraft" => Ok(LoaderKind::Vanilla),
            "fabric" | "fabric-loader" => Ok(LoaderKind::Fabric),
            "quilt" | "quilt-loader" => Ok(LoaderKind::Quilt),
            "forge" => Ok(LoaderKind::Forge),
            other => Err(LauncherError::Loader(format!("Unknown loader {}", other))),
        }
    }
}

// ─── Install stages ───

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallStage {
    NotInstalled,
    BaseInstalling,
    LoaderDownloading,
    InstallerRunning,
    ProcessorsRunning,
    CompositeVersionInstalling,
    Installed,
    Failed,
}

impl InstallStage {
    fn can_advance_to(self, next: InstallStage) -> bool {
        use InstallStage::*;
        match (self, next) {
            (Installed | Failed, _) => false,
            (_, Failed) => true,
            (NotInstalled, BaseInstalling) => true,
            // Vanilla stops after the base.
            (BaseInstalling, LoaderDownloading | Installed) => true,
            (LoaderDownloading, InstallerRunning | ProcessorsRunning) => true,
            (InstallerRunning | ProcessorsRunning, CompositeVersionInstalling) => true,
            (CompositeVersionInstalling, Installed) => true,
            _ => false,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            InstallStage::NotInstalled => "Waiting",
            InstallStage::BaseInstalling => "Installing base version",
            InstallStage::LoaderDownloading => "Downloading loader",
            InstallStage::InstallerRunning => "Running loader installer",
            InstallStage::ProcessorsRunning => "Running install processors",
            InstallStage::CompositeVersionInstalling => "Installing loader version",
            InstallStage::Installed => "Installed",
            InstallStage::Failed => "Installation failed",
        }
    }
}

/// Records stage transitions of one install and reports them as status lines.
pub struct StageTracker<'a> {
    current: InstallStage,
    history: Vec<InstallStage>,
    progress: &'a dyn ProgressReporter,
}

impl<'a> StageTracker<'a> {
    pub fn new(progress: &'a dyn ProgressReporter) -> Self {
        Self {
            current: InstallStage::NotInstalled,
            history: vec![InstallStage::NotInstalled],
            progress,
        }
    }

    pub fn current(&self) -> InstallStage {
        self.current
    }

    pub fn advance(&mut self, next: InstallStage) -> LauncherResult<()> {
        if !self.current.can_advance_to(next) {
            return Err(LauncherError::Loader(format!(
                "Invalid install stage transition {:?} -> {:?}",
                self.current, next
            )));
        }
        self.current = next;
        self.history.push(next);
        self.progress.set_status(next.describe());
        Ok(())
    }

    fn fail(&mut self) {
        if self.current != InstallStage::Failed {
            self.current = InstallStage::Failed;
            self.history.push(InstallStage::Failed);
            self.progress.set_status(InstallStage::Failed.describe());
        }
    }

    pub fn into_history(self) -> Vec<InstallStage> {
        self.history
    }
}

// ─── Dispatcher ───

/// Unified install outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderInstallResult {
    /// Version id to launch (`fabric-loader-…`, `…-forge-…`, or the base id).
    pub version_id: String,
    pub loader_version: Option<String>,
    pub stages: Vec<InstallStage>,
}

#[async_trait]
pub trait LoaderInstaller: Send + Sync {
    async fn install(
        &self,
        ctx: &InstallContext<'_>,
        stages: &mut StageTracker<'_>,
    ) -> LauncherResult<LoaderInstallResult>;
}

/// Dispatcher without `Box<dyn>`.
pub enum Installer {
    Vanilla(VanillaInstaller),
    Fabric(FabricInstaller),
    Quilt(QuiltInstaller),
    Forge(ForgeInstaller),
}

impl Installer {
    pub fn new(kind: LoaderKind) -> Self {
        match kind {
            LoaderKind::Vanilla => Self::Vanilla(VanillaInstaller),
            LoaderKind::Fabric => Self::Fabric(FabricInstaller::new()),
            LoaderKind::Quilt => Self::Quilt(QuiltInstaller::new()),
            LoaderKind::Forge => Self::Forge(ForgeInstaller),
        }
    }

    pub fn kind(&self) -> LoaderKind {
        match self {
            Installer::Vanilla(_) => LoaderKind::Vanilla,
            Installer::Fabric(_) => LoaderKind::Fabric,
            Installer::Quilt(_) => LoaderKind::Quilt,
            Installer::Forge(_) => LoaderKind::Forge,
        }
    }

    /// Run the install. A failing stage is recorded and the error surfaced
    /// as is; nothing is retried.
    pub async fn install(&self, ctx: &InstallContext<'_>) -> LauncherResult<LoaderInstallResult> {
        info!(
            "Installing {} for Minecraft {} (loader {})",
            self.kind(),
            ctx.minecraft_version,
            ctx.loader_version.unwrap_or("latest")
        );

        let mut stages = StageTracker::new(ctx.progress);
        let outcome = match self {
            Installer::Vanilla(i) => i.install(ctx, &mut stages).await,
            Installer::Fabric(i) => i.install(ctx, &mut stages).await,
            Installer::Quilt(i) => i.install(ctx, &mut stages).await,
            Installer::Forge(i) => i.install(ctx, &mut stages).await,
        };

        match outcome {
            Ok(mut result) => {
                info!("{} installed as {}", self.kind(), result.version_id);
                result.stages = stages.into_history();
                Ok(result)
            }
            Err(e) => {
                error!(
                    "{} install failed during {:?}: {}",
                    self.kind(),
                    stages.current(),
                    e
                );
                stages.fail();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::progress::NoProgress;

    #[test]
    fn processor_path_reaches_installed() {
        let mut tracker = StageTracker::new(&NoProgress);
        for stage in [
            InstallStage::BaseInstalling,
            InstallStage::LoaderDownloading,
            InstallStage::ProcessorsRunning,
            InstallStage::CompositeVersionInstalling,
            InstallStage::Installed,
        ] {
            tracker.advance(stage).unwrap();
        }
        assert_eq!(tracker.current(), InstallStage::Installed);
        assert_eq!(tracker.into_history().len(), 6);
    }

    #[test]
    fn stages_cannot_be_skipped_or_left() {
        let mut tracker = StageTracker::new(&NoProgress);
        assert!(tracker.advance(InstallStage::InstallerRunning).is_err());

        tracker.advance(InstallStage::BaseInstalling).unwrap();
        tracker.fail();
        assert!(tracker.advance(InstallStage::Installed).is_err());
        assert_eq!(tracker.current(), InstallStage::Failed);
    }

    #[test]
    fn loader_names_parse() {
        assert_eq!("fabric-loader".parse::<LoaderKind>().unwrap(), LoaderKind::Fabric);
        assert_eq!("Forge".parse::<LoaderKind>().unwrap(), LoaderKind::Forge);
        assert!("neoforge".parse::<LoaderKind>().is_err());
    }
}
