use std::path::Path;

use async_trait::async_trait;

use super::context::InstallContext;
use super::direct::{MergeLoader, MetaVersion};
use super::installer::{LoaderInstallResult, LoaderInstaller, StageTracker};
use crate::core::error::LauncherResult;
use crate::core::http::ResponseCache;
use crate::core::state::Endpoints;

/// Fabric through the official `fabric-installer` jar.
pub struct FabricInstaller;

impl FabricInstaller {
    pub fn new() -> Self {
        Self
    }

    pub(crate) fn loader(endpoints: &Endpoints) -> MergeLoader {
        MergeLoader {
            name: "Fabric",
            meta_base: endpoints.fabric_meta.clone(),
            installer_dir: format!(
                "{}/net/fabricmc/fabric-installer",
                endpoints.fabric_maven.trim_end_matches('/')
            ),
            installer_artifact: "fabric-installer",
            id_prefix: "fabric-loader",
            installer_args,
        }
    }

    pub async fn supported_versions(
        cache: &ResponseCache,
        endpoints: &Endpoints,
    ) -> LauncherResult<Vec<MetaVersion>> {
        Self::loader(endpoints).game_versions(cache).await
    }

    pub async fn latest_loader_version(
        cache: &ResponseCache,
        endpoints: &Endpoints,
    ) -> LauncherResult<String> {
        Self::loader(endpoints).latest_loader(cache).await
    }
}

impl Default for FabricInstaller {
    fn default() -> Self {
        Self::new()
    }
}

fn installer_args(root: &Path, minecraft: &str, loader: &str) -> Vec<String> {
    vec![
        "client".into(),
        "-dir".into(),
        root.to_string_lossy().into_owned(),
        "-mcversion".into(),
        minecraft.into(),
        "-loader".into(),
        loader.into(),
        "-noprofile".into(),
        "-snapshot".into(),
    ]
}

#[async_trait]
impl LoaderInstaller for FabricInstaller {
    async fn install(
        &self,
        ctx: &InstallContext<'_>,
        stages: &mut StageTracker<'_>,
    ) -> LauncherResult<LoaderInstallResult> {
        Self::loader(ctx.endpoints).install(ctx, stages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::downloader::Downloader;
    use crate::core::error::LauncherError;
    use crate::core::http::build_http_client;
    use crate::core::loaders::installer::{InstallStage, Installer};
    use crate::core::loaders::LoaderKind;
    use crate::core::progress::NoProgress;
    use crate::core::version::{manifest_path, Platform, VersionResolver};
    use httpmock::prelude::*;

    fn write_manifest(root: &Path, id: &str, body: serde_json::Value) {
        let path = manifest_path(root, id);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body.to_string()).unwrap();
    }

    async fn mock_meta(server: &MockServer) {
        server
            .mock_async(|when, then| {
                when.method(GET).path("/meta/versions/game");
                then.status(200).json_body(serde_json::json!([
                    {"version": "1.20.1", "stable": true},
                    {"version": "23w31a", "stable": false}
                ]));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/meta/versions/loader");
                then.status(200).json_body(serde_json::json!([
                    {"version": "0.15.7", "stable": true},
                    {"version": "0.15.6", "stable": true}
                ]));
            })
            .await;
    }

    #[test]
    fn composite_id_and_arguments() {
        let loader = FabricInstaller::loader(&Endpoints::default());
        assert_eq!(loader.composite_id("1.20.1", "0.15.7"), "fabric-loader-0.15.7-1.20.1");

        let args = installer_args(Path::new("/mc"), "1.20.1", "0.15.7");
        assert_eq!(args[0], "client");
        assert!(args.windows(2).any(|w| w[0] == "-loader" && w[1] == "0.15.7"));
        assert_eq!(args.last().map(String::as_str), Some("-snapshot"));
    }

    #[tokio::test]
    async fn unsupported_base_version_is_rejected() {
        let server = MockServer::start_async().await;
        mock_meta(&server).await;

        let root = tempfile::tempdir().unwrap();
        write_manifest(root.path(), "1.8.9", serde_json::json!({"id": "1.8.9"}));

        let client = build_http_client().unwrap();
        let downloader = Downloader::new(client.clone());
        let resolver = VersionResolver::new(ResponseCache::new(client), server.url("/index.json"));
        let endpoints = Endpoints {
            fabric_meta: server.url("/meta"),
            ..Endpoints::default()
        };
        let platform = Platform::current();
        let ctx = InstallContext {
            minecraft_version: "1.8.9",
            loader_version: None,
            root: root.path(),
            downloader: &downloader,
            resolver: &resolver,
            endpoints: &endpoints,
            platform: &platform,
            progress: &NoProgress,
            java: None,
            install_runtime: false,
        };

        let err = Installer::new(LoaderKind::Fabric).install(&ctx).await.unwrap_err();
        assert!(matches!(err, LauncherError::UnsupportedVersion { .. }));
    }

    /// The fake installer writes the composite manifest the way the real one does.
    #[cfg(unix)]
    #[tokio::test]
    async fn installer_output_is_installed_as_composite_version() {
        use std::os::unix::fs::PermissionsExt;

        let server = MockServer::start_async().await;
        mock_meta(&server).await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/maven/net/fabricmc/fabric-installer/maven-metadata.xml");
                then.status(200).body(
                    "<metadata><versioning><latest>1.0.1</latest><versions><version>1.0.1</version></versions></versioning></metadata>",
                );
            })
            .await;
        let installer_jar = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/maven/net/fabricmc/fabric-installer/1.0.1/fabric-installer-1.0.1.jar");
                then.status(200).body("jar");
            })
            .await;

        let root = tempfile::tempdir().unwrap();
        write_manifest(
            root.path(),
            "1.20.1",
            serde_json::json!({"id": "1.20.1", "mainClass": "net.minecraft.client.main.Main"}),
        );

        let composite = "fabric-loader-0.15.7-1.20.1";
        let java = root.path().join("fake-java");
        std::fs::write(
            &java,
            format!(
                "#!/bin/sh\nmkdir -p \"{dir}\"\necho '{{\"id\":\"{id}\",\"inheritsFrom\":\"1.20.1\",\"mainClass\":\"net.fabricmc.loader.impl.launch.knot.KnotClient\"}}' > \"{dir}/{id}.json\"\n",
                dir = root.path().join("versions").join(composite).display(),
                id = composite
            ),
        )
        .unwrap();
        std::fs::set_permissions(&java, std::fs::Permissions::from_mode(0o755)).unwrap();

        let client = build_http_client().unwrap();
        let downloader = Downloader::new(client.clone());
        let resolver = VersionResolver::new(ResponseCache::new(client), server.url("/index.json"));
        let endpoints = Endpoints {
            fabric_meta: server.url("/meta"),
            fabric_maven: server.url("/maven"),
            ..Endpoints::default()
        };
        let platform = Platform::current();
        let ctx = InstallContext {
            minecraft_version: "1.20.1",
            loader_version: None,
            root: root.path(),
            downloader: &downloader,
            resolver: &resolver,
            endpoints: &endpoints,
            platform: &platform,
            progress: &NoProgress,
            java: Some(&java),
            install_runtime: false,
        };

        let result = Installer::new(LoaderKind::Fabric).install(&ctx).await.unwrap();
        assert_eq!(result.version_id, composite);
        assert_eq!(result.loader_version.as_deref(), Some("0.15.7"));
        assert!(result.stages.contains(&InstallStage::InstallerRunning));
        assert!(manifest_path(root.path(), composite).is_file());
        assert_eq!(installer_jar.hits_async().await, 1);
    }
}
