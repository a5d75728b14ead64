use std::path::Path;

use async_trait::async_trait;

use super::context::InstallContext;
use super::direct::{MergeLoader, MetaVersion};
use super::installer::{LoaderInstallResult, LoaderInstaller, StageTracker};
use crate::core::error::LauncherResult;
use crate::core::http::ResponseCache;
use crate::core::state::Endpoints;

/// Quilt through `quilt-installer`; same flow as Fabric with its own CLI.
pub struct QuiltInstaller;

impl QuiltInstaller {
    pub fn new() -> Self {
        Self
    }

    pub(crate) fn loader(endpoints: &Endpoints) -> MergeLoader {
        MergeLoader {
            name: "Quilt",
            meta_base: endpoints.quilt_meta.clone(),
            installer_dir: format!(
                "{}/org/quiltmc/quilt-installer",
                endpoints.quilt_maven.trim_end_matches('/')
            ),
            installer_artifact: "quilt-installer",
            id_prefix: "quilt-loader",
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

impl Default for QuiltInstaller {
    fn default() -> Self {
        Self::new()
    }
}

fn installer_args(root: &Path, minecraft: &str, loader: &str) -> Vec<String> {
    vec![
        "install".into(),
        "client".into(),
        minecraft.into(),
        loader.into(),
        format!("--install-dir={}", root.to_string_lossy()),
        "--no-profile".into(),
    ]
}

#[async_trait]
impl LoaderInstaller for QuiltInstaller {
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
    use crate::core::http::build_http_client;
    use httpmock::prelude::*;

    #[test]
    fn installer_cli_shape() {
        let args = installer_args(Path::new("/mc"), "1.20.1", "0.23.1");
        assert_eq!(
            args,
            vec!["install", "client", "1.20.1", "0.23.1", "--install-dir=/mc", "--no-profile"]
        );
        assert_eq!(
            QuiltInstaller::loader(&Endpoints::default()).composite_id("1.20.1", "0.23.1"),
            "quilt-loader-0.23.1-1.20.1"
        );
    }

    #[tokio::test]
    async fn stable_versions_and_latest_loader() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v3/versions/game");
                then.status(200).json_body(serde_json::json!([
                    {"version": "1.20.2", "stable": true},
                    {"version": "23w40a", "stable": false}
                ]));
            })
            .await;
        server
            .mock_async(|when, then| {
                // Quilt loader entries carry no `stable` flag.
                when.method(GET).path("/v3/versions/loader");
                then.status(200).json_body(serde_json::json!([
                    {"version": "0.23.1", "maven": "org.quiltmc:quilt-loader:0.23.1"}
                ]));
            })
            .await;

        let cache = ResponseCache::new(build_http_client().unwrap());
        let endpoints = Endpoints {
            quilt_meta: server.url("/v3"),
            ..Endpoints::default()
        };
        let loader = QuiltInstaller::loader(&endpoints);

        assert_eq!(loader.stable_game_versions(&cache).await.unwrap(), vec!["1.20.2"]);
        assert!(loader.is_supported(&cache, "23w40a").await.unwrap());
        assert_eq!(
            QuiltInstaller::latest_loader_version(&cache, &endpoints).await.unwrap(),
            "0.23.1"
        );
    }
}
