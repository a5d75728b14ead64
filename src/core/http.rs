// ─── HTTP ───
// Shared client construction and the in-process response cache used for
// version indexes and loader metadata.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;
use tokio::sync::RwLock;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

const APP_USER_AGENT: &str = concat!("cubelaunch/", env!("CARGO_PKG_VERSION"));

/// How long a cached response stays valid.
pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .build()
}

/// Read-through cache of successful GET bodies keyed by URL.
///
/// Cloning is cheap; clones share the same entries.
#[derive(Clone)]
pub struct ResponseCache {
    client: Client,
    ttl: Duration,
    entries: Arc<RwLock<HashMap<String, (Instant, Arc<String>)>>>,
}

impl ResponseCache {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            ttl: CACHE_TTL,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fetch `url`, serving from cache when the entry is younger than the TTL.
    /// Only 2xx responses are stored.
    pub async fn get_text(&self, url: &str) -> LauncherResult<Arc<String>> {
        if let Some((stored_at, body)) = self.entries.read().await.get(url) {
            if stored_at.elapsed() < self.ttl {
                debug!("Cache hit: {}", url);
                return Ok(Arc::clone(body));
            }
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = Arc::new(response.text().await?);
        self.entries
            .write()
            .await
            .insert(url.to_string(), (Instant::now(), Arc::clone(&body)));
        Ok(body)
    }

    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> LauncherResult<T> {
        let body = self.get_text(url).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn cache_serves_repeated_requests_from_memory() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/index.json");
                then.status(200).body(r#"{"versions":[]}"#);
            })
            .await;

        let cache = ResponseCache::new(build_http_client().unwrap());
        let url = server.url("/index.json");
        let first = cache.get_text(&url).await.unwrap();
        let second = cache.get_text(&url).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(mock.hits_async().await, 1);
    }

    #[tokio::test]
    async fn failed_responses_are_not_cached() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/missing.json");
                then.status(404);
            })
            .await;

        let cache = ResponseCache::new(build_http_client().unwrap());
        let url = server.url("/missing.json");
        assert!(cache.get_text(&url).await.is_err());
        assert!(cache.get_text(&url).await.is_err());
        assert_eq!(mock.hits_async().await, 2);
    }
}
