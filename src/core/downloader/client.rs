use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use reqwest::Client;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::core::error::{io_err, LauncherError, LauncherResult};
use crate::core::paths::ensure_inside;
use crate::core::progress::{NoProgress, ProgressReporter};

/// A single file to fetch. `dest` must resolve inside `root`.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub url: String,
    pub dest: PathBuf,
    pub sha1: Option<String>,
    pub root: PathBuf,
}

impl DownloadJob {
    pub fn new(url: impl Into<String>, dest: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            dest: dest.into(),
            sha1: None,
            root: root.into(),
        }
    }

    pub fn with_sha1(mut self, sha1: Option<impl Into<String>>) -> Self {
        self.sha1 = sha1.map(Into::into).filter(|s: &String| !s.is_empty());
        self
    }
}

/// Concurrent, SHA-1 validated downloader.
#[derive(Clone)]
pub struct Downloader {
    client: Client,
    /// Maximum number of parallel downloads.
    concurrency: usize,
    retries: u32,
    retry_delay: Duration,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            concurrency: 8,
            retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn with_retries(mut self, retries: u32, delay: Duration) -> Self {
        self.retries = retries.max(1);
        self.retry_delay = delay;
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    // ── Single file download ────────────────────────────

    /// Fetch one file. Returns `false` when the destination already holds the
    /// expected content and nothing was transferred.
    pub async fn download(
        &self,
        job: &DownloadJob,
        overwrite: bool,
        progress: &dyn ProgressReporter,
    ) -> LauncherResult<bool> {
        let dest = ensure_inside(&job.root, &job.dest)?;

        if !overwrite && tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            let Some(expected) = &job.sha1 else {
                return Ok(false);
            };
            if sha1_file(&dest).await? == *expected {
                return Ok(false);
            }
            debug!("Checksum changed, refetching {:?}", dest);
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(io_err(parent))?;
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch_to(&job.url, &dest, progress).await {
                Ok(()) => break,
                Err(e) if attempt < self.retries => {
                    warn!(
                        "Download attempt {}/{} for {} failed: {}",
                        attempt, self.retries, job.url, e
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(expected) = &job.sha1 {
            let actual = sha1_file(&dest).await?;
            if actual != *expected {
                return Err(LauncherError::InvalidChecksum {
                    url: job.url.clone(),
                    path: dest,
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        debug!("Downloaded: {} -> {:?}", job.url, dest);
        Ok(true)
    }

    async fn fetch_to(
        &self,
        url: &str,
        dest: &Path,
        progress: &dyn ProgressReporter,
    ) -> LauncherResult<()> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let file_name = dest
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        progress.set_status(&format!("Downloading {}", file_name));
        progress.set_max(response.content_length().unwrap_or(0));

        // The body lands in `<dest>.part` and only replaces `dest` once complete.
        let partial = partial_path(dest);
        let written = async {
            let mut file = tokio::fs::File::create(&partial)
                .await
                .map_err(io_err(&partial))?;
            let mut written = 0u64;
            let mut body = response.bytes_stream();
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await.map_err(io_err(&partial))?;
                written += chunk.len() as u64;
                progress.set_progress(written);
            }
            file.flush().await.map_err(io_err(&partial))?;
            Ok::<_, LauncherError>(())
        }
        .await;

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }
        tokio::fs::rename(&partial, dest)
            .await
            .map_err(io_err(dest))?;
        Ok(())
    }

    // ── Batch concurrent downloads ──────────────────────

    /// Download many files with bounded parallelism.
    ///
    /// Every job runs to completion; the first error (in completion order) is
    /// returned afterwards. Returns the number of files actually transferred.
    pub async fn download_all(
        &self,
        jobs: Vec<DownloadJob>,
        progress: &dyn ProgressReporter,
    ) -> LauncherResult<usize> {
        info!(
            "Starting batch download: {} files, concurrency={}",
            jobs.len(),
            self.concurrency
        );
        progress.set_max(jobs.len() as u64);

        let mut results = stream::iter(jobs)
            .map(|job| async move { self.download(&job, false, &NoProgress).await })
            .buffer_unordered(self.concurrency);

        let mut completed = 0u64;
        let mut changed = 0usize;
        let mut first_error = None;
        while let Some(result) = results.next().await {
            completed += 1;
            progress.set_progress(completed);
            match result {
                Ok(true) => changed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("Batch download entry failed: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(changed),
        }
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Hex SHA-1 of a file on disk.
pub async fn sha1_file(path: &Path) -> LauncherResult<String> {
    let mut file = tokio::fs::File::open(path).await.map_err(io_err(path))?;
    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).await.map_err(io_err(path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::http::build_http_client;
    use httpmock::prelude::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn sha1_hex(bytes: &[u8]) -> String {
        hex::encode(Sha1::digest(bytes))
    }

    fn downloader() -> Downloader {
        Downloader::new(build_http_client().unwrap())
            .with_retries(3, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn second_download_is_a_no_op() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/lib.jar");
                then.status(200).body("library bytes");
            })
            .await;

        let root = tempfile::tempdir().unwrap();
        let job = DownloadJob::new(server.url("/lib.jar"), root.path().join("libraries/lib.jar"), root.path())
            .with_sha1(Some(sha1_hex(b"library bytes")));

        let dl = downloader();
        assert!(dl.download(&job, false, &NoProgress).await.unwrap());
        assert!(!dl.download(&job, false, &NoProgress).await.unwrap());
        assert_eq!(mock.hits_async().await, 1);
    }

    #[tokio::test]
    async fn existing_file_with_stale_checksum_is_refetched() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/a.bin");
                then.status(200).body("fresh");
            })
            .await;

        let root = tempfile::tempdir().unwrap();
        let dest = root.path().join("a.bin");
        std::fs::write(&dest, "stale").unwrap();

        let job = DownloadJob::new(server.url("/a.bin"), &dest, root.path())
            .with_sha1(Some(sha1_hex(b"fresh")));
        assert!(downloader().download(&job, false, &NoProgress).await.unwrap());
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "fresh");
        assert_eq!(mock.hits_async().await, 1);
    }

    #[tokio::test]
    async fn checksum_mismatch_fails_and_leaves_file() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/bad.jar");
                then.status(200).body("tampered");
            })
            .await;

        let root = tempfile::tempdir().unwrap();
        let dest = root.path().join("bad.jar");
        let job = DownloadJob::new(server.url("/bad.jar"), &dest, root.path())
            .with_sha1(Some(sha1_hex(b"original")));

        let err = downloader().download(&job, false, &NoProgress).await.unwrap_err();
        assert!(matches!(err, LauncherError::InvalidChecksum { .. }));
        assert!(dest.exists());
    }

    #[tokio::test]
    async fn destination_outside_root_is_rejected_before_fetching() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/evil");
                then.status(200).body("x");
            })
            .await;

        let root = tempfile::tempdir().unwrap();
        let job = DownloadJob::new(server.url("/evil"), root.path().join("../escape.txt"), root.path());

        let err = downloader().download(&job, false, &NoProgress).await.unwrap_err();
        assert!(matches!(err, LauncherError::PathOutsideRoot { .. }));
        assert_eq!(mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn failing_server_is_retried_then_reported() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/flaky");
                then.status(500);
            })
            .await;

        let root = tempfile::tempdir().unwrap();
        let job = DownloadJob::new(server.url("/flaky"), root.path().join("flaky"), root.path());

        let err = downloader().download(&job, false, &NoProgress).await.unwrap_err();
        assert!(matches!(err, LauncherError::DownloadFailed { status: 500, .. }));
        assert_eq!(mock.hits_async().await, 3);
    }

    struct Counter(AtomicU64);

    impl ProgressReporter for Counter {
        fn set_progress(&self, value: u64) {
            let previous = self.0.swap(value, Ordering::SeqCst);
            assert!(value > previous);
        }
    }

    #[tokio::test]
    async fn batch_reports_monotonic_progress_and_surfaces_errors() {
        let server = MockServer::start_async().await;
        for i in 0..5 {
            let path = format!("/f{}", i);
            server
                .mock_async(move |when, then| {
                    when.method(GET).path(path);
                    then.status(200).body("ok");
                })
                .await;
        }
        server
            .mock_async(|when, then| {
                when.method(GET).path("/gone");
                then.status(404);
            })
            .await;

        let root = tempfile::tempdir().unwrap();
        let mut jobs: Vec<_> = (0..5)
            .map(|i| {
                DownloadJob::new(
                    server.url(format!("/f{}", i)),
                    root.path().join(format!("f{}", i)),
                    root.path(),
                )
            })
            .collect();
        jobs.push(DownloadJob::new(server.url("/gone"), root.path().join("gone"), root.path()));

        let counter = Counter(AtomicU64::new(0));
        let result = downloader().download_all(jobs, &counter).await;

        assert!(matches!(result, Err(LauncherError::DownloadFailed { status: 404, .. })));
        assert_eq!(counter.0.load(Ordering::SeqCst), 6);
        for i in 0..5 {
            assert!(root.path().join(format!("f{}", i)).exists());
        }
    }

    #[tokio::test]
    async fn body_is_written_through_a_partial_file() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/pack.zip");
                then.status(200).body("complete archive");
            })
            .await;

        let root = tempfile::tempdir().unwrap();
        let dest = root.path().join("archives/pack.zip");
        let partial = root.path().join("archives/pack.zip.part");
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
        std::fs::write(&partial, "leftover from an interrupted run").unwrap();

        let job = DownloadJob::new(server.url("/pack.zip"), &dest, root.path());
        assert!(downloader().download(&job, false, &NoProgress).await.unwrap());
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "complete archive");
        assert!(!partial.exists());
    }

    #[tokio::test]
    async fn failed_refetch_keeps_previous_file() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/pack.zip");
                then.status(503);
            })
            .await;

        let root = tempfile::tempdir().unwrap();
        let dest = root.path().join("pack.zip");
        std::fs::write(&dest, "previous archive").unwrap();

        let job = DownloadJob::new(server.url("/pack.zip"), &dest, root.path());
        assert!(downloader().download(&job, true, &NoProgress).await.is_err());
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "previous archive");
        assert!(!root.path().join("pack.zip.part").exists());
    }
}
