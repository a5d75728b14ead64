use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the installation and launch engine.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Path {path:?} resolves outside of {root:?}")]
    PathOutsideRoot { path: PathBuf, root: PathBuf },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Integrity ───────────────────────────────────────
    #[error("Checksum mismatch for {url} at {path:?}: expected {expected}, got {actual}")]
    InvalidChecksum {
        url: String,
        path: PathBuf,
        expected: String,
        actual: String,
    },

    // ── Versions ────────────────────────────────────────
    #[error("Version {0} was not found")]
    VersionNotFound(String),

    #[error("Version {version} is not supported by {loader}")]
    UnsupportedVersion { loader: String, version: String },

    // ── Maven ───────────────────────────────────────────
    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    // ── Parsing ─────────────────────────────────────────
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Processes ───────────────────────────────────────
    #[error("{command} exited with code {code:?}\nSTDOUT:\n{stdout}\nSTDERR:\n{stderr}")]
    ExternalProgram {
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("Java runtime is not available for {os}/{arch}")]
    PlatformNotSupported { os: String, arch: String },

    // ── Loader ──────────────────────────────────────────
    #[error("Loader error: {0}")]
    Loader(String),

    #[error("Loader API unreachable: {0}")]
    LoaderApi(String),

    // ── Packages ────────────────────────────────────────
    #[error("Package not found: {0}")]
    PackageNotFound(String),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

/// Attach a path to an IO error.
pub(crate) fn io_err(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> LauncherError {
    let path = path.into();
    move |source| LauncherError::Io { path, source }
}
