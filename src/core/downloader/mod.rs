mod client;

pub use client::{sha1_file, DownloadJob, Downloader};
