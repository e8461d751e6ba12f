//! Media source resolution and download.
//!
//! - [`ytdlp`] resolves a video page URL into its title, duration and
//!   audio-only stream URLs by running `yt-dlp --dump-json`
//! - [`fetcher`] streams the chosen audio stream to a local file over HTTP,
//!   reporting progress per chunk
//!
//! The pipeline depends on the [`Resolver`] and [`Fetcher`] traits so tests
//! can run without the network or external binaries.

pub mod fetcher;
pub mod ytdlp;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::pipeline::progress::ProgressReporter;

pub use fetcher::HttpFetcher;
pub use ytdlp::YtDlpResolver;

/// What a source URL resolved to
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    /// Site-specific video ID
    pub id: String,
    /// Title as published on the source site
    pub title: String,
    pub duration: Option<Duration>,
    /// Audio-only streams, best first
    pub streams: Vec<AudioStream>,
}

impl SourceInfo {
    /// The stream to download
    pub fn best_audio(&self) -> Option<&AudioStream> {
        self.streams.first()
    }
}

/// A directly downloadable audio-only stream
#[derive(Debug, Clone, PartialEq)]
pub struct AudioStream {
    pub format_id: String,
    pub url: String,
    /// Container extension (`m4a`, `webm`, ...)
    pub ext: String,
    pub acodec: Option<String>,
    /// Average bitrate in kbps
    pub abr: Option<f64>,
    /// Exact or approximate size in bytes, if the site reports one
    pub filesize: Option<u64>,
    /// Headers the stream URL must be requested with
    pub http_headers: Vec<(String, String)>,
}

/// Resolves a source URL to its metadata and streams.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Fails with `SourceUnavailable` if the URL can't be resolved.
    async fn resolve(&self, url: &str) -> Result<SourceInfo>;
}

/// Downloads an audio stream to a local file.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Write `stream` to `dest`, emitting Downloading progress.
    ///
    /// Fails with `DownloadFailed`; on failure no file is left at `dest`.
    async fn fetch(
        &self,
        stream: &AudioStream,
        dest: &Path,
        progress: &ProgressReporter,
    ) -> Result<PathBuf>;
}
