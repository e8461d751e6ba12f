//! Source resolution via `yt-dlp --dump-json`.
//!
//! yt-dlp does the site-specific work (signature deciphering, throttling
//! parameters, format listing); we only read its JSON description of the
//! video and pick an audio-only format to download ourselves.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::{AudioStream, Resolver, SourceInfo};
use crate::error::{Error, Result};

// ============================================================================
// DTOs
// ============================================================================

/// The parts of yt-dlp's info JSON we use
#[derive(Debug, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    /// Seconds (may be fractional)
    pub duration: Option<f64>,
    #[serde(default)]
    pub formats: Vec<Format>,
}

#[derive(Debug, Deserialize)]
pub struct Format {
    pub format_id: String,
    pub url: Option<String>,
    #[serde(default)]
    pub ext: String,
    pub acodec: Option<String>,
    pub vcodec: Option<String>,
    pub abr: Option<f64>,
    pub tbr: Option<f64>,
    pub filesize: Option<u64>,
    pub filesize_approx: Option<u64>,
    pub protocol: Option<String>,
    #[serde(default)]
    pub http_headers: BTreeMap<String, String>,
}

impl Format {
    /// Audio only, fetchable with one plain HTTP GET
    fn is_direct_audio(&self) -> bool {
        let has_audio = self.acodec.as_deref().is_some_and(|c| c != "none");
        let no_video = self.vcodec.as_deref() == Some("none");
        let plain_http = matches!(self.protocol.as_deref(), None | Some("http" | "https"));
        has_audio && no_video && plain_http && self.url.is_some()
    }

    fn bitrate(&self) -> f64 {
        self.abr.or(self.tbr).unwrap_or(0.0)
    }
}

// ============================================================================
// Adapter
// ============================================================================

/// Convert yt-dlp output into a [`SourceInfo`], keeping direct audio-only
/// formats sorted best bitrate first.
pub fn to_source_info(info: VideoInfo) -> SourceInfo {
    let mut formats: Vec<Format> = info
        .formats
        .into_iter()
        .filter(Format::is_direct_audio)
        .collect();
    formats.sort_by(|a, b| b.bitrate().total_cmp(&a.bitrate()));

    let streams = formats
        .into_iter()
        .filter_map(|f| {
            let filesize = f.filesize.or(f.filesize_approx);
            Some(AudioStream {
                url: f.url?,
                format_id: f.format_id,
                ext: f.ext,
                acodec: f.acodec,
                abr: f.abr,
                filesize,
                http_headers: f.http_headers.into_iter().collect(),
            })
        })
        .collect();

    SourceInfo {
        id: info.id,
        title: info.title,
        duration: info
            .duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .and_then(|d| Duration::try_from_secs_f64(d).ok()),
        streams,
    }
}

/// Only http(s) URLs are passed to yt-dlp, so a stray argument can never be
/// read as an option or a local path.
fn validate_url(url: &str) -> Result<()> {
    let parsed = reqwest::Url::parse(url.trim())
        .map_err(|e| Error::source_unavailable(format!("invalid URL {:?}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::source_unavailable(format!(
            "unsupported URL scheme {:?}",
            other
        ))),
    }
}

/// Last non-empty stderr line, which is where yt-dlp puts its `ERROR:` text
fn last_error_line(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no output")
        .to_string()
}

// ============================================================================
// Resolver
// ============================================================================

/// Resolves video pages by running the yt-dlp binary.
pub struct YtDlpResolver {
    binary: PathBuf,
}

impl YtDlpResolver {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl Resolver for YtDlpResolver {
    async fn resolve(&self, url: &str) -> Result<SourceInfo> {
        validate_url(url)?;
        tracing::debug!("Resolving {} with {:?}", url, self.binary);

        let output = Command::new(&self.binary)
            .args(["--dump-json", "--no-playlist", "--no-warnings", "--"])
            .arg(url.trim())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                Error::source_unavailable(format!("could not run {:?}: {}", self.binary, e))
            })?;

        if !output.status.success() {
            return Err(Error::source_unavailable(last_error_line(&output.stderr)));
        }

        let info: VideoInfo = serde_json::from_slice(&output.stdout).map_err(|e| {
            Error::source_unavailable(format!("unreadable yt-dlp output: {}", e))
        })?;
        let source = to_source_info(info);

        tracing::info!(
            "Resolved {:?} ({} audio streams)",
            source.title,
            source.streams.len()
        );
        Ok(source)
    }
}
