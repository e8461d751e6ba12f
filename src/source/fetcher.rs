//! Streaming HTTP download of a resolved audio stream.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use super::{AudioStream, Fetcher};
use crate::error::{Error, Result};
use crate::pipeline::progress::{ProgressReporter, Stage, fraction_percent};

/// User agent used when the stream doesn't specify one
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Downloads stream URLs with reqwest.
pub struct HttpFetcher {
    http_client: reqwest::Client,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    pub fn new() -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(15))
            // Content-Length must describe the bytes we write
            .no_gzip()
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("HTTP client setup failed, using defaults: {}", e);
                reqwest::Client::default()
            });

        Self { http_client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        stream: &AudioStream,
        dest: &Path,
        progress: &ProgressReporter,
    ) -> Result<PathBuf> {
        progress.stage(Stage::Downloading, "Downloading...");
        tracing::debug!("Fetching format {} to {:?}", stream.format_id, dest);

        let mut request = self.http_client.get(&stream.url);
        for (name, value) in &stream.http_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::download(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::download(format!("HTTP {}", status)));
        }

        let size = match response.content_length() {
            Some(bytes) => Some(ExpectedSize::exact(bytes)),
            None => stream.filesize.map(ExpectedSize::approximate),
        };
        let written = write_stream(response.bytes_stream(), dest, size, progress).await?;

        tracing::info!("Downloaded {} bytes to {:?}", written, dest);
        Ok(dest.to_path_buf())
    }
}

/// How many bytes a download should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedSize {
    pub bytes: u64,
    /// From Content-Length rather than a site estimate
    pub exact: bool,
}

impl ExpectedSize {
    pub fn exact(bytes: u64) -> Self {
        Self { bytes, exact: true }
    }

    pub fn approximate(bytes: u64) -> Self {
        Self {
            bytes,
            exact: false,
        }
    }
}

/// Write every chunk of `stream` to `dest`, reporting floored percentages of
/// the expected size as chunks arrive.
///
/// Any failure removes the partial file. A stream that ends short of an
/// exact expected size is a failure too.
pub async fn write_stream<S, B, E>(
    stream: S,
    dest: &Path,
    size: Option<ExpectedSize>,
    progress: &ProgressReporter,
) -> Result<u64>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    match copy_chunks(stream, dest, size, progress).await {
        Ok(written) => {
            progress.percent(100);
            Ok(written)
        }
        Err(e) => {
            if let Err(rm) = tokio::fs::remove_file(dest).await
                && rm.kind() != std::io::ErrorKind::NotFound
            {
                tracing::warn!("Could not remove partial download {:?}: {}", dest, rm);
            }
            Err(e)
        }
    }
}

async fn copy_chunks<S, B, E>(
    stream: S,
    dest: &Path,
    size: Option<ExpectedSize>,
    progress: &ProgressReporter,
) -> Result<u64>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| Error::download(format!("cannot create {:?}: {}", dest, e)))?;

    let mut stream = std::pin::pin!(stream);
    let total = size.map(|s| s.bytes);
    let mut received: u64 = 0;
    if total.is_some() {
        progress.percent(0);
    }

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::download(format!("stream error: {}", e)))?;
        let bytes = chunk.as_ref();
        file.write_all(bytes)
            .await
            .map_err(|e| Error::download(format!("write failed: {}", e)))?;
        received += bytes.len() as u64;

        if let Some(pct) = fraction_percent(received, total) {
            progress.percent(pct);
        }
    }

    file.flush()
        .await
        .map_err(|e| Error::download(format!("write failed: {}", e)))?;

    if let Some(expected) = size
        && expected.exact
        && received < expected.bytes
    {
        return Err(Error::download(format!(
            "stream ended after {} of {} bytes",
            received, expected.bytes
        )));
    }

    Ok(received)
}
