//! The download pipeline: one URL in, one tagged MP3 out.
//!
//! Stages run in order, each reporting through a [`ProgressReporter`]:
//!
//! 1. **Resolving**: ask the [`Resolver`] for the title and audio streams,
//!    then (optionally) look the title up in the catalog
//! 2. **Downloading**: stream the best audio to `tmp_<title>_<id>.<ext>`
//! 3. **Converting**: encode to `.<title>.<id>.mp3.part`, then rename to
//!    `<title>.mp3`; the temp download is deleted either way
//! 4. **Tagging**: only with a catalog match; fetch the cover and write
//!    title, artist, album and cover frames
//! 5. **Done**: carries the final title
//!
//! A catalog miss or lookup error never fails the run, it just means the
//! source title is used and no tags are written. Cover or tag failures after
//! the MP3 exists are surfaced as errors but the MP3 is kept.

pub mod paths;
pub mod progress;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::catalog::{CatalogApi, CatalogTrack, DeezerClient};
use crate::config::Config;
use crate::error::{Error, Result, ResultExt};
use crate::source::{Fetcher, HttpFetcher, Resolver, SourceInfo, YtDlpResolver};
use crate::tools::{self, Tool};
use crate::transcode::{EncodeOptions, Encoder, FfmpegEncoder};

pub use paths::PipelinePaths;
pub use progress::{ProgressEvent, ProgressReporter, ProgressSender, Stage};

/// One user request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Unique per request; keeps temp files of concurrent runs apart
    pub id: Uuid,
    pub source_url: String,
    /// Look the track up in the catalog for a better title and tags
    pub want_cover_lookup: bool,
    /// Free text to search the catalog with (defaults to the source title)
    pub cover_search_title: Option<String>,
}

impl DownloadRequest {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_url: source_url.into(),
            want_cover_lookup: false,
            cover_search_title: None,
        }
    }

    /// Enable catalog lookup, searching for `title` if given.
    pub fn with_cover_lookup(mut self, title: Option<String>) -> Self {
        self.want_cover_lookup = true;
        self.cover_search_title = title.filter(|t| !t.trim().is_empty());
        self
    }
}

/// Settings the pipeline takes from [`Config`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub output_dir: PathBuf,
    pub bitrate_kbps: u32,
    /// Pause between download and transcode
    pub settle_delay: Duration,
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_dir: config.output.resolved_dir(),
            bitrate_kbps: config.output.bitrate_kbps,
            settle_delay: Duration::from_millis(config.pipeline.settle_delay_ms),
        }
    }
}

/// Runs download requests.
///
/// Requests share nothing but the output directory, so one `Pipeline` can run
/// several requests concurrently.
pub struct Pipeline {
    options: PipelineOptions,
    resolver: Arc<dyn Resolver>,
    fetcher: Arc<dyn Fetcher>,
    encoder: Arc<dyn Encoder>,
    catalog: Arc<dyn CatalogApi>,
}

impl Pipeline {
    pub fn new(
        options: PipelineOptions,
        resolver: Arc<dyn Resolver>,
        fetcher: Arc<dyn Fetcher>,
        encoder: Arc<dyn Encoder>,
        catalog: Arc<dyn CatalogApi>,
    ) -> Self {
        Self {
            options,
            resolver,
            fetcher,
            encoder,
            catalog,
        }
    }

    /// Real implementations: yt-dlp, reqwest, ffmpeg and Deezer.
    ///
    /// Probes for the tool binaries, so call this outside the async runtime.
    pub fn from_config(config: &Config) -> Self {
        let yt_dlp = tools::locate_or_default(Tool::YtDlp, config.tools.yt_dlp.as_deref());
        let ffmpeg = tools::locate_or_default(Tool::Ffmpeg, config.tools.ffmpeg.as_deref());

        Self::new(
            PipelineOptions::from_config(config),
            Arc::new(YtDlpResolver::new(yt_dlp)),
            Arc::new(HttpFetcher::new()),
            Arc::new(FfmpegEncoder::new(ffmpeg)),
            Arc::new(DeezerClient::with_config(&config.catalog)),
        )
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run `request` to completion, returning the path of the MP3.
    pub async fn run(
        &self,
        request: &DownloadRequest,
        progress: ProgressSender,
    ) -> Result<PathBuf> {
        self.run_with_cancel(request, progress, CancellationToken::new())
            .await
    }

    /// Like [`run`](Self::run), but stops with [`Error::Cancelled`] as soon as
    /// `cancel` fires. Temp and partial files are removed; a finished MP3 is
    /// left in place.
    pub async fn run_with_cancel(
        &self,
        request: &DownloadRequest,
        progress: ProgressSender,
        cancel: CancellationToken,
    ) -> Result<PathBuf> {
        let reporter = ProgressReporter::new(progress);
        tracing::info!(request = %request.id, "Starting download of {}", request.source_url);

        let result = self.execute(request, &reporter, &cancel).await;
        match &result {
            Ok(path) => tracing::info!(request = %request.id, "Finished {:?}", path),
            Err(Error::Cancelled) => tracing::info!(request = %request.id, "Cancelled"),
            Err(e) => tracing::error!(request = %request.id, "Failed: {}", e),
        }
        result
    }

    async fn execute(
        &self,
        request: &DownloadRequest,
        reporter: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        reporter.stage(Stage::Resolving, "Resolving...");
        let source = until_cancelled(cancel, self.resolver.resolve(&request.source_url)).await?;
        let stream = source.best_audio().cloned().ok_or_else(|| {
            Error::source_unavailable(format!("no audio-only stream for {}", request.source_url))
        })?;

        let catalog_track = if request.want_cover_lookup {
            until_cancelled(cancel, async { Ok(self.lookup(request, &source).await) }).await?
        } else {
            None
        };
        let title = catalog_track
            .as_ref()
            .map(CatalogTrack::display_title)
            .unwrap_or_else(|| source.title.clone());

        let paths = PipelinePaths::new(&self.options.output_dir, &title, &request.id, &stream.ext);
        tokio::fs::create_dir_all(&paths.output_dir)
            .await
            .with_context(format!("creating {:?}", paths.output_dir))?;

        let produced = self
            .produce_mp3(&source, &stream, &paths, reporter, cancel)
            .await;
        remove_quietly(&paths.temp_audio_path).await;
        if let Err(e) = produced {
            remove_quietly(&paths.partial_output_path).await;
            return Err(e);
        }

        let output = paths.output_path();
        if let Some(track) = &catalog_track {
            reporter.stage(Stage::Tagging, "Writing MP3 tags");
            until_cancelled(
                cancel,
                crate::metadata::tag_file(&output, track, self.catalog.as_ref()),
            )
            .await?;
        }

        reporter.done(&title);
        Ok(output)
    }

    /// Download, settle, transcode and move into place.
    async fn produce_mp3(
        &self,
        source: &SourceInfo,
        stream: &crate::source::AudioStream,
        paths: &PipelinePaths,
        reporter: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<()> {
        until_cancelled(
            cancel,
            self.fetcher.fetch(stream, &paths.temp_audio_path, reporter),
        )
        .await?;

        if !self.options.settle_delay.is_zero() {
            until_cancelled(cancel, async {
                tokio::time::sleep(self.options.settle_delay).await;
                Ok(())
            })
            .await?;
        }

        let encode = EncodeOptions {
            bitrate_kbps: self.options.bitrate_kbps,
            duration: source.duration,
        };
        until_cancelled(
            cancel,
            self.encoder.transcode(
                &paths.temp_audio_path,
                &paths.partial_output_path,
                &encode,
                reporter,
            ),
        )
        .await?;

        let output = paths.output_path();
        if output.exists() {
            tracing::warn!("Replacing existing {:?}", output);
        }
        tokio::fs::rename(&paths.partial_output_path, &output)
            .await
            .map_err(|e| Error::convert(format!("cannot move output into place: {}", e)))
    }

    /// Catalog match for the request, or `None` on a miss or lookup error.
    async fn lookup(&self, request: &DownloadRequest, source: &SourceInfo) -> Option<CatalogTrack> {
        let query = request
            .cover_search_title
            .as_deref()
            .unwrap_or(&source.title);

        match self.catalog.search(query).await {
            Ok(Some(track)) => {
                tracing::info!("Catalog match for {:?}: {}", query, track.display_title());
                Some(track)
            }
            Ok(None) => {
                tracing::info!("No catalog match for {:?}, using source title", query);
                None
            }
            Err(e) => {
                tracing::warn!(
                    "Catalog lookup for {:?} failed, using source title: {}",
                    query,
                    e
                );
                None
            }
        }
    }
}

/// Resolve `fut`, or fail with [`Error::Cancelled`] once `cancel` fires.
///
/// Dropping the stage future kills any child process it owns.
async fn until_cancelled<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = fut => result,
    }
}

async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!("Removed {:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Could not remove {:?}: {}", path, e),
    }
}
