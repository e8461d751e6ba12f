//! Application-wide error types.
//!
//! Library modules return [`Result`] built on `thiserror`, while the CLI uses
//! `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`Error`]: one variant per pipeline failure kind, plus I/O
//! - [`CatalogError`](crate::catalog::CatalogError) for catalog lookups, which
//!   the pipeline downgrades instead of surfacing
//!
//! # Example
//!
//! ```ignore
//! use grabtune::error::{Error, Result};
//!
//! fn transcode(input: &Path) -> Result<()> {
//!     let bytes = std::fs::read(input)?; // IO errors auto-convert
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source URL could not be resolved to a downloadable audio stream
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// Streaming the audio to the temp file failed
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    /// The encoder could not be run or exited unsuccessfully
    #[error("Conversion failed: {0}")]
    ConvertFailed(String),

    /// The catalog cover image could not be fetched
    #[error("Cover fetch failed: {0}")]
    CoverFetchFailed(String),

    /// Writing tags to the finished MP3 failed
    #[error("Tag write failed for {path}: {message}")]
    TagWriteFailed { path: PathBuf, message: String },

    /// The request was cancelled before it finished
    #[error("Cancelled")]
    Cancelled,

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Self::SourceUnavailable(message.into())
    }

    pub fn download(message: impl Into<String>) -> Self {
        Self::DownloadFailed(message.into())
    }

    pub fn convert(message: impl Into<String>) -> Self {
        Self::ConvertFailed(message.into())
    }

    pub fn cover_fetch(message: impl Into<String>) -> Self {
        Self::CoverFetchFailed(message.into())
    }

    /// Create a tag write error.
    pub fn tag_write(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::TagWriteFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }

    /// The underlying error, looking through any context wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Short status label for the UI layer, e.g. `"ConvertFailed"`.
    pub fn kind(&self) -> &'static str {
        match self.root() {
            Self::SourceUnavailable(_) => "SourceUnavailable",
            Self::DownloadFailed(_) => "DownloadFailed",
            Self::ConvertFailed(_) => "ConvertFailed",
            Self::CoverFetchFailed(_) => "CoverFetchFailed",
            Self::TagWriteFailed { .. } => "TagWriteFailed",
            Self::Cancelled => "Cancelled",
            Self::Io(_) => "Io",
            Self::WithContext { .. } => unreachable!("root() strips context"),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}
