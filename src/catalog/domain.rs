//! Internal domain models for catalog lookups.
//!
//! These types are OUR types - they don't change when the catalog API changes.
//! All API responses get converted into these types via the adapter.

use std::fmt;

/// Best-match track metadata returned by a catalog search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTrack {
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Where to fetch the album cover from (absent for a few catalog entries)
    pub cover: Option<CoverRef>,
}

impl CatalogTrack {
    /// Display title used for the output filename: `"<artist> - <title>"`.
    pub fn display_title(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }
}

/// Opaque reference to a cover image. For Deezer this is an image URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CoverRef(String);

impl CoverRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CoverRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Downloaded cover image
#[derive(Debug, Clone)]
pub struct CoverImage {
    /// Image data (JPEG or PNG)
    pub data: Vec<u8>,
    /// MIME type reported by the server (the tag writer re-sniffs the bytes)
    pub mime_type: String,
    /// Source URL
    pub url: String,
}

/// Errors that can occur during a catalog lookup
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    #[error("API request failed: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Rate limited - try again later")]
    RateLimited,

    #[error("Empty or invalid image from {0}")]
    InvalidImage(String),
}
