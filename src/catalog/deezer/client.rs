//! Deezer HTTP client
//!
//! Handles communication with the Deezer public API.
//! See: https://developers.deezer.com/api
//!
//! Deezer allows 50 requests / 5 seconds per client and answers over-quota
//! requests with HTTP 200 and `error.code == 4`.

use std::time::Duration;

use super::{adapter, dto};
use crate::catalog::domain::{CatalogError, CatalogTrack, CoverImage, CoverRef};
use crate::config::CatalogConfig;

/// Public API root
pub const DEFAULT_BASE_URL: &str = "https://api.deezer.com";

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Deezer API client
pub struct DeezerClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl DeezerClient {
    /// Create a new client against the public API
    pub fn new() -> Self {
        Self::with_config(&CatalogConfig::default())
    }

    /// Create a client from the `[catalog]` config section
    pub fn with_config(config: &CatalogConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .gzip(true)
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Deezer client setup failed, using defaults: {}", e);
                reqwest::Client::default()
            });

        Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a client with a custom base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self::with_config(&CatalogConfig {
            base_url: base_url.into(),
            ..Default::default()
        })
    }

    /// Search for a track by free-text title and return the best match
    pub async fn search(&self, query: &str) -> Result<Option<CatalogTrack>, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(None);
        }

        let response = self.send_search_request(query).await?;
        adapter::to_catalog_track(response)
    }

    /// Build the search URL. `limit=1` since only the top hit is used.
    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/search?q={}&limit=1",
            self.base_url,
            urlencoding::encode(query)
        )
    }

    async fn send_search_request(&self, query: &str) -> Result<dto::SearchResponse, CatalogError> {
        let url = self.search_url(query);
        tracing::debug!("Deezer search: {}", url);

        let response = self
            .http_client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CatalogError::RateLimited);
        }

        if !status.is_success() {
            return Err(CatalogError::Network(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .json::<dto::SearchResponse>()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))
    }

    /// Download the cover image a search result points at
    pub async fn cover_image(&self, cover: &CoverRef) -> Result<CoverImage, CatalogError> {
        let url = cover.as_str();

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::InvalidImage(format!("{} (not found)", url)));
        }

        if !status.is_success() {
            return Err(CatalogError::Network(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();

        let data = response
            .bytes()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?
            .to_vec();

        if data.is_empty() {
            return Err(CatalogError::InvalidImage(url.to_string()));
        }

        Ok(CoverImage {
            data,
            mime_type,
            url: url.to_string(),
        })
    }
}

impl Default for DeezerClient {
    fn default() -> Self {
        Self::new()
    }
}
