//! Trait definition for the catalog client.
//!
//! The pipeline depends on [`CatalogApi`] rather than a concrete client so
//! tests can substitute [`mocks::MockCatalog`].

use async_trait::async_trait;

use super::domain::{CatalogError, CatalogTrack, CoverImage, CoverRef};

/// Track metadata and cover art lookup.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Best match for a free-text title, or `None` if nothing matched.
    async fn search(&self, title: &str) -> Result<Option<CatalogTrack>, CatalogError>;

    /// Download the image behind a cover reference.
    async fn cover_image(&self, cover: &CoverRef) -> Result<CoverImage, CatalogError>;
}

#[async_trait]
impl CatalogApi for super::deezer::DeezerClient {
    async fn search(&self, title: &str) -> Result<Option<CatalogTrack>, CatalogError> {
        self.search(title).await
    }

    async fn cover_image(&self, cover: &CoverRef) -> Result<CoverImage, CatalogError> {
        self.cover_image(cover).await
    }
}
