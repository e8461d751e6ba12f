//! Music catalog lookups - finds track metadata and cover art by free-text title.
//!
//! # Architecture
//!
//! Same layering as any external API integration in this crate:
//! - **Domain models** (`domain.rs`) - our types, stable across API changes
//! - **API DTOs** (`deezer/dto.rs`) - exact response shapes
//! - **Adapter** (`deezer/adapter.rs`) - the only DTO → domain conversion
//! - **Client** (`deezer/client.rs`) - HTTP
//! - **Traits** (`traits.rs`) - the seam the pipeline depends on, with mocks
//!
//! A lookup that finds nothing is `Ok(None)`, not an error. The pipeline
//! treats both a miss and a failed lookup as "no metadata" and carries on.

pub mod deezer;
pub mod domain;
pub mod traits;

pub use deezer::DeezerClient;
pub use domain::{CatalogError, CatalogTrack, CoverImage, CoverRef};
pub use traits::CatalogApi;
