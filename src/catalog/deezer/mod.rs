//! Deezer public API integration
//!
//! Track search and album cover download. No API key required.
//!
//! API docs: https://developers.deezer.com/api

pub mod dto;
mod adapter;
mod client;

pub use adapter::to_catalog_track;
pub use client::{DEFAULT_BASE_URL, DeezerClient};
