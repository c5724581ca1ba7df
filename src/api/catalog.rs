//! Catalog abstraction
//!
//! The discovery engine talks to the movie catalog only through this trait
//! so fakes can stand in for TMDB in tests.

use thiserror::Error;

use crate::models::{CatalogPage, MovieDetail};

/// Catalog error types
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Resource not found (404)")]
    NotFound,

    #[error("Rate limited (429), retries exhausted")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(u16),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
}

impl CatalogError {
    /// Whether the catalog positively reported the resource as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound)
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Remote movie catalog.
///
/// `trait_variant` generates the `Send` variant [`Catalog`] used throughout
/// the crate so catalog futures can be spawned on the runtime.
#[trait_variant::make(Catalog: Send)]
pub trait LocalCatalog {
    /// Free-text movie search
    async fn search(&self, query: &str, page: u32) -> CatalogResult<CatalogPage>;

    /// Filtered discovery; `filter_spec` is a `key=value&key=value` list
    async fn discover(&self, filter_spec: &str, page: u32) -> CatalogResult<CatalogPage>;

    /// Currently popular movies
    async fn popular(&self, page: u32) -> CatalogResult<CatalogPage>;

    /// Full detail for one movie, including its external identifier
    async fn detail(&self, id: u64) -> CatalogResult<MovieDetail>;
}
