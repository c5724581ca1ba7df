//! API clients for external services
//!
//! - Catalog: the trait the discovery engine is written against
//! - TMDB: the HTTP implementation of the catalog

pub mod catalog;
pub mod tmdb;

pub use catalog::{Catalog, CatalogError, CatalogResult, LocalCatalog};
pub use tmdb::TmdbClient;
