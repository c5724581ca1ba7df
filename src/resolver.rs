//! Selection resolver - candidate to playable identifier
//!
//! Fetches the full detail for a chosen movie and extracts its external
//! (IMDb) identifier. Failures are reported so the caller can show a
//! non-fatal notice and leave its state untouched.

use thiserror::Error;

use crate::api::{Catalog, CatalogError};
use crate::models::MovieSummary;

#[derive(Error, Debug)]
pub enum ResolveError {
    /// Detail loaded but carries no external identifier
    #[error("No IMDb ID found for '{title}'")]
    NotFound { title: String },

    /// Detail could not be loaded
    #[error("Could not load details for '{title}': {source}")]
    Transient {
        title: String,
        #[source]
        source: CatalogError,
    },
}

impl ResolveError {
    /// Short notice for the status line
    pub fn notice(&self) -> String {
        match self {
            ResolveError::NotFound { title } => {
                format!("Sorry, '{}' isn't available to play.", title)
            }
            ResolveError::Transient { .. } => {
                "Couldn't load movie details. Please try again.".to_string()
            }
        }
    }
}

/// A candidate resolved to something playable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub external_id: String,
    pub title: String,
}

/// Resolve a candidate to its external identifier
pub async fn resolve<C: Catalog>(
    catalog: &C,
    candidate: &MovieSummary,
) -> Result<Resolved, ResolveError> {
    lookup(catalog, candidate.id, &candidate.title).await
}

/// Resolve a bare catalog id; the title comes from the detail response
pub async fn resolve_id<C: Catalog>(catalog: &C, id: u64) -> Result<Resolved, ResolveError> {
    lookup(catalog, id, &format!("#{}", id)).await
}

async fn lookup<C: Catalog>(catalog: &C, id: u64, title: &str) -> Result<Resolved, ResolveError> {
    let detail = match catalog.detail(id).await {
        Ok(detail) => detail,
        // The catalog itself says the movie does not exist
        Err(e) if e.is_not_found() => {
            return Err(ResolveError::NotFound {
                title: title.to_string(),
            });
        }
        Err(source) => {
            tracing::warn!(id, error = %source, "Detail lookup failed");
            return Err(ResolveError::Transient {
                title: title.to_string(),
                source,
            });
        }
    };

    let title = if detail.summary.title.is_empty() {
        title.to_string()
    } else {
        detail.summary.title
    };

    match detail.external_id {
        Some(external_id) => Ok(Resolved { external_id, title }),
        None => {
            tracing::info!(id, "Movie has no external id");
            Err(ResolveError::NotFound { title })
        }
    }
}
