//! Aggregator - fan-out/fan-in over the named catalog queries
//!
//! Every named query runs concurrently. Within a query, page 1 is fetched
//! first to learn the total page count, then the remaining pages (bounded by
//! `max_pages`) are fetched concurrently. Failures are captured as values:
//! a failing page contributes nothing, a failing optional query yields an
//! empty list, and only a failing mandatory query fails the whole cycle.

use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

use crate::api::{Catalog, CatalogError, CatalogResult};
use crate::models::{AggregationResult, CatalogPage, MovieSummary, NamedQuery, SourceKind};

/// Aggregation cycle failure. Only raised for mandatory queries.
#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Failed to load '{key}': {source}")]
    MandatoryFailed {
        key: String,
        #[source]
        source: CatalogError,
    },
}

impl AggregateError {
    /// Message shown in place of the list view
    pub fn user_message(&self) -> String {
        match self {
            AggregateError::MandatoryFailed { .. } => {
                "Failed to fetch movies. Please try again later.".to_string()
            }
        }
    }
}

/// Runs a fixed set of named queries against a catalog
#[derive(Debug)]
pub struct Aggregator<C> {
    catalog: Arc<C>,
    queries: Vec<NamedQuery>,
}

impl<C> Clone for Aggregator<C> {
    fn clone(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
            queries: self.queries.clone(),
        }
    }
}

impl<C: Catalog + Sync> Aggregator<C> {
    pub fn new(catalog: Arc<C>, queries: Vec<NamedQuery>) -> Self {
        Self { catalog, queries }
    }

    pub fn queries(&self) -> &[NamedQuery] {
        &self.queries
    }

    /// Run one aggregation cycle.
    ///
    /// Resolves only after every query has finished; the result is either
    /// complete or the single mandatory-query error.
    pub async fn run(&self) -> Result<AggregationResult, AggregateError> {
        tracing::debug!(queries = self.queries.len(), "Starting aggregation cycle");

        let outcomes = join_all(self.queries.iter().map(|q| self.run_query(q))).await;

        let mut result = AggregationResult::new();
        let mut mandatory_error = None;

        for (query, outcome) in self.queries.iter().zip(outcomes) {
            match outcome {
                Ok(movies) => result.insert(query.key.clone(), movies),
                Err(source) if query.mandatory => {
                    tracing::warn!(key = %query.key, error = %source, "Mandatory query failed");
                    if mandatory_error.is_none() {
                        mandatory_error = Some(AggregateError::MandatoryFailed {
                            key: query.key.clone(),
                            source,
                        });
                    }
                }
                Err(e) => {
                    tracing::warn!(key = %query.key, error = %e, "Optional query failed, using empty list");
                    result.insert(query.key.clone(), Vec::new());
                }
            }
        }

        if let Some(err) = mandatory_error {
            return Err(err);
        }

        tracing::debug!(
            lists = result.len(),
            movies = result.total_movies(),
            "Aggregation cycle complete"
        );
        Ok(result)
    }

    /// Run a single named query. Only a page-1 failure is reported.
    pub async fn run_query(&self, query: &NamedQuery) -> CatalogResult<Vec<MovieSummary>> {
        let first = self.fetch_page(query, 1).await?;

        let last_page = first.total_pages.min(query.max_pages.max(1));
        let rest = join_all((2..=last_page).map(|page| async move {
            match self.fetch_page(query, page).await {
                Ok(p) => p.results,
                Err(e) => {
                    tracing::debug!(key = %query.key, page, error = %e, "Page failed, skipping");
                    Vec::new()
                }
            }
        }))
        .await;

        let pages = std::iter::once(first.results).chain(rest);
        Ok(assemble(query, pages))
    }

    async fn fetch_page(&self, query: &NamedQuery, page: u32) -> CatalogResult<CatalogPage> {
        match query.source {
            SourceKind::Search => self.catalog.search(&query.query_text, page).await,
            SourceKind::Discover => self.catalog.discover(&query.query_text, page).await,
            SourceKind::Popular => self.catalog.popular(page).await,
        }
    }
}

/// Concatenate pages in order, apply the query's filters and drop repeated ids
/// (first occurrence wins).
pub fn assemble<I>(query: &NamedQuery, pages: I) -> Vec<MovieSummary>
where
    I: IntoIterator<Item = Vec<MovieSummary>>,
{
    let mut seen = HashSet::new();

    pages
        .into_iter()
        .flatten()
        .filter(|m| query.genre_filter.map_or(true, |g| m.has_genre(g)))
        .filter(|m| !query.requires_poster || m.has_poster())
        .filter(|m| seen.insert(m.id))
        .collect()
}
