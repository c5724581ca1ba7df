//! Shared fixtures for integration tests
//!
//! `FakeCatalog` answers from canned pages keyed by source and page number,
//! with optional per-query latency for the search tests.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use streamverse::api::{Catalog, CatalogError, CatalogResult};
use streamverse::models::{CatalogPage, MovieDetail, MovieSummary};

/// Canned failure (CatalogError is not Clone)
#[derive(Debug, Clone, Copy)]
pub enum Fail {
    NotFound,
    Server(u16),
}

impl Fail {
    fn into_error(self) -> CatalogError {
        match self {
            Fail::NotFound => CatalogError::NotFound,
            Fail::Server(code) => CatalogError::ServerError(code),
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeCatalog {
    pages: HashMap<String, Result<CatalogPage, Fail>>,
    details: HashMap<u64, Result<MovieDetail, Fail>>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<String>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search_key(query: &str, page: u32) -> String {
        format!("search:{}:{}", query, page)
    }

    pub fn discover_key(spec: &str, page: u32) -> String {
        format!("discover:{}:{}", spec, page)
    }

    pub fn popular_key(page: u32) -> String {
        format!("popular:{}", page)
    }

    pub fn page(mut self, key: String, results: Vec<MovieSummary>, total_pages: u32) -> Self {
        self.pages.insert(
            key,
            Ok(CatalogPage {
                results,
                total_pages,
            }),
        );
        self
    }

    pub fn failing(mut self, key: String, fail: Fail) -> Self {
        self.pages.insert(key, Err(fail));
        self
    }

    /// Delay every response for `query` (search only)
    pub fn delay(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    pub fn detail(mut self, id: u64, title: &str, external_id: Option<&str>) -> Self {
        self.details.insert(
            id,
            Ok(MovieDetail {
                summary: movie(id, title),
                external_id: external_id.map(String::from),
            }),
        );
        self
    }

    pub fn failing_detail(mut self, id: u64, fail: Fail) -> Self {
        self.details.insert(id, Err(fail));
        self
    }

    /// Every request made so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, key: String) -> CatalogResult<CatalogPage> {
        self.calls.lock().unwrap().push(key.clone());
        match self.pages.get(&key) {
            Some(Ok(page)) => Ok(page.clone()),
            Some(Err(fail)) => Err(fail.into_error()),
            None => Ok(CatalogPage::empty()),
        }
    }
}

impl Catalog for FakeCatalog {
    async fn search(&self, query: &str, page: u32) -> CatalogResult<CatalogPage> {
        if let Some(delay) = self.delays.get(query) {
            tokio::time::sleep(*delay).await;
        }
        self.answer(Self::search_key(query, page))
    }

    async fn discover(&self, filter_spec: &str, page: u32) -> CatalogResult<CatalogPage> {
        self.answer(Self::discover_key(filter_spec, page))
    }

    async fn popular(&self, page: u32) -> CatalogResult<CatalogPage> {
        self.answer(Self::popular_key(page))
    }

    async fn detail(&self, id: u64) -> CatalogResult<MovieDetail> {
        self.calls.lock().unwrap().push(format!("detail:{}", id));
        match self.details.get(&id) {
            Some(Ok(detail)) => Ok(detail.clone()),
            Some(Err(fail)) => Err(fail.into_error()),
            None => Err(CatalogError::NotFound),
        }
    }
}

// =============================================================================
// Movie Fixtures
// =============================================================================

pub fn movie(id: u64, title: &str) -> MovieSummary {
    MovieSummary {
        id,
        title: title.to_string(),
        poster_path: Some(format!("/{}.jpg", id)),
        release_date: Some("2001-04-25".to_string()),
        genre_ids: BTreeSet::new(),
    }
}

pub fn with_genres(mut movie: MovieSummary, genres: &[u32]) -> MovieSummary {
    movie.genre_ids = genres.iter().copied().collect();
    movie
}

pub fn without_poster(mut movie: MovieSummary) -> MovieSummary {
    movie.poster_path = None;
    movie
}

/// Numbered movies `from..to` sharing the given genres
pub fn range(from: u64, to: u64, genres: &[u32]) -> Vec<MovieSummary> {
    (from..to)
        .map(|id| with_genres(movie(id, &format!("Movie {}", id)), genres))
        .collect()
}
