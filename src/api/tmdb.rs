//! TMDB (The Movie Database) API client
//!
//! Implements the catalog over TMDB v3: movie search, discovery,
//! popular titles and movie details.
//! API docs: https://developer.themoviedb.org/docs

use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

use super::catalog::{Catalog, CatalogError, CatalogResult};
use crate::models::{CatalogPage, MovieDetail, MovieSummary};

const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// TMDB API client
#[derive(Debug, Clone)]
pub struct TmdbClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
    max_retries: u32,
}

impl TmdbClient {
    /// Create a new TMDB client with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing)
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            client: build_http_client(DEFAULT_TIMEOUT),
            timeout: DEFAULT_TIMEOUT,
            max_retries: 3,
        }
    }

    /// Replace the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_http_client(timeout);
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Make an authenticated GET request with retry logic for rate limits.
    ///
    /// `params` must already be URL-encoded; the API key is appended here.
    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> CatalogResult<T> {
        let mut url = format!(
            "{}{}?api_key={}",
            self.base_url,
            endpoint,
            urlencoding::encode(&self.api_key)
        );
        for (key, value) in params {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(value);
        }

        let mut retries = 0;

        loop {
            let response = self
                .client
                .get(&url)
                .timeout(self.timeout)
                .header("Accept", "application/json")
                .send()
                .await?;

            match response.status() {
                StatusCode::OK => {
                    let body = response.text().await?;
                    let parsed: T = serde_json::from_str(&body).map_err(|e| {
                        CatalogError::InvalidResponse(format!("JSON parse error: {}", e))
                    })?;
                    return Ok(parsed);
                }
                StatusCode::NOT_FOUND => {
                    return Err(CatalogError::NotFound);
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    retries += 1;
                    if retries >= self.max_retries {
                        return Err(CatalogError::RateLimited);
                    }

                    // Get Retry-After header or default to exponential backoff
                    let wait_secs = response
                        .headers()
                        .get("Retry-After")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(2u64.pow(retries));

                    tracing::debug!(endpoint, wait_secs, "TMDB rate limited, backing off");
                    tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                    continue;
                }
                status => {
                    return Err(CatalogError::ServerError(status.as_u16()));
                }
            }
        }
    }

    async fn list(
        &self,
        endpoint: &str,
        mut params: Vec<(String, String)>,
        page: u32,
    ) -> CatalogResult<CatalogPage> {
        params.push(("page".to_string(), page.to_string()));
        let response: ListResponse = self.get(endpoint, &params).await?;
        Ok(response.into_page())
    }
}

impl Catalog for TmdbClient {
    async fn search(&self, query: &str, page: u32) -> CatalogResult<CatalogPage> {
        let params = vec![("query".to_string(), urlencoding::encode(query).into_owned())];
        self.list("/search/movie", params, page).await
    }

    async fn discover(&self, filter_spec: &str, page: u32) -> CatalogResult<CatalogPage> {
        self.list("/discover/movie", parse_filter_spec(filter_spec), page)
            .await
    }

    async fn popular(&self, page: u32) -> CatalogResult<CatalogPage> {
        self.list("/movie/popular", Vec::new(), page).await
    }

    async fn detail(&self, id: u64) -> CatalogResult<MovieDetail> {
        let endpoint = format!("/movie/{}", id);
        let response: MovieResponse = self.get(&endpoint, &[]).await?;
        Ok(response.into_detail())
    }
}

/// Requests also carry the timeout individually, so the plain fallback
/// client still enforces it.
fn build_http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

/// Split a discover filter spec (`with_genres=16&sort_by=popularity.desc`)
/// into encoded query pairs. `page` and `api_key` are owned by the client
/// and dropped if present.
fn parse_filter_spec(spec: &str) -> Vec<(String, String)> {
    spec.split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = key.trim();
            if key.is_empty() || key == "page" || key == "api_key" {
                return None;
            }
            Some((
                urlencoding::encode(key).into_owned(),
                urlencoding::encode(value.trim()).into_owned(),
            ))
        })
        .collect()
}

// =============================================================================
// Response Structures (internal deserialization)
// =============================================================================

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    results: Vec<MovieRaw>,
    #[serde(default)]
    total_pages: u32,
}

impl ListResponse {
    fn into_page(self) -> CatalogPage {
        CatalogPage {
            results: self.results.into_iter().map(MovieRaw::into_summary).collect(),
            total_pages: self.total_pages,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MovieRaw {
    id: u64,
    title: Option<String>,
    poster_path: Option<String>,
    release_date: Option<String>,
    #[serde(default)]
    genre_ids: Vec<u32>,
}

impl MovieRaw {
    fn into_summary(self) -> MovieSummary {
        MovieSummary {
            id: self.id,
            title: self.title.unwrap_or_default(),
            poster_path: non_empty(self.poster_path),
            release_date: non_empty(self.release_date),
            genre_ids: self.genre_ids.into_iter().collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MovieResponse {
    id: u64,
    imdb_id: Option<String>,
    title: Option<String>,
    release_date: Option<String>,
    poster_path: Option<String>,
    #[serde(default)]
    genres: Vec<GenreRaw>,
}

impl MovieResponse {
    fn into_detail(self) -> MovieDetail {
        MovieDetail {
            summary: MovieSummary {
                id: self.id,
                title: self.title.unwrap_or_default(),
                poster_path: non_empty(self.poster_path),
                release_date: non_empty(self.release_date),
                genre_ids: self.genres.into_iter().map(|g| g.id).collect(),
            },
            external_id: non_empty(self.imdb_id),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenreRaw {
    id: u32,
}

/// TMDB sends "" for missing dates and ids
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
