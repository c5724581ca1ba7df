//! Data structures and types for StreamVerse
//!
//! Contains the shared models used across the application organized by domain:
//! - **Catalog**: movie summaries and details as returned by TMDB
//! - **Queries**: the named catalog queries that feed the home lists
//! - **Aggregation**: the assembled set of named movie lists
//! - **Playback**: embed backends and the active selection

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Base URL for poster images (w500 rendition)
pub const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

// =============================================================================
// Catalog Models (TMDB)
// =============================================================================

/// A movie as it appears in list and search results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieSummary {
    pub id: u64,
    pub title: String,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    #[serde(default)]
    pub genre_ids: BTreeSet<u32>,
}

impl MovieSummary {
    /// Release year taken from the ISO date (e.g. "2022-03-04" -> 2022)
    pub fn year(&self) -> Option<u16> {
        self.release_date.as_deref().and_then(extract_year)
    }

    /// Full poster image URL, if the movie has a poster
    pub fn poster_url(&self) -> Option<String> {
        self.poster_path
            .as_ref()
            .map(|p| format!("{}{}", POSTER_BASE_URL, p))
    }

    pub fn has_poster(&self) -> bool {
        self.poster_path.as_deref().is_some_and(|p| !p.is_empty())
    }

    pub fn has_genre(&self, genre: u32) -> bool {
        self.genre_ids.contains(&genre)
    }
}

impl fmt::Display for MovieSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.year() {
            Some(year) => write!(f, "{} ({})", self.title, year),
            None => write!(f, "{} (N/A)", self.title),
        }
    }
}

/// Detailed movie information, fetched once per selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieDetail {
    #[serde(flatten)]
    pub summary: MovieSummary,
    /// Backend-agnostic identifier (IMDb code) used to build playback URLs
    pub external_id: Option<String>,
}

impl fmt::Display for MovieDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.external_id {
            Some(id) => write!(f, "{} [{}]", self.summary, id),
            None => write!(f, "{} [no IMDb id]", self.summary),
        }
    }
}

/// One page of list results from the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogPage {
    pub results: Vec<MovieSummary>,
    pub total_pages: u32,
}

impl CatalogPage {
    pub fn empty() -> Self {
        Self::default()
    }
}

// =============================================================================
// Named Queries
// =============================================================================

/// Which catalog endpoint a named query runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Free-text search (`/search/movie`)
    Search,
    /// Filtered discovery (`/discover/movie`), query text is the filter spec
    Discover,
    /// Popular titles (`/movie/popular`)
    Popular,
}

/// Static definition of one home-screen list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedQuery {
    pub key: String,
    /// Heading shown above the list
    pub title: String,
    #[serde(default)]
    pub query_text: String,
    #[serde(default)]
    pub genre_filter: Option<u32>,
    #[serde(default)]
    pub requires_poster: bool,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    pub source: SourceKind,
    /// A failing mandatory query fails the whole aggregation cycle
    #[serde(default)]
    pub mandatory: bool,
}

fn default_max_pages() -> u32 {
    1
}

impl NamedQuery {
    pub fn search(key: &str, title: &str, query: &str) -> Self {
        Self::new(key, title, query, SourceKind::Search)
    }

    pub fn discover(key: &str, title: &str, filter_spec: &str) -> Self {
        Self::new(key, title, filter_spec, SourceKind::Discover)
    }

    pub fn popular(key: &str, title: &str) -> Self {
        Self::new(key, title, "", SourceKind::Popular)
    }

    fn new(key: &str, title: &str, query_text: &str, source: SourceKind) -> Self {
        Self {
            key: key.to_string(),
            title: title.to_string(),
            query_text: query_text.to_string(),
            genre_filter: None,
            requires_poster: false,
            max_pages: 1,
            source,
            mandatory: false,
        }
    }

    pub fn with_genre(mut self, genre: u32) -> Self {
        self.genre_filter = Some(genre);
        self
    }

    pub fn with_poster(mut self) -> Self {
        self.requires_poster = true;
        self
    }

    pub fn with_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn required(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// The curated lists shown on the home screen
    pub fn defaults() -> Vec<NamedQuery> {
        vec![
            NamedQuery::popular("popular", "Popular Right Now").required(),
            NamedQuery::discover(
                "romance",
                "Romance",
                "with_genres=10749&sort_by=popularity.desc",
            )
            .with_poster()
            .with_pages(3),
            NamedQuery::search("love", "Love Stories", "love")
                .with_genre(10749)
                .with_poster()
                .with_pages(3),
            NamedQuery::discover(
                "animation",
                "Animated Favorites",
                "with_genres=16&sort_by=vote_count.desc",
            )
            .with_poster()
            .with_pages(2),
            NamedQuery::search("christmas", "Holiday Movies", "christmas")
                .with_genre(10751)
                .with_poster()
                .with_pages(2),
        ]
    }
}

// =============================================================================
// Aggregation
// =============================================================================

/// Named movie lists in query declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregationResult {
    lists: Vec<(String, Vec<MovieSummary>)>,
}

impl AggregationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a list, keeping the original position of an existing key
    pub fn insert(&mut self, key: impl Into<String>, movies: Vec<MovieSummary>) {
        let key = key.into();
        match self.lists.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = movies,
            None => self.lists.push((key, movies)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&[MovieSummary]> {
        self.lists
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, movies)| movies.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.lists.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[MovieSummary])> {
        self.lists.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Total number of movies across all lists
    pub fn total_movies(&self) -> usize {
        self.lists.iter().map(|(_, v)| v.len()).sum()
    }
}

// =============================================================================
// Playback
// =============================================================================

/// Third-party embed backend used for playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Vidfast,
    Vidsrc,
    #[serde(rename = "2embed")]
    TwoEmbed,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Vidfast, Backend::Vidsrc, Backend::TwoEmbed];

    /// Build the embed URL for an external identifier
    pub fn embed_url(&self, external_id: &str) -> String {
        match self {
            Backend::Vidfast => format!("https://vidfast.pro/movie/{}", external_id),
            Backend::Vidsrc => format!("https://vidsrc.net/embed/movie?imdb={}", external_id),
            Backend::TwoEmbed => format!("https://www.2embed.cc/embed/{}", external_id),
        }
    }

    /// Persisted/CLI name
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Vidfast => "vidfast",
            Backend::Vidsrc => "vidsrc",
            Backend::TwoEmbed => "2embed",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Backend::Vidfast => "Vidfast",
            Backend::Vidsrc => "Vidsrc",
            Backend::TwoEmbed => "2Embed",
        }
    }

    /// Next backend in cycling order
    pub fn next(&self) -> Self {
        match self {
            Backend::Vidfast => Backend::Vidsrc,
            Backend::Vidsrc => Backend::TwoEmbed,
            Backend::TwoEmbed => Backend::Vidfast,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vidfast" => Ok(Backend::Vidfast),
            "vidsrc" => Ok(Backend::Vidsrc),
            "2embed" | "twoembed" => Ok(Backend::TwoEmbed),
            other => Err(format!("Unknown backend: {}", other)),
        }
    }
}

/// The title currently being played
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Playback {
    pub external_id: String,
    pub title: Option<String>,
    pub backend: Backend,
}

impl Playback {
    pub fn new(external_id: impl Into<String>, backend: Backend) -> Self {
        Self {
            external_id: external_id.into(),
            title: None,
            backend,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn url(&self) -> String {
        self.backend.embed_url(&self.external_id)
    }
}

/// Validate an IMDb-style identifier ("tt" followed by 7+ digits)
pub fn validate_external_id(id: &str) -> Result<&str, &'static str> {
    let digits = id.strip_prefix("tt").unwrap_or_default();
    if digits.len() >= 7 && digits.chars().all(|c| c.is_ascii_digit()) {
        Ok(id)
    } else {
        Err("Invalid IMDb ID format (expected tt followed by 7+ digits)")
    }
}

/// Extract year from a date string like "2022-03-04"
pub fn extract_year(date: &str) -> Option<u16> {
    date.get(..4).and_then(|y| y.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: u64, date: Option<&str>, poster: Option<&str>) -> MovieSummary {
        MovieSummary {
            id,
            title: format!("Movie {}", id),
            poster_path: poster.map(String::from),
            release_date: date.map(String::from),
            genre_ids: BTreeSet::new(),
        }
    }

    #[test]
    fn test_extract_year() {
        assert_eq!(extract_year("2022-03-04"), Some(2022));
        assert_eq!(extract_year("2019"), Some(2019));
        assert_eq!(extract_year(""), None);
        assert_eq!(extract_year("abc"), None);
    }

    #[test]
    fn test_summary_year_and_poster() {
        let m = movie(1, Some("2014-11-05"), Some("/abc.jpg"));
        assert_eq!(m.year(), Some(2014));
        assert_eq!(
            m.poster_url().as_deref(),
            Some("https://image.tmdb.org/t/p/w500/abc.jpg")
        );
        assert!(m.has_poster());
        assert_eq!(m.to_string(), "Movie 1 (2014)");

        let bare = movie(2, None, Some(""));
        assert!(!bare.has_poster());
        assert_eq!(bare.to_string(), "Movie 2 (N/A)");
    }

    #[test]
    fn test_backend_urls() {
        assert_eq!(
            Backend::Vidfast.embed_url("tt3504064"),
            "https://vidfast.pro/movie/tt3504064"
        );
        assert_eq!(
            Backend::Vidsrc.embed_url("tt3504064"),
            "https://vidsrc.net/embed/movie?imdb=tt3504064"
        );
        assert_eq!(
            Backend::TwoEmbed.embed_url("tt3504064"),
            "https://www.2embed.cc/embed/tt3504064"
        );
    }

    #[test]
    fn test_backend_parse_and_cycle() {
        for backend in Backend::ALL {
            assert_eq!(backend.as_str().parse::<Backend>(), Ok(backend));
        }
        assert!("netflix".parse::<Backend>().is_err());
        assert_eq!(Backend::default(), Backend::Vidfast);
        assert_eq!(Backend::TwoEmbed.next(), Backend::Vidfast);
    }

    #[test]
    fn test_validate_external_id() {
        assert!(validate_external_id("tt1877830").is_ok());
        assert!(validate_external_id("tt12345678").is_ok());
        assert!(validate_external_id("tt123456").is_err());
        assert!(validate_external_id("nm1234567").is_err());
        assert!(validate_external_id("1234567").is_err());
    }

    #[test]
    fn test_aggregation_result_keeps_order() {
        let mut result = AggregationResult::new();
        result.insert("popular", vec![movie(1, None, None)]);
        result.insert("romance", vec![]);
        result.insert("popular", vec![movie(2, None, None), movie(3, None, None)]);

        let keys: Vec<_> = result.keys().collect();
        assert_eq!(keys, vec!["popular", "romance"]);
        assert_eq!(result.get("popular").map(|m| m.len()), Some(2));
        assert_eq!(result.total_movies(), 2);
        assert!(result.get("missing").is_none());
    }

    #[test]
    fn test_default_queries_have_one_mandatory() {
        let queries = NamedQuery::defaults();
        assert_eq!(queries.iter().filter(|q| q.mandatory).count(), 1);
        assert_eq!(queries[0].key, "popular");
    }
}
