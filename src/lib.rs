//! StreamVerse - terminal movie discovery
//!
//! Curated movie lists, debounced catalog search and one-keystroke playback
//! on an embed player, behind a shared-PIN session gate.
//!
//! # Modules
//!
//! - `models` - Movies, named queries, backends, playback
//! - `api` - Catalog trait and the TMDB client
//! - `aggregate` - Concurrent fan-out of named queries into home lists
//! - `list_view` - Reducer for the home list view
//! - `search` - Debounced, staleness-safe search pipeline
//! - `resolver` - Candidate to external identifier
//! - `session` - PIN gate with timed expiry
//! - `store` - Persisted key-value store and preferences
//! - `app` - Application state and navigation
//! - `cli` / `commands` - Scriptable command line

pub mod aggregate;
pub mod api;
pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod list_view;
pub mod models;
pub mod resolver;
pub mod search;
pub mod session;
pub mod store;
pub mod ui;

// Re-export commonly used types
pub use models::{
    AggregationResult, Backend, CatalogPage, MovieDetail, MovieSummary, NamedQuery, Playback,
    SourceKind,
};

pub use aggregate::{AggregateError, Aggregator};
pub use api::{Catalog, CatalogError, TmdbClient};
pub use app::{App, View};
pub use list_view::{reduce, ListAction, ListViewState};
pub use resolver::{resolve, ResolveError, Resolved};
pub use search::{SearchPipeline, SearchState};
pub use session::{GateState, SessionGate};
pub use store::{FileStore, MemoryStore, Store};
