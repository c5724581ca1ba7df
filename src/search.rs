//! Incremental search pipeline
//!
//! Every keystroke restarts a debounce timer. When the timer fires the query
//! is sent to the catalog; the response is applied only if no newer keystroke
//! happened in the meantime. Staleness is tracked with a generation counter
//! captured when a request is issued and compared when it completes, so a
//! slow response for an old query can never overwrite a newer one.
//!
//! [`SearchState`] holds the pure state machine; [`SearchPipeline`] drives it
//! with tokio timers and spawned catalog requests.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::{Catalog, CatalogResult};
use crate::models::MovieSummary;

/// Quiet period after the last keystroke before a search is issued
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Candidates kept from a search response
pub const MAX_CANDIDATES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchPhase {
    #[default]
    Idle,
    Debouncing,
    Fetching,
}

/// A search request tagged with the generation it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub generation: u64,
    pub query: String,
}

// =============================================================================
// State Machine
// =============================================================================

/// Search box state
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub query: String,
    pub candidates: Vec<MovieSummary>,
    pub is_searching: bool,
    phase: SearchPhase,
    generation: u64,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Search mode replaces the list view while there is typed text
    pub fn is_active(&self) -> bool {
        !self.query.trim().is_empty()
    }

    /// New input text. Returns a ticket to debounce, or `None` if the input
    /// was cleared (candidates are dropped immediately, no request is made).
    pub fn input(&mut self, text: impl Into<String>) -> Option<SearchTicket> {
        self.query = text.into();
        self.generation = self.generation.wrapping_add(1);

        if self.query.trim().is_empty() {
            self.candidates.clear();
            self.is_searching = false;
            self.phase = SearchPhase::Idle;
            return None;
        }

        self.phase = SearchPhase::Debouncing;
        self.is_searching = false;
        Some(SearchTicket {
            generation: self.generation,
            query: self.query.trim().to_string(),
        })
    }

    /// Debounce timer fired. Returns the request to issue if the timer still
    /// belongs to the latest input.
    pub fn debounce_elapsed(&mut self, generation: u64) -> Option<SearchTicket> {
        if generation != self.generation || self.phase != SearchPhase::Debouncing {
            return None;
        }
        self.phase = SearchPhase::Fetching;
        self.is_searching = true;
        Some(SearchTicket {
            generation,
            query: self.query.trim().to_string(),
        })
    }

    /// A search response arrived. Returns true if it was applied.
    pub fn complete(
        &mut self,
        generation: u64,
        result: CatalogResult<Vec<MovieSummary>>,
    ) -> bool {
        if generation != self.generation || self.phase != SearchPhase::Fetching {
            tracing::debug!(
                generation,
                current = self.generation,
                "Dropping stale search response"
            );
            return false;
        }

        self.candidates = match result {
            Ok(results) => rank(results),
            Err(e) => {
                tracing::warn!(query = %self.query, error = %e, "Search failed");
                Vec::new()
            }
        };
        self.is_searching = false;
        self.phase = SearchPhase::Idle;
        true
    }

    /// Hide the candidate list but keep the typed text. Pending work for the
    /// current text is abandoned.
    pub fn dismiss(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.candidates.clear();
        self.is_searching = false;
        self.phase = SearchPhase::Idle;
    }

    /// Clear text and candidates
    pub fn reset(&mut self) {
        let _ = self.input(String::new());
    }
}

/// Keep catalog relevance order, drop repeated ids, cap the list
fn rank(results: Vec<MovieSummary>) -> Vec<MovieSummary> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|m| seen.insert(m.id))
        .take(MAX_CANDIDATES)
        .collect()
}

// =============================================================================
// Async Driver
// =============================================================================

/// Completion events produced by the pipeline's background tasks
#[derive(Debug)]
pub enum SearchEvent {
    DebounceElapsed(u64),
    Completed {
        generation: u64,
        result: CatalogResult<Vec<MovieSummary>>,
    },
}

/// Debounced search over a catalog
pub struct SearchPipeline<C> {
    catalog: Arc<C>,
    state: SearchState,
    debounce: Duration,
    timer: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<SearchEvent>,
    rx: mpsc::UnboundedReceiver<SearchEvent>,
}

impl<C> std::fmt::Debug for SearchPipeline<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchPipeline")
            .field("state", &self.state)
            .field("debounce", &self.debounce)
            .finish()
    }
}

impl<C: Catalog + Sync + 'static> SearchPipeline<C> {
    pub fn new(catalog: Arc<C>, debounce: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            catalog,
            state: SearchState::new(),
            debounce,
            timer: None,
            tx,
            rx,
        }
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    /// Feed the full current input text
    pub fn input(&mut self, text: impl Into<String>) {
        self.cancel_timer();

        let Some(ticket) = self.state.input(text) else {
            return;
        };

        let tx = self.tx.clone();
        let debounce = self.debounce;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let _ = tx.send(SearchEvent::DebounceElapsed(ticket.generation));
        }));
    }

    pub fn dismiss(&mut self) {
        self.cancel_timer();
        self.state.dismiss();
    }

    pub fn reset(&mut self) {
        self.cancel_timer();
        self.state.reset();
    }

    /// Wait for the next background event (test and headless use)
    pub async fn next_event(&mut self) -> Option<SearchEvent> {
        self.rx.recv().await
    }

    /// Apply every event that is already available. Returns true if the
    /// visible state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.rx.try_recv() {
            changed |= self.handle(event);
        }
        changed
    }

    /// Apply one event. Returns true if the visible state changed.
    pub fn handle(&mut self, event: SearchEvent) -> bool {
        match event {
            SearchEvent::DebounceElapsed(generation) => {
                let Some(ticket) = self.state.debounce_elapsed(generation) else {
                    return false;
                };
                self.timer = None;
                self.spawn_fetch(ticket);
                true
            }
            SearchEvent::Completed { generation, result } => {
                self.state.complete(generation, result)
            }
        }
    }

    /// In-flight requests are never aborted; their results are dropped on
    /// arrival if stale.
    fn spawn_fetch(&self, ticket: SearchTicket) {
        let catalog = Arc::clone(&self.catalog);
        let tx = self.tx.clone();
        tracing::debug!(query = %ticket.query, generation = ticket.generation, "Issuing search");

        tokio::spawn(async move {
            let result = catalog.search(&ticket.query, 1).await.map(|p| p.results);
            let _ = tx.send(SearchEvent::Completed {
                generation: ticket.generation,
                result,
            });
        });
    }

    fn cancel_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
    }
}

impl<C> Drop for SearchPipeline<C> {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
    }
}
