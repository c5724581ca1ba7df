//! App state and core application logic
//!
//! Coordinates the session gate, the home lists, the search pipeline and
//! playback selection, and maps keyboard input onto them. Background work
//! (aggregation cycles, detail lookups) runs on spawned tasks that report
//! back through a channel; every report carries the id it was issued with so
//! superseded work is dropped on arrival.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::aggregate::{AggregateError, Aggregator};
use crate::api::Catalog;
use crate::config::Config;
use crate::list_view::{reduce, ListAction, ListViewState};
use crate::models::{validate_external_id, AggregationResult, Backend, MovieSummary, Playback};
use crate::resolver::{self, ResolveError, Resolved};
use crate::search::SearchPipeline;
use crate::session::{now_millis, SessionGate};
use crate::store::{Preferences, Store};

/// Pause between the sixth PIN character and the automatic check
pub const PIN_AUTO_SUBMIT_DELAY: Duration = Duration::from_millis(200);

// =============================================================================
// Views
// =============================================================================

/// Screen currently shown, derived from the app state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// PIN entry
    Locked,
    /// Curated lists
    Home,
    /// Live search results
    Search,
    /// Playback selection active
    Playing,
}

/// Current input mode for keyboard handling
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InputMode {
    /// Normal navigation mode
    #[default]
    Normal,
    /// Text input mode (search box focused)
    Editing,
}

// =============================================================================
// Selection State (per-view)
// =============================================================================

/// Selection state for list views
#[derive(Debug, Clone, Default)]
pub struct ListState {
    /// Currently selected index
    pub selected: usize,
    /// Total number of items
    pub len: usize,
}

impl ListState {
    pub fn new(len: usize) -> Self {
        Self { selected: 0, len }
    }

    /// Move selection up
    pub fn up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Move selection down
    pub fn down(&mut self) {
        if self.len > 0 && self.selected < self.len - 1 {
            self.selected += 1;
        }
    }

    /// Reset selection
    pub fn reset(&mut self) {
        self.selected = 0;
    }

    /// Update length (e.g., when new results come in)
    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        // Clamp selected to valid range
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }
}

/// Cursor over the home lists: which list, and which movie inside it
#[derive(Debug, Clone, Default)]
pub struct HomeCursor {
    pub row: ListState,
    pub col: ListState,
}

// =============================================================================
// Background Events
// =============================================================================

/// Aggregation cycle bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cycle {
    /// A cycle should run as soon as the gate and selection allow it
    Pending,
    InFlight(u64),
    /// This eligibility window already had its cycle
    Settled,
}

/// Results reported by spawned background tasks
#[derive(Debug)]
pub enum AppEvent {
    ListsLoaded {
        cycle: u64,
        result: Result<AggregationResult, AggregateError>,
    },
    Resolved {
        request: u64,
        result: Result<Resolved, ResolveError>,
    },
}

// =============================================================================
// Main Application State
// =============================================================================

/// Main application state
pub struct App<C> {
    /// Whether the app is running
    pub running: bool,
    /// Current input mode
    pub input_mode: InputMode,
    pub cursor: HomeCursor,
    pub candidate_list: ListState,

    catalog: Arc<C>,
    aggregator: Aggregator<C>,
    store: Box<dyn Store>,
    prefs: Preferences,
    gate: SessionGate,
    lists: ListViewState,
    search: SearchPipeline<C>,
    playback: Option<Playback>,
    backend: Backend,
    notices: Vec<String>,
    pending_open: Option<String>,
    pin_due: Option<Instant>,

    cycle: Cycle,
    cycle_seq: u64,
    resolve_seq: u64,
    resolving: Option<u64>,
    tx: mpsc::UnboundedSender<AppEvent>,
    rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl<C> std::fmt::Debug for App<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("running", &self.running)
            .field("gate", &self.gate.state())
            .field("lists", &self.lists)
            .field("playback", &self.playback)
            .field("cycle", &self.cycle)
            .finish()
    }
}

impl<C: Catalog + Sync + 'static> App<C> {
    /// Build the app from persisted state. A remembered selection resumes
    /// playback, which keeps the home lists from loading.
    pub fn new(catalog: Arc<C>, mut store: Box<dyn Store>, config: &Config) -> Self {
        let prefs = Preferences::new(config.history_enabled());
        let gate = SessionGate::load(store.as_mut(), config.pin(), now_millis())
            .with_hint(config.pin_hint());
        let backend = prefs
            .backend(store.as_ref())
            .unwrap_or_else(|| config.default_backend());
        let playback = prefs
            .last_played(store.as_ref())
            .map(|id| Playback::new(id, backend));

        let (tx, rx) = mpsc::unbounded_channel();

        let mut app = Self {
            running: true,
            input_mode: InputMode::Normal,
            cursor: HomeCursor::default(),
            candidate_list: ListState::default(),

            aggregator: Aggregator::new(Arc::clone(&catalog), config.queries()),
            search: SearchPipeline::new(Arc::clone(&catalog), config.debounce()),
            catalog,
            store,
            prefs,
            gate,
            lists: ListViewState::new(),
            playback,
            backend,
            notices: Vec::new(),
            pending_open: None,
            pin_due: None,

            cycle: Cycle::Pending,
            cycle_seq: 0,
            resolve_seq: 0,
            resolving: None,
            tx,
            rx,
        };
        app.sync_lists();
        app
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn view(&self) -> View {
        if !self.gate.is_unlocked() {
            View::Locked
        } else if self.playback.is_some() {
            View::Playing
        } else if self.search.state().is_active() {
            View::Search
        } else {
            View::Home
        }
    }

    pub fn gate(&self) -> &SessionGate {
        &self.gate
    }

    pub fn lists(&self) -> &ListViewState {
        &self.lists
    }

    pub fn search(&self) -> &crate::search::SearchState {
        self.search.state()
    }

    pub fn playback(&self) -> Option<&Playback> {
        self.playback.as_ref()
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn queries(&self) -> &[crate::models::NamedQuery] {
        self.aggregator.queries()
    }

    pub fn is_resolving(&self) -> bool {
        self.resolving.is_some()
    }

    /// Every non-fatal notice raised so far, oldest first
    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    /// Most recent notice, if not yet dismissed
    pub fn notice(&self) -> Option<&str> {
        self.notices.last().map(String::as_str)
    }

    pub fn dismiss_notice(&mut self) {
        self.notices.clear();
    }

    /// URL the front end should open in the browser, if any
    pub fn take_open_request(&mut self) -> Option<String> {
        self.pending_open.take()
    }

    /// Quit the application
    pub fn quit(&mut self) {
        self.running = false;
    }

    fn notify(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        tracing::info!(notice = %msg, "Notice");
        self.notices.push(msg);
    }

    // -------------------------------------------------------------------------
    // Home Lists
    // -------------------------------------------------------------------------

    /// Start or abort the aggregation cycle to match the gate and selection.
    ///
    /// Runs exactly one cycle each time the app becomes eligible (unlocked
    /// with no active selection). Losing eligibility aborts the cycle and
    /// arms the next one.
    pub fn sync_lists(&mut self) {
        let eligible = self.gate.is_unlocked() && self.playback.is_none();

        if !eligible {
            if matches!(self.cycle, Cycle::InFlight(_)) || self.lists.is_loading {
                self.dispatch(ListAction::AbortFetch);
            }
            self.cycle = Cycle::Pending;
            return;
        }

        if self.cycle == Cycle::Pending {
            self.cycle_seq += 1;
            let cycle = self.cycle_seq;
            self.cycle = Cycle::InFlight(cycle);
            self.dispatch(ListAction::FetchStart);

            let aggregator = self.aggregator.clone();
            let tx = self.tx.clone();
            tracing::debug!(cycle, "Spawning aggregation cycle");
            tokio::spawn(async move {
                let result = aggregator.run().await;
                let _ = tx.send(AppEvent::ListsLoaded { cycle, result });
            });
        }
    }

    fn dispatch(&mut self, action: ListAction) {
        let state = std::mem::take(&mut self.lists);
        self.lists = reduce(state, action);
    }

    fn finish_cycle(&mut self, cycle: u64, result: Result<AggregationResult, AggregateError>) {
        if self.cycle != Cycle::InFlight(cycle) {
            tracing::debug!(cycle, "Dropping superseded aggregation result");
            return;
        }
        self.cycle = Cycle::Settled;

        match result {
            Ok(lists) => {
                self.cursor = HomeCursor::default();
                self.cursor
                    .row
                    .set_len(lists.iter().filter(|(_, movies)| !movies.is_empty()).count());
                self.dispatch(ListAction::FetchSuccess(lists));
                self.sync_cursor();
            }
            Err(e) => {
                tracing::error!(error = %e, "Aggregation failed");
                self.dispatch(ListAction::FetchError(e.user_message()));
            }
        }
    }

    pub fn toggle_expand(&mut self) {
        if let Some(key) = self.current_list_key() {
            self.dispatch(ListAction::ToggleExpand(key));
            self.sync_cursor();
        }
    }

    /// Key of the list under the cursor; empty lists are skipped
    fn current_list_key(&self) -> Option<String> {
        self.lists
            .lists
            .iter()
            .filter(|(_, movies)| !movies.is_empty())
            .nth(self.cursor.row.selected)
            .map(|(key, _)| key.to_string())
    }

    fn sync_cursor(&mut self) {
        let len = self
            .current_list_key()
            .map_or(0, |key| self.lists.visible(&key).len());
        self.cursor.col.set_len(len);
    }

    /// Movie under the home cursor
    pub fn current_movie(&self) -> Option<&MovieSummary> {
        let key = self.current_list_key()?;
        self.lists
            .lists
            .get(&key)?
            .get(self.cursor.col.selected)
    }

    // -------------------------------------------------------------------------
    // Search
    // -------------------------------------------------------------------------

    /// Replace the search text (every keystroke)
    pub fn set_query(&mut self, text: impl Into<String>) {
        if !self.gate.is_unlocked() {
            return;
        }
        self.search.input(text);
        self.candidate_list.set_len(self.search.state().candidates.len());
    }

    fn push_query_char(&mut self, c: char) {
        let mut query = self.search.state().query.clone();
        query.push(c);
        self.set_query(query);
    }

    fn pop_query_char(&mut self) {
        let mut query = self.search.state().query.clone();
        query.pop();
        self.set_query(query);
    }

    /// Click/focus outside the search box: hide candidates, keep the text
    pub fn dismiss_search(&mut self) {
        self.search.dismiss();
        self.candidate_list.set_len(0);
    }

    pub fn clear_search(&mut self) {
        self.search.reset();
        self.candidate_list.set_len(0);
    }

    pub fn current_candidate(&self) -> Option<&MovieSummary> {
        self.search
            .state()
            .candidates
            .get(self.candidate_list.selected)
    }

    // -------------------------------------------------------------------------
    // Selection & Playback
    // -------------------------------------------------------------------------

    /// Resolve a chosen movie in the background
    pub fn select(&mut self, movie: MovieSummary) {
        self.resolve_seq += 1;
        let request = self.resolve_seq;
        self.resolving = Some(request);

        let catalog = Arc::clone(&self.catalog);
        let tx = self.tx.clone();
        tracing::debug!(id = movie.id, request, "Resolving selection");
        tokio::spawn(async move {
            let result = resolver::resolve(catalog.as_ref(), &movie).await;
            let _ = tx.send(AppEvent::Resolved { request, result });
        });
    }

    fn finish_resolve(&mut self, request: u64, result: Result<Resolved, ResolveError>) {
        if self.resolving != Some(request) {
            tracing::debug!(request, "Dropping superseded selection");
            return;
        }
        self.resolving = None;

        match result {
            Ok(resolved) => self.apply_selection(resolved.external_id, Some(resolved.title)),
            Err(e) => self.notify(e.notice()),
        }
    }

    /// Play an identifier typed by hand
    pub fn play_external_id(&mut self, id: &str) -> bool {
        match validate_external_id(id.trim()) {
            Ok(id) => {
                let id = id.to_string();
                self.apply_selection(id, None);
                true
            }
            Err(msg) => {
                self.notify(msg);
                false
            }
        }
    }

    /// Make an identifier the active selection: search and home lists are
    /// torn down and the choice is persisted.
    fn apply_selection(&mut self, external_id: String, title: Option<String>) {
        self.clear_search();
        self.input_mode = InputMode::Normal;

        if let Err(e) = self.prefs.record_played(self.store.as_mut(), &external_id) {
            tracing::warn!(error = %e, "Failed to persist selection");
        }

        let mut playback = Playback::new(external_id, self.backend);
        if let Some(title) = title {
            playback = playback.with_title(title);
        }
        self.pending_open = Some(playback.url());
        self.playback = Some(playback);
        self.sync_lists();
    }

    /// Leave playback; the home lists load again from scratch
    pub fn go_home(&mut self) {
        if self.playback.take().is_none() {
            return;
        }
        if let Err(e) = self.prefs.clear_last_played(self.store.as_mut()) {
            tracing::warn!(error = %e, "Failed to clear last played");
        }
        self.lists = ListViewState::new();
        self.cursor = HomeCursor::default();
        self.cycle = Cycle::Pending;
        self.sync_lists();
    }

    pub fn set_backend(&mut self, backend: Backend) {
        self.backend = backend;
        if let Err(e) = self.prefs.set_backend(self.store.as_mut(), backend) {
            tracing::warn!(error = %e, "Failed to persist backend");
        }
        if let Some(playback) = self.playback.as_mut() {
            playback.backend = backend;
        }
    }

    pub fn reopen(&mut self) {
        self.pending_open = self.playback.as_ref().map(Playback::url);
    }

    // -------------------------------------------------------------------------
    // Session Gate
    // -------------------------------------------------------------------------

    /// Every edit restarts the auto-submit timer; it is armed only while the
    /// entry is complete.
    fn pin_char(&mut self, c: char) {
        self.pin_due = None;
        if self.gate.push_char(c) {
            self.pin_due = Some(Instant::now() + PIN_AUTO_SUBMIT_DELAY);
        }
    }

    fn pin_backspace(&mut self) {
        self.gate.backspace();
        self.pin_due = None;
    }

    pub fn submit_pin(&mut self) {
        self.pin_due = None;
        match self.gate.submit(self.store.as_mut(), now_millis()) {
            Ok(()) => tracing::info!("Session unlocked"),
            Err(crate::session::GateError::IncorrectPin) => {
                tracing::info!("Incorrect PIN entered");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Unlocked without persisting session");
                self.notify(e.to_string());
            }
        }
        self.sync_lists();
    }

    // -------------------------------------------------------------------------
    // Event Pump
    // -------------------------------------------------------------------------

    /// Apply all completed background work and due timers. Returns true if
    /// anything visible changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;

        if self.pin_due.is_some_and(|due| Instant::now() >= due) {
            self.submit_pin();
            changed = true;
        }

        while let Ok(event) = self.rx.try_recv() {
            self.handle_event(event);
            changed = true;
        }

        if self.search.poll() {
            self.candidate_list
                .set_len(self.search.state().candidates.len());
            changed = true;
        }

        changed
    }

    /// Wait for the next background report
    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }

    /// Wait for the next search pipeline event and apply it
    pub async fn pump_search(&mut self) -> bool {
        match self.search.next_event().await {
            Some(event) => {
                let changed = self.search.handle(event);
                self.candidate_list
                    .set_len(self.search.state().candidates.len());
                changed
            }
            None => false,
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::ListsLoaded { cycle, result } => self.finish_cycle(cycle, result),
            AppEvent::Resolved { request, result } => self.finish_resolve(request, result),
        }
    }

    // -------------------------------------------------------------------------
    // Keyboard Event Handling
    // -------------------------------------------------------------------------

    /// Handle keyboard event, returns true if event was consumed
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        // Global quit shortcut
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit();
            return true;
        }

        // Any key acknowledges the current notice
        self.dismiss_notice();

        match self.view() {
            View::Locked => self.handle_locked_key(key),
            _ if self.input_mode == InputMode::Editing => self.handle_editing_key(key),
            View::Home => self.handle_home_key(key),
            View::Search => self.handle_search_key(key),
            View::Playing => self.handle_playing_key(key),
        }
    }

    fn handle_locked_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => {
                self.quit();
                true
            }
            KeyCode::Enter => {
                self.submit_pin();
                true
            }
            KeyCode::Backspace => {
                self.pin_backspace();
                true
            }
            KeyCode::Char('?') => {
                self.gate.reveal_hint();
                true
            }
            KeyCode::Char(c) => {
                self.pin_char(c);
                true
            }
            _ => false,
        }
    }

    /// Handle keys in editing (text input) mode
    fn handle_editing_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => {
                self.dismiss_search();
                self.input_mode = InputMode::Normal;
                true
            }
            KeyCode::Enter => {
                if let Some(movie) = self.current_candidate().cloned() {
                    self.select(movie);
                } else {
                    let query = self.search.state().query.clone();
                    if validate_external_id(query.trim()).is_ok() {
                        self.play_external_id(&query);
                    } else {
                        self.input_mode = InputMode::Normal;
                    }
                }
                true
            }
            KeyCode::Up => {
                self.candidate_list.up();
                true
            }
            KeyCode::Down => {
                self.candidate_list.down();
                true
            }
            KeyCode::Backspace => {
                self.pop_query_char();
                true
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.clear_search();
                true
            }
            KeyCode::Char(c) => {
                self.push_query_char(c);
                true
            }
            _ => false,
        }
    }

    fn handle_home_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => {
                self.quit();
                true
            }
            KeyCode::Char('/') | KeyCode::Char('s') => {
                self.input_mode = InputMode::Editing;
                true
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor.row.up();
                self.cursor.col.reset();
                self.sync_cursor();
                true
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.cursor.row.down();
                self.cursor.col.reset();
                self.sync_cursor();
                true
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.cursor.col.up();
                true
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.cursor.col.down();
                true
            }
            KeyCode::Char('e') => {
                self.toggle_expand();
                true
            }
            KeyCode::Char('b') => {
                self.set_backend(self.backend.next());
                true
            }
            KeyCode::Enter => {
                if let Some(movie) = self.current_movie().cloned() {
                    self.select(movie);
                }
                true
            }
            _ => false,
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => {
                self.quit();
                true
            }
            KeyCode::Char('/') | KeyCode::Char('s') => {
                self.input_mode = InputMode::Editing;
                true
            }
            KeyCode::Esc => {
                self.clear_search();
                true
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.candidate_list.up();
                true
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.candidate_list.down();
                true
            }
            KeyCode::Enter => {
                if let Some(movie) = self.current_candidate().cloned() {
                    self.select(movie);
                }
                true
            }
            _ => false,
        }
    }

    fn handle_playing_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => {
                self.quit();
                true
            }
            KeyCode::Esc | KeyCode::Char('h') | KeyCode::Backspace => {
                self.go_home();
                true
            }
            KeyCode::Char('b') => {
                self.set_backend(self.backend.next());
                self.reopen();
                true
            }
            KeyCode::Char('o') | KeyCode::Enter => {
                self.reopen();
                true
            }
            KeyCode::Char('/') | KeyCode::Char('s') => {
                self.input_mode = InputMode::Editing;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_state_navigation() {
        let mut list = ListState::new(3);
        list.down();
        list.down();
        list.down();
        assert_eq!(list.selected, 2);
        list.up();
        assert_eq!(list.selected, 1);
        list.reset();
        assert_eq!(list.selected, 0);
        list.up();
        assert_eq!(list.selected, 0);
    }

    #[test]
    fn test_list_state_empty() {
        let mut list = ListState::new(0);
        list.down();
        assert_eq!(list.selected, 0);
    }

    #[test]
    fn test_list_state_set_len() {
        let mut list = ListState::new(10);
        list.selected = 8;

        // Shrinking should clamp selection
        list.set_len(5);
        assert_eq!(list.selected, 4);

        // Growing shouldn't change selection
        list.set_len(10);
        assert_eq!(list.selected, 4);
    }
}
