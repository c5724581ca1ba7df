//! List-view state: the home screen's aggregated lists
//!
//! A reducer over [`ListAction`]. Transitions are pure functions of the
//! previous state and the action; the app owns the single instance.

use std::collections::HashMap;

use crate::models::{AggregationResult, MovieSummary};

/// Number of movies shown for a collapsed list
pub const PREVIEW_LEN: usize = 7;

/// Actions accepted by [`reduce`]
#[derive(Debug, Clone, PartialEq)]
pub enum ListAction {
    /// Clear lists and enter the loading state
    FetchStart,
    /// Aggregation finished; replace the lists
    FetchSuccess(AggregationResult),
    /// Mandatory fetch failed
    FetchError(String),
    /// Flip one list's expand flag
    ToggleExpand(String),
    /// Stop loading without touching lists (gate locked or selection active)
    AbortFetch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListViewState {
    pub lists: AggregationResult,
    pub is_loading: bool,
    pub error: Option<String>,
    pub expanded: HashMap<String, bool>,
}

impl Default for ListViewState {
    fn default() -> Self {
        Self {
            lists: AggregationResult::new(),
            is_loading: true,
            error: None,
            expanded: HashMap::new(),
        }
    }
}

impl ListViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, key: &str) -> bool {
        self.expanded.get(key).copied().unwrap_or(false)
    }

    /// Movies to display for a list: the preview row, or all when expanded
    pub fn visible(&self, key: &str) -> &[MovieSummary] {
        let movies = self.lists.get(key).unwrap_or_default();
        if self.is_expanded(key) {
            movies
        } else {
            &movies[..movies.len().min(PREVIEW_LEN)]
        }
    }

    /// A list can be expanded only if it holds more than the preview row
    pub fn is_expandable(&self, key: &str) -> bool {
        !self.is_loading && self.lists.get(key).map_or(0, |m| m.len()) > PREVIEW_LEN
    }

    /// Has a cycle completed successfully with data to show
    pub fn is_populated(&self) -> bool {
        !self.is_loading && self.error.is_none() && !self.lists.is_empty()
    }
}

/// Apply one action
pub fn reduce(state: ListViewState, action: ListAction) -> ListViewState {
    match action {
        ListAction::FetchStart => ListViewState {
            lists: AggregationResult::new(),
            is_loading: true,
            error: None,
            ..state
        },
        ListAction::FetchSuccess(lists) => ListViewState {
            lists,
            is_loading: false,
            ..state
        },
        ListAction::FetchError(message) => ListViewState {
            is_loading: false,
            error: Some(message),
            ..state
        },
        ListAction::ToggleExpand(key) => {
            let mut expanded = state.expanded;
            let flag = expanded.entry(key).or_insert(false);
            *flag = !*flag;
            ListViewState { expanded, ..state }
        }
        ListAction::AbortFetch => ListViewState {
            is_loading: false,
            ..state
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn movies(n: u64) -> Vec<MovieSummary> {
        (1..=n)
            .map(|id| MovieSummary {
                id,
                title: format!("Movie {}", id),
                poster_path: None,
                release_date: None,
                genre_ids: BTreeSet::new(),
            })
            .collect()
    }

    fn populated() -> ListViewState {
        let mut lists = AggregationResult::new();
        lists.insert("popular", movies(20));
        lists.insert("short", movies(3));
        reduce(ListViewState::new(), ListAction::FetchSuccess(lists))
    }

    #[test]
    fn test_initial_state_is_loading() {
        let state = ListViewState::new();
        assert!(state.is_loading);
        assert!(state.lists.is_empty());
        assert!(state.error.is_none());
        assert!(!state.is_populated());
    }

    #[test]
    fn test_fetch_cycle_success() {
        let state = reduce(ListViewState::new(), ListAction::FetchStart);
        assert!(state.is_loading);

        let state = populated();
        assert!(!state.is_loading);
        assert_eq!(state.lists.len(), 2);
        assert!(state.is_populated());
    }

    #[test]
    fn test_fetch_error_keeps_lists_empty() {
        let state = reduce(ListViewState::new(), ListAction::FetchStart);
        let state = reduce(state, ListAction::FetchError("boom".into()));
        assert!(!state.is_loading);
        assert_eq!(state.error.as_deref(), Some("boom"));
        assert!(state.lists.is_empty());
    }

    #[test]
    fn test_fetch_start_clears_previous_data() {
        let state = reduce(populated(), ListAction::FetchError("old".into()));
        let state = reduce(state, ListAction::FetchStart);
        assert!(state.is_loading);
        assert!(state.lists.is_empty());
        assert!(state.error.is_none());
    }

    #[test]
    fn test_abort_leaves_lists() {
        let state = reduce(populated(), ListAction::AbortFetch);
        assert!(!state.is_loading);
        assert_eq!(state.lists.len(), 2);

        let state = reduce(ListViewState::new(), ListAction::AbortFetch);
        assert!(!state.is_loading);
        assert!(state.lists.is_empty());
    }

    #[test]
    fn test_toggle_expand() {
        let state = populated();
        assert_eq!(state.visible("popular").len(), PREVIEW_LEN);
        assert!(state.is_expandable("popular"));
        assert!(!state.is_expandable("short"));

        let state = reduce(state, ListAction::ToggleExpand("popular".into()));
        assert!(state.is_expanded("popular"));
        assert_eq!(state.visible("popular").len(), 20);
        assert!(!state.is_expanded("short"));

        let state = reduce(state, ListAction::ToggleExpand("popular".into()));
        assert!(!state.is_expanded("popular"));
    }

    #[test]
    fn test_visible_unknown_key_is_empty() {
        assert!(populated().visible("missing").is_empty());
    }
}
