//! Persisted key-value store and user preferences
//!
//! Values are plain strings keyed by name, mirroring a browser's local
//! storage. [`FileStore`] keeps them in a single JSON file and rewrites it on
//! every change; [`MemoryStore`] is the in-process equivalent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::Backend;

/// Last external identifier played
pub const KEY_LAST_PLAYED: &str = "vidgen_imdb_code";
/// Preferred playback backend
pub const KEY_BACKEND: &str = "vidgen_source";
/// Session token JSON
pub const KEY_SESSION: &str = "vidgen_session";
/// Recent selections, JSON array, most recent first
pub const KEY_HISTORY: &str = "vidgen_history";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// String-valued key-value storage
pub trait Store: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);
        Ok(())
    }
}

/// JSON-file backed store
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStore {
    /// Default location (~/.local/share/streamverse/store.json)
    pub fn default_path() -> Option<PathBuf> {
        crate::config::data_dir().map(|d| d.join("store.json"))
    }

    /// Open a store file. A missing or unreadable file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Store file is corrupt, starting empty");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.values.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

// =============================================================================
// History
// =============================================================================

/// Bounded most-recent-first list of played identifiers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    pub const CAPACITY: usize = 10;

    pub fn new() -> Self {
        Self::default()
    }

    /// Move `id` to the front, dropping any earlier copy and the oldest
    /// entries beyond capacity
    pub fn push(&mut self, id: impl Into<String>) {
        let id = id.into();
        self.entries.retain(|e| *e != id);
        self.entries.insert(0, id);
        self.entries.truncate(Self::CAPACITY);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<String> for History {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut history = History::new();
        let mut items: Vec<String> = iter.into_iter().collect();
        // Oldest first so the first item ends up in front
        items.reverse();
        for item in items {
            history.push(item);
        }
        history
    }
}

// =============================================================================
// Preferences
// =============================================================================

/// Typed access to the persisted preference keys
#[derive(Debug, Clone, Copy)]
pub struct Preferences {
    history_enabled: bool,
}

impl Preferences {
    pub fn new(history_enabled: bool) -> Self {
        Self { history_enabled }
    }

    pub fn history_enabled(&self) -> bool {
        self.history_enabled
    }

    pub fn last_played(&self, store: &dyn Store) -> Option<String> {
        store.get(KEY_LAST_PLAYED).filter(|s| !s.is_empty())
    }

    /// Chosen backend; unset or unknown values read as `None`
    pub fn backend(&self, store: &dyn Store) -> Option<Backend> {
        store.get(KEY_BACKEND).and_then(|s| s.parse().ok())
    }

    pub fn set_backend(&self, store: &mut dyn Store, backend: Backend) -> Result<(), StoreError> {
        store.set(KEY_BACKEND, backend.as_str())
    }

    /// Recent selections; a corrupt value reads as empty
    pub fn history(&self, store: &dyn Store) -> History {
        if !self.history_enabled {
            return History::new();
        }
        store
            .get(KEY_HISTORY)
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn clear_history(&self, store: &mut dyn Store) -> Result<(), StoreError> {
        store.remove(KEY_HISTORY)
    }

    /// Persist a new playback selection
    pub fn record_played(&self, store: &mut dyn Store, external_id: &str) -> Result<(), StoreError> {
        store.set(KEY_LAST_PLAYED, external_id)?;
        if self.history_enabled {
            let mut history = self.history(store);
            history.push(external_id);
            store.set(KEY_HISTORY, &serde_json::to_string(&history)?)?;
        }
        Ok(())
    }

    /// Forget the last played identifier (returning home)
    pub fn clear_last_played(&self, store: &mut dyn Store) -> Result<(), StoreError> {
        store.set(KEY_LAST_PLAYED, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_duplicate_moves_to_front() {
        let mut history: History = ["tt0000003", "tt0000002", "tt0000001"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(history.entries()[0], "tt0000003");

        history.push("tt0000001");
        assert_eq!(history.len(), 3);
        assert_eq!(
            history.entries(),
            &["tt0000001", "tt0000003", "tt0000002"]
        );
    }

    #[test]
    fn test_history_capacity() {
        let mut history = History::new();
        for i in 0..15 {
            history.push(format!("tt{:07}", i));
        }
        assert_eq!(history.len(), History::CAPACITY);
        assert_eq!(history.entries()[0], "tt0000014");
        assert!(!history.entries().contains(&"tt0000004".to_string()));
    }

    #[test]
    fn test_preferences_backend_fallback() {
        let prefs = Preferences::new(true);
        let mut store = MemoryStore::new();
        assert_eq!(prefs.backend(&store), None);

        store.set(KEY_BACKEND, "bogus").unwrap();
        assert_eq!(prefs.backend(&store), None);

        prefs.set_backend(&mut store, Backend::Vidsrc).unwrap();
        assert_eq!(prefs.backend(&store), Some(Backend::Vidsrc));
    }

    #[test]
    fn test_record_played_updates_history() {
        let prefs = Preferences::new(true);
        let mut store = MemoryStore::new();
        prefs.record_played(&mut store, "tt1877830").unwrap();
        prefs.record_played(&mut store, "tt0816692").unwrap();
        prefs.record_played(&mut store, "tt1877830").unwrap();

        assert_eq!(prefs.last_played(&store).as_deref(), Some("tt1877830"));
        assert_eq!(prefs.history(&store).entries(), &["tt1877830", "tt0816692"]);
    }

    #[test]
    fn test_history_disabled() {
        let prefs = Preferences::new(false);
        let mut store = MemoryStore::new();
        prefs.record_played(&mut store, "tt1877830").unwrap();
        assert!(store.get(KEY_HISTORY).is_none());
        assert!(prefs.history(&store).is_empty());
    }

    #[test]
    fn test_corrupt_history_reads_empty() {
        let prefs = Preferences::new(true);
        let mut store = MemoryStore::new();
        store.set(KEY_HISTORY, "{not json").unwrap();
        assert!(prefs.history(&store).is_empty());
    }

    #[test]
    fn test_clear_last_played() {
        let prefs = Preferences::new(true);
        let mut store = MemoryStore::new();
        prefs.record_played(&mut store, "tt1877830").unwrap();
        prefs.clear_last_played(&mut store).unwrap();
        assert!(prefs.last_played(&store).is_none());
    }

    #[test]
    fn test_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let mut store = FileStore::open(&path);
        store.set(KEY_BACKEND, "vidsrc").unwrap();
        store.set(KEY_LAST_PLAYED, "tt1877830").unwrap();
        store.remove(KEY_LAST_PLAYED).unwrap();

        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get(KEY_BACKEND).as_deref(), Some("vidsrc"));
        assert!(reopened.get(KEY_LAST_PLAYED).is_none());
    }

    #[test]
    fn test_file_store_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "garbage").unwrap();

        let store = FileStore::open(&path);
        assert!(store.get(KEY_BACKEND).is_none());
    }
}
