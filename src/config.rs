//! Configuration management for StreamVerse
//!
//! Handles config file loading/saving and API key management.
//! Config is stored at ~/.config/streamverse/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::{Backend, NamedQuery};
use crate::search::DEFAULT_DEBOUNCE;

/// API key compiled in at build time, if any
const BUILD_TMDB_API_KEY: Option<&str> = option_env!("TMDB_API_KEY");

const DEFAULT_PIN: &str = "220325";
const DEFAULT_PIN_HINT: &str = "It's when we started dating officially (MMDDYY)";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Data directory for the store and log file (~/.local/share/streamverse)
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("streamverse"))
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// TMDB API key
    pub tmdb_api_key: Option<String>,
    /// Shared PIN for the session gate
    pub pin: Option<String>,
    /// Hint revealed by "Forgot PIN?"
    pub pin_hint: Option<String>,
    /// Backend used when none has been chosen yet
    pub default_backend: Option<Backend>,
    /// Search debounce in milliseconds
    pub debounce_ms: Option<u64>,
    /// Catalog request timeout in seconds
    pub request_timeout_secs: Option<u64>,
    /// Keep a recent-selection history
    pub history_enabled: Option<bool>,
    /// Replaces the built-in home lists
    pub queries: Option<Vec<NamedQuery>>,
}

impl Config {
    /// Get config file path (~/.config/streamverse/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("streamverse").join("config.toml"))
    }

    /// Load config from the default location, or return default if not found
    pub fn load() -> Self {
        match Self::path() {
            Some(path) => Self::load_from(&path).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring unreadable config file");
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// Load config from a specific file. A missing file yields the default.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Get TMDB API key with fallback chain:
    /// 1. Environment variable TMDB_API_KEY
    /// 2. Key from config file
    /// 3. Key compiled in at build time
    pub fn tmdb_api_key(&self) -> Result<String> {
        if let Ok(key) = std::env::var("TMDB_API_KEY") {
            if !key.trim().is_empty() {
                return Ok(key);
            }
        }

        self.tmdb_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| BUILD_TMDB_API_KEY.map(String::from))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No TMDB API key configured. Set TMDB_API_KEY or add tmdb_api_key to {}",
                    Self::path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "config.toml".to_string())
                )
            })
    }

    pub fn pin(&self) -> &str {
        self.pin.as_deref().unwrap_or(DEFAULT_PIN)
    }

    pub fn pin_hint(&self) -> Option<String> {
        match &self.pin_hint {
            Some(hint) if hint.is_empty() => None,
            Some(hint) => Some(hint.clone()),
            None => Some(DEFAULT_PIN_HINT.to_string()),
        }
    }

    pub fn default_backend(&self) -> Backend {
        self.default_backend.unwrap_or_default()
    }

    pub fn debounce(&self) -> Duration {
        self.debounce_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_DEBOUNCE)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn history_enabled(&self) -> bool {
        self.history_enabled.unwrap_or(true)
    }

    /// Named queries for the home lists
    pub fn queries(&self) -> Vec<NamedQuery> {
        match &self.queries {
            Some(queries) if !queries.is_empty() => queries.clone(),
            _ => NamedQuery::defaults(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.tmdb_api_key.is_none());
        assert_eq!(config.pin(), DEFAULT_PIN);
        assert_eq!(config.default_backend(), Backend::Vidfast);
        assert_eq!(config.debounce(), DEFAULT_DEBOUNCE);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.history_enabled());
        assert_eq!(config.queries(), NamedQuery::defaults());
    }

    #[test]
    fn test_empty_hint_disables_hint() {
        let config = Config {
            pin_hint: Some(String::new()),
            ..Config::default()
        };
        assert!(config.pin_hint().is_none());
        assert!(Config::default().pin_hint().is_some());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            pin = "123456"
            default_backend = "2embed"
            debounce_ms = 250
            history_enabled = false

            [[queries]]
            key = "horror"
            title = "Horror"
            query_text = "with_genres=27"
            source = "discover"
            max_pages = 2
            requires_poster = true

            [[queries]]
            key = "popular"
            title = "Popular"
            source = "popular"
            mandatory = true
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.pin(), "123456");
        assert_eq!(config.default_backend(), Backend::TwoEmbed);
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert!(!config.history_enabled());

        let queries = config.queries();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].source, SourceKind::Discover);
        assert_eq!(queries[0].max_pages, 2);
        assert!(queries[0].genre_filter.is_none());
        assert!(queries[1].mandatory);
        assert_eq!(queries[1].max_pages, 1);
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert!(config.pin.is_none());
    }

    #[test]
    fn test_load_from_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "pin = [").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
