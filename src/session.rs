//! Session gate - PIN unlock with timed expiry
//!
//! The gate starts Locked unless a valid session token is persisted. A token
//! is valid for two hours after it was issued and is only evaluated when the
//! gate is loaded. The PIN is a plaintext shared secret compared locally; it
//! keeps casual visitors out and nothing more.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::store::{Store, StoreError, KEY_SESSION};

/// How long a session token stays valid
pub const EXPIRY_WINDOW_MILLIS: i64 = 2 * 60 * 60 * 1000;

/// PIN length; entry auto-submits once this many characters are typed
pub const PIN_LENGTH: usize = 6;

/// Message shown after a wrong PIN
pub const INCORRECT_PIN_MESSAGE: &str = "Incorrect PIN. Please try again.";

/// Milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Persisted proof of a successful unlock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionToken {
    pub issued_at_millis: i64,
}

impl SessionToken {
    pub fn issue(now: i64) -> Self {
        Self {
            issued_at_millis: now,
        }
    }

    pub fn is_valid_at(&self, now: i64) -> bool {
        now.saturating_sub(self.issued_at_millis) < EXPIRY_WINDOW_MILLIS
    }
}

#[derive(Error, Debug)]
pub enum GateError {
    #[error("{}", INCORRECT_PIN_MESSAGE)]
    IncorrectPin,

    /// The gate opened but the token could not be saved
    #[error("Unlocked, but the session could not be saved: {0}")]
    Persist(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Locked,
    Unlocked,
}

/// PIN gate guarding aggregation and search
#[derive(Debug, Clone)]
pub struct SessionGate {
    state: GateState,
    secret: String,
    input: String,
    error: Option<String>,
    hint: Option<String>,
    hint_visible: bool,
}

impl SessionGate {
    /// Evaluate the persisted token. Malformed or expired tokens are purged.
    pub fn load(store: &mut dyn Store, secret: impl Into<String>, now: i64) -> Self {
        let state = match store.get(KEY_SESSION) {
            None => GateState::Locked,
            Some(raw) => match serde_json::from_str::<SessionToken>(&raw) {
                Ok(token) if token.is_valid_at(now) => GateState::Unlocked,
                Ok(token) => {
                    tracing::info!(issued_at = token.issued_at_millis, "Session expired");
                    purge(store);
                    GateState::Locked
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Discarding malformed session token");
                    purge(store);
                    GateState::Locked
                }
            },
        };

        Self {
            state,
            secret: secret.into(),
            input: String::new(),
            error: None,
            hint: None,
            hint_visible: false,
        }
    }

    pub fn with_hint(mut self, hint: Option<String>) -> Self {
        self.hint = hint;
        self
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == GateState::Unlocked
    }

    /// Current PIN entry
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Append a typed character. Returns true once the entry is complete and
    /// ready to be checked.
    pub fn push_char(&mut self, c: char) -> bool {
        if self.input.chars().count() < PIN_LENGTH && !c.is_control() {
            self.input.push(c);
        }
        self.is_complete()
    }

    pub fn backspace(&mut self) {
        self.input.pop();
    }

    pub fn is_complete(&self) -> bool {
        self.input.chars().count() == PIN_LENGTH
    }

    /// Check the current entry against the secret
    pub fn submit(&mut self, store: &mut dyn Store, now: i64) -> Result<(), GateError> {
        let entered = std::mem::take(&mut self.input);

        if entered != self.secret {
            self.error = Some(INCORRECT_PIN_MESSAGE.to_string());
            return Err(GateError::IncorrectPin);
        }

        self.state = GateState::Unlocked;
        self.error = None;

        let token = serde_json::to_string(&SessionToken::issue(now)).map_err(StoreError::from)?;
        store.set(KEY_SESSION, &token)?;
        Ok(())
    }

    /// Check a complete PIN in one step
    pub fn unlock(&mut self, store: &mut dyn Store, pin: &str, now: i64) -> Result<(), GateError> {
        self.input = pin.to_string();
        self.submit(store, now)
    }

    /// Drop the persisted token and lock
    pub fn lock(&mut self, store: &mut dyn Store) -> Result<(), StoreError> {
        self.state = GateState::Locked;
        store.remove(KEY_SESSION)
    }

    pub fn reveal_hint(&mut self) {
        self.hint_visible = true;
    }

    /// Hint text, once revealed
    pub fn visible_hint(&self) -> Option<&str> {
        if self.hint_visible {
            self.hint.as_deref()
        } else {
            None
        }
    }

    pub fn has_hint(&self) -> bool {
        self.hint.is_some()
    }
}

fn purge(store: &mut dyn Store) {
    if let Err(e) = store.remove(KEY_SESSION) {
        tracing::warn!(error = %e, "Failed to purge session token");
    }
}
