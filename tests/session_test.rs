//! Session gate tests
//!
//! The PIN is a plaintext shared secret compared on the client; these tests
//! cover the gate's behavior, not any security property.

use streamverse::session::{
    GateError, GateState, SessionGate, SessionToken, EXPIRY_WINDOW_MILLIS, INCORRECT_PIN_MESSAGE,
};
use streamverse::store::{FileStore, MemoryStore, Store, KEY_SESSION};

const PIN: &str = "220325";
const HOUR: i64 = 60 * 60 * 1000;
const NOW: i64 = 1_760_000_000_000;

fn store_with_token(issued_at: i64) -> MemoryStore {
    let mut store = MemoryStore::new();
    let token = serde_json::to_string(&SessionToken::issue(issued_at)).unwrap();
    store.set(KEY_SESSION, &token).unwrap();
    store
}

#[test]
fn test_token_three_hours_old_is_expired_and_purged() {
    let mut store = store_with_token(NOW - 3 * HOUR);
    let gate = SessionGate::load(&mut store, PIN, NOW);

    assert_eq!(gate.state(), GateState::Locked);
    assert!(store.get(KEY_SESSION).is_none());
}

#[test]
fn test_token_one_hour_old_is_valid() {
    let mut store = store_with_token(NOW - HOUR);
    let gate = SessionGate::load(&mut store, PIN, NOW);

    assert_eq!(gate.state(), GateState::Unlocked);
    assert!(store.get(KEY_SESSION).is_some());
}

#[test]
fn test_token_at_window_boundary_is_expired() {
    let mut store = store_with_token(NOW - EXPIRY_WINDOW_MILLIS);
    assert!(!SessionGate::load(&mut store, PIN, NOW).is_unlocked());

    let mut store = store_with_token(NOW - EXPIRY_WINDOW_MILLIS + 1);
    assert!(SessionGate::load(&mut store, PIN, NOW).is_unlocked());
}

#[test]
fn test_wrong_pin_clears_entry_and_shows_error() {
    let mut store = MemoryStore::new();
    let mut gate = SessionGate::load(&mut store, PIN, NOW);

    for c in "123456".chars() {
        gate.push_char(c);
    }
    assert!(gate.is_complete());

    let err = gate.submit(&mut store, NOW).unwrap_err();
    assert!(matches!(err, GateError::IncorrectPin));
    assert_eq!(gate.state(), GateState::Locked);
    assert_eq!(gate.input(), "");
    assert_eq!(gate.error(), Some(INCORRECT_PIN_MESSAGE));
    assert!(store.get(KEY_SESSION).is_none());
}

#[test]
fn test_correct_pin_unlocks_and_persists_token() {
    let mut store = MemoryStore::new();
    let mut gate = SessionGate::load(&mut store, PIN, NOW);

    // A failed attempt first; its error clears on success
    gate.unlock(&mut store, "000000", NOW).unwrap_err();
    gate.unlock(&mut store, PIN, NOW).unwrap();

    assert!(gate.is_unlocked());
    assert!(gate.error().is_none());

    let raw = store.get(KEY_SESSION).unwrap();
    let token: SessionToken = serde_json::from_str(&raw).unwrap();
    assert_eq!(token.issued_at_millis, NOW);
}

#[test]
fn test_session_survives_restart_within_window() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    {
        let mut store = FileStore::open(&path);
        let mut gate = SessionGate::load(&mut store, PIN, NOW);
        gate.unlock(&mut store, PIN, NOW).unwrap();
    }

    let mut store = FileStore::open(&path);
    assert!(SessionGate::load(&mut store, PIN, NOW + HOUR).is_unlocked());

    let mut store = FileStore::open(&path);
    assert!(!SessionGate::load(&mut store, PIN, NOW + 3 * HOUR).is_unlocked());

    // The expired token was purged from disk
    let store = FileStore::open(&path);
    assert!(store.get(KEY_SESSION).is_none());
}
