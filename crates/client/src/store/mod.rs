//! Persistent store adapter for named state slices.
//!
//! Pure key/value persistence, no business logic. Every successful cart or
//! wishlist mutation is written through immediately so a restart never loses
//! unsynced local state. Persistence is best-effort: the in-memory slice is
//! authoritative for the session, so write failures are logged at `warn` and
//! swallowed - they must never block the mutation that triggered them.

mod file;
#[cfg(test)]
mod memory;

pub use file::FileStore;
#[cfg(test)]
pub use memory::MemoryStore;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Keys for the persisted state slices.
pub mod keys {
    /// Serialized cart line list.
    pub const CART: &str = "cart";

    /// Serialized wishlist entry list.
    pub const WISHLIST: &str = "wishlist";

    /// Persisted session credentials for restore-at-startup.
    pub const SESSION: &str = "session";
}

/// Errors raised by store implementations.
///
/// Callers go through the best-effort helpers below and never see these;
/// the type exists so implementations can report *why* a write failed to
/// the log.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be serialized.
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Durable key/value storage for serialized state slices.
///
/// Implementations are synchronous: slices are small and the adapter sits on
/// the hot path of optimistic mutations, which must complete without
/// suspension points.
pub trait StateStore: Send + Sync {
    /// Load the raw serialized value for `key`, if present.
    fn load(&self, key: &str) -> Option<String>;

    /// Persist `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write fails; callers treat this as
    /// best-effort and must not propagate it.
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove the value for `key`. Removing an absent key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the removal fails.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Load a typed slice, falling back to the empty default.
///
/// A missing key and a corrupt value both yield `T::default()`; corruption
/// is logged since it means a previous write was torn or the format changed.
pub fn load_slice<T: DeserializeOwned + Default>(store: &dyn StateStore, key: &str) -> T {
    let Some(raw) = store.load(key) else {
        return T::default();
    };
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, error = %e, "discarding corrupt persisted slice");
            T::default()
        }
    }
}

/// Persist a typed slice, best-effort.
pub fn save_slice<T: Serialize>(store: &dyn StateStore, key: &str, value: &T) {
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to serialize slice; skipping persist");
            return;
        }
    };
    if let Err(e) = store.save(key, &raw) {
        tracing::warn!(key, error = %e, "failed to persist slice; in-memory state unaffected");
    }
}

/// Remove a persisted slice, best-effort.
pub fn clear_slice(store: &dyn StateStore, key: &str) {
    if let Err(e) = store.remove(key) {
        tracing::warn!(key, error = %e, "failed to clear persisted slice");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_load_slice_defaults_on_missing_key() {
        let store = MemoryStore::new();
        let lines: Vec<String> = load_slice(&store, keys::CART);
        assert!(lines.is_empty());
    }

    #[test]
    fn test_load_slice_defaults_on_corrupt_value() {
        let store = MemoryStore::new();
        store.save(keys::CART, "{not json").unwrap();
        let lines: Vec<String> = load_slice(&store, keys::CART);
        assert!(lines.is_empty());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let store = MemoryStore::new();
        save_slice(&store, keys::WISHLIST, &vec!["p1".to_owned(), "p2".to_owned()]);
        let entries: Vec<String> = load_slice(&store, keys::WISHLIST);
        assert_eq!(entries, vec!["p1", "p2"]);
    }

    #[test]
    fn test_save_slice_swallows_write_failure() {
        let store = MemoryStore::failing();
        // Must not panic or propagate.
        save_slice(&store, keys::CART, &vec!["p1".to_owned()]);
        assert!(store.load(keys::CART).is_none());
    }

    #[test]
    fn test_clear_slice() {
        let store = MemoryStore::new();
        save_slice(&store, keys::SESSION, &"token".to_owned());
        clear_slice(&store, keys::SESSION);
        assert!(store.load(keys::SESSION).is_none());
    }
}
