//! In-memory state store for tests.

use std::collections::HashMap;
use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{StateStore, StoreError};

/// A [`StateStore`] backed by a `HashMap`, used in tests.
///
/// `failing()` builds a store whose writes always fail, for exercising the
/// best-effort persistence path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slices: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose `save` and `remove` calls always fail.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            slices: Mutex::new(HashMap::new()),
            fail_writes: AtomicBool::new(true),
        }
    }

    fn write_error() -> StoreError {
        StoreError::Io(io::Error::other("simulated write failure"))
    }
}

impl StateStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.slices
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(Self::write_error());
        }
        self.slices
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(Self::write_error());
        }
        self.slices
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}
