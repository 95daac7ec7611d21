//! In-memory implementation of `DurableStore`.
//!
//! Nothing survives the process. Useful for tests and for consoles that
//! should forget their session on exit.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use portcullis_contracts::error::PortcullisResult;
use portcullis_core::traits::DurableStore;

/// A `HashMap` behind a mutex. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> PortcullisResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortcullisResult<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PortcullisResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
