//! In-memory substrate.

use super::{KeyValueStore, KvError, KvResult};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for testing and ephemeral use.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = match self.entries.read() {
            Ok(entries) => entries.keys().cloned().collect(),
            Err(_) => Vec::new(),
        };
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock_error(e: impl std::fmt::Display) -> KvError {
    KvError::Lock(e.to_string())
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        let entries = self.entries.read().map_err(lock_error)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> KvResult<()> {
        let mut entries = self.entries.write().map_err(lock_error)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> KvResult<()> {
        let mut entries = self.entries.write().map_err(lock_error)?;
        entries.remove(key);
        Ok(())
    }
}
