//! Persistence over a synchronous string key-value substrate.
//!
//! Named project slots are checksummed; the drawing snapshot history is
//! capped; persisted state carries a schema version advanced by a
//! [`MigrationRegistry`].

mod checksum;
mod history;
mod memory;
mod migrate;
mod slots;

#[cfg(not(target_arch = "wasm32"))]
mod file;

#[cfg(target_arch = "wasm32")]
mod local_storage;

pub use checksum::{checksum, fnv1a32};
pub use history::{MAX_VERSIONS, PersistSnapshot, VersionHistory};
pub use memory::MemoryKv;
pub use migrate::{
    CURRENT_SCHEMA_VERSION, DRAWINGS_STATE, MigrationError, MigrationFn, MigrationRegistry,
    VersionedState,
};
pub use slots::{PROJECT_VERSION, ProjectSlots, ProjectV1, RESERVED_SLOT_NAME};

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileKv;

#[cfg(target_arch = "wasm32")]
pub use local_storage::LocalStorageKv;

use thiserror::Error;

/// Substrate errors.
#[derive(Debug, Error)]
pub enum KvError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Lock error: {0}")]
    Lock(String),
}

pub type KvResult<T> = Result<T, KvError>;

/// Errors from the persistence layer on top of a substrate.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    Kv(#[from] KvError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Slot name '{0}' is reserved")]
    ReservedName(String),
    #[error("Slot index is corrupt: {0}")]
    CorruptIndex(String),
}

pub type PersistResult<T> = Result<T, PersistError>;

/// Synchronous string-to-string storage.
///
/// Note: On native platforms, implementations must be Send + Sync.
/// On WASM, these bounds are relaxed since it's single-threaded.
#[cfg(not(target_arch = "wasm32"))]
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> KvResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> KvResult<()>;
    /// Removing a missing key succeeds.
    fn remove(&self, key: &str) -> KvResult<()>;
}

/// Synchronous string-to-string storage (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait KeyValueStore {
    fn get(&self, key: &str) -> KvResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> KvResult<()>;
    /// Removing a missing key succeeds.
    fn remove(&self, key: &str) -> KvResult<()>;
}

pub(crate) fn slot_index_key(namespace: &str) -> String {
    format!("{namespace}.project.slotIndex")
}

pub(crate) fn slot_key(namespace: &str, name: &str) -> String {
    format!("{namespace}.project.{name}")
}

pub(crate) fn current_key(namespace: &str) -> String {
    format!("{namespace}-drawings@current")
}

pub(crate) fn versions_key(namespace: &str) -> String {
    format!("{namespace}-drawings@versions")
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    #[cfg(not(target_arch = "wasm32"))]
    use std::time::{SystemTime, UNIX_EPOCH};
    #[cfg(target_arch = "wasm32")]
    use web_time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys() {
        assert_eq!(slot_index_key("chartink"), "chartink.project.slotIndex");
        assert_eq!(slot_key("chartink", "main"), "chartink.project.main");
        assert_eq!(current_key("desk"), "desk-drawings@current");
        assert_eq!(versions_key("desk"), "desk-drawings@versions");
    }

    #[test]
    fn test_now_millis_advances_past_2020() {
        assert!(now_millis() > 1_577_836_800_000);
    }
}
