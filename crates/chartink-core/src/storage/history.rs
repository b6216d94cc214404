//! Capped history of drawing snapshots.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::{KeyValueStore, PersistResult, current_key, now_millis, versions_key};
use crate::config::DEFAULT_NAMESPACE;
use crate::drawing::{Drawing, DrawingId};
use crate::store::ShapeStore;

/// Number of snapshots kept; older ones are evicted first.
pub const MAX_VERSIONS: usize = 20;

/// Drawings and selection at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistSnapshot {
    /// Milliseconds since the Unix epoch.
    pub ts: u64,
    pub drawings: Vec<Drawing>,
    pub selection: Vec<DrawingId>,
}

impl PersistSnapshot {
    pub fn new(drawings: Vec<Drawing>, selection: Vec<DrawingId>) -> Self {
        Self {
            ts: now_millis(),
            drawings,
            selection,
        }
    }

    /// Snapshot the current contents of a store.
    pub fn capture(store: &dyn ShapeStore) -> Self {
        Self::new(store.drawings().to_vec(), store.selection().to_vec())
    }
}

/// Writes snapshots to "current" and to the capped version list.
pub struct VersionHistory {
    kv: Rc<dyn KeyValueStore>,
    namespace: String,
}

impl VersionHistory {
    pub fn new(kv: Rc<dyn KeyValueStore>) -> Self {
        Self::with_namespace(kv, DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(kv: Rc<dyn KeyValueStore>, namespace: impl Into<String>) -> Self {
        Self {
            kv,
            namespace: namespace.into(),
        }
    }

    /// Append `snapshot` to the history and make it current.
    ///
    /// If the existing history cannot be read only "current" is written.
    pub fn save_version(&self, snapshot: &PersistSnapshot) -> PersistResult<()> {
        match self.read_versions() {
            Ok(mut versions) => {
                versions.push(snapshot.clone());
                if versions.len() > MAX_VERSIONS {
                    let excess = versions.len() - MAX_VERSIONS;
                    versions.drain(..excess);
                }
                self.kv
                    .set(&versions_key(&self.namespace), &serde_json::to_string(&versions)?)?;
            }
            Err(e) => log::warn!("Version history unreadable, writing current only: {}", e),
        }
        self.kv
            .set(&current_key(&self.namespace), &serde_json::to_string(snapshot)?)?;
        Ok(())
    }

    /// The last saved snapshot, if readable.
    pub fn load_current(&self) -> Option<PersistSnapshot> {
        let text = match self.kv.get(&current_key(&self.namespace)) {
            Ok(text) => text?,
            Err(e) => {
                log::warn!("Failed to read current snapshot: {}", e);
                return None;
            }
        };
        serde_json::from_str(&text)
            .map_err(|e| log::warn!("Current snapshot is malformed: {}", e))
            .ok()
    }

    /// Saved snapshots, oldest first. Empty when unreadable.
    pub fn list_versions(&self) -> Vec<PersistSnapshot> {
        self.read_versions().unwrap_or_else(|e| {
            log::warn!("Failed to read version history: {}", e);
            Vec::new()
        })
    }

    fn read_versions(&self) -> PersistResult<Vec<PersistSnapshot>> {
        match self.kv.get(&versions_key(&self.namespace))? {
            Some(text) => Ok(serde_json::from_str(&text)?),
            None => Ok(Vec::new()),
        }
    }
}
