//! Named, checksummed project saves.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{KeyValueStore, PersistError, PersistResult, checksum, now_millis, slot_index_key, slot_key};
use crate::config::DEFAULT_NAMESPACE;
use crate::drawing::Drawing;

/// The only project version `load_slot` accepts.
pub const PROJECT_VERSION: u32 = 1;

/// A named export of a chart's drawings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectV1 {
    pub version: u32,
    pub name: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
    pub drawings: Vec<Drawing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
}

impl ProjectV1 {
    pub fn new(name: impl Into<String>, drawings: Vec<Drawing>) -> Self {
        Self {
            version: PROJECT_VERSION,
            name: name.into(),
            created_at: now_millis(),
            drawings,
            theme: None,
            timeframe: None,
        }
    }

    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = Some(theme.into());
        self
    }

    pub fn with_timeframe(mut self, timeframe: impl Into<String>) -> Self {
        self.timeframe = Some(timeframe.into());
        self
    }
}

/// What is stored under a slot key.
#[derive(Debug, Serialize, Deserialize)]
struct SlotEnvelope {
    checksum: String,
    payload: Value,
}

/// Checksum of the payload's compact JSON form.
fn payload_checksum(payload: &Value) -> PersistResult<String> {
    Ok(checksum(&serde_json::to_string(payload)?))
}

/// Name whose slot key collides with the slot index.
pub const RESERVED_SLOT_NAME: &str = "slotIndex";

fn check_name(name: &str) -> PersistResult<()> {
    if name == RESERVED_SLOT_NAME {
        return Err(PersistError::ReservedName(name.to_string()));
    }
    Ok(())
}

/// Project slots in one namespace of a substrate.
pub struct ProjectSlots {
    kv: Rc<dyn KeyValueStore>,
    namespace: String,
}

impl ProjectSlots {
    pub fn new(kv: Rc<dyn KeyValueStore>) -> Self {
        Self::with_namespace(kv, DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(kv: Rc<dyn KeyValueStore>, namespace: impl Into<String>) -> Self {
        Self {
            kv,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Write `project` under `name` and record the name in the slot index.
    ///
    /// Fails without writing when the name is reserved or the index is
    /// unreadable.
    pub fn save_slot(&self, name: &str, project: &ProjectV1) -> PersistResult<()> {
        check_name(name)?;
        let mut index = self.read_index()?;
        let payload = serde_json::to_value(project)?;
        let envelope = SlotEnvelope {
            checksum: payload_checksum(&payload)?,
            payload,
        };
        self.kv
            .set(&slot_key(&self.namespace, name), &serde_json::to_string(&envelope)?)?;

        if !index.iter().any(|n| n == name) {
            index.push(name.to_string());
            self.write_index(&index)?;
        }
        log::debug!("Saved slot '{}' ({} drawings)", name, project.drawings.len());
        Ok(())
    }

    /// Read a slot.
    ///
    /// Returns `None` when the slot is missing, unreadable, of another
    /// version or malformed. A checksum mismatch only logs a warning.
    pub fn load_slot(&self, name: &str) -> Option<ProjectV1> {
        if let Err(e) = check_name(name) {
            log::warn!("{}", e);
            return None;
        }
        let text = match self.kv.get(&slot_key(&self.namespace, name)) {
            Ok(text) => text?,
            Err(e) => {
                log::warn!("Failed to read slot '{}': {}", name, e);
                return None;
            }
        };
        let envelope: SlotEnvelope = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(e) => {
                log::warn!("Slot '{}' is not a valid envelope: {}", name, e);
                return None;
            }
        };

        match payload_checksum(&envelope.payload) {
            Ok(actual) if actual == envelope.checksum => {}
            Ok(actual) => log::warn!(
                "Checksum mismatch for slot '{}': stored {}, computed {}",
                name,
                envelope.checksum,
                actual
            ),
            Err(e) => log::warn!("Cannot checksum slot '{}': {}", name, e),
        }

        let version = envelope.payload.get("version").and_then(Value::as_u64);
        if version != Some(u64::from(PROJECT_VERSION)) {
            log::warn!("Slot '{}' has unsupported version {:?}", name, version);
            return None;
        }

        serde_json::from_value(envelope.payload)
            .map_err(|e| log::warn!("Slot '{}' payload is malformed: {}", name, e))
            .ok()
    }

    /// Remove a slot and its index entry. Missing slots are ignored.
    pub fn delete_slot(&self, name: &str) -> PersistResult<()> {
        check_name(name)?;
        let mut index = self.read_index()?;
        let before = index.len();
        index.retain(|n| n != name);
        if index.len() != before {
            self.write_index(&index)?;
        }
        self.kv.remove(&slot_key(&self.namespace, name))?;
        Ok(())
    }

    /// Slot names in the order they were first saved.
    pub fn list_slots(&self) -> Vec<String> {
        self.read_index().unwrap_or_else(|e| {
            log::warn!("Ignoring slot index: {}", e);
            Vec::new()
        })
    }

    fn read_index(&self) -> PersistResult<Vec<String>> {
        let Some(text) = self.kv.get(&slot_index_key(&self.namespace))? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&text).map_err(|e| PersistError::CorruptIndex(e.to_string()))
    }

    fn write_index(&self, index: &[String]) -> PersistResult<()> {
        self.kv
            .set(&slot_index_key(&self.namespace), &serde_json::to_string(index)?)?;
        Ok(())
    }
}
