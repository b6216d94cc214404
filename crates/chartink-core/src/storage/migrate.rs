//! Forward-only schema migrations for persisted state.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::drawing::DEFAULT_LAYER_ID;

/// Schema version written by this build.
pub const CURRENT_SCHEMA_VERSION: u32 = 3;

/// State type of the persisted drawing list.
pub const DRAWINGS_STATE: &str = "drawings";

/// Transform of a state's `data` from one schema version to the next.
pub type MigrationFn = Box<dyn Fn(Value) -> Value>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MigrationError {
    #[error("Invalid state format")]
    InvalidStateFormat,
    #[error("No migration for '{state_type}' from schema version {from}")]
    MissingStep { state_type: String, from: u32 },
    #[error("Schema version {found} is newer than supported version {current}")]
    UnsupportedVersion { found: u32, current: u32 },
}

/// Persisted state tagged with its schema version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedState {
    pub schema_version: u32,
    pub data: Value,
}

impl VersionedState {
    pub fn current(data: Value) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            data,
        }
    }
}

/// Migrations keyed by state type and the version they start from.
pub struct MigrationRegistry {
    current: u32,
    steps: HashMap<(String, u32), MigrationFn>,
}

impl fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut steps: Vec<_> = self.steps.keys().collect();
        steps.sort();
        f.debug_struct("MigrationRegistry")
            .field("current", &self.current)
            .field("steps", &steps)
            .finish()
    }
}

impl Default for MigrationRegistry {
    fn default() -> Self {
        let mut registry = Self::new(CURRENT_SCHEMA_VERSION);
        registry.register(DRAWINGS_STATE, 1, Box::new(drawings_v1_to_v2));
        registry.register(DRAWINGS_STATE, 2, Box::new(drawings_v2_to_v3));
        registry
    }
}

impl MigrationRegistry {
    /// An empty registry targeting `current`.
    pub fn new(current: u32) -> Self {
        Self {
            current,
            steps: HashMap::new(),
        }
    }

    pub fn current_version(&self) -> u32 {
        self.current
    }

    /// Register the step `from -> from + 1`. Returns true if it replaced one.
    pub fn register(&mut self, state_type: &str, from: u32, step: MigrationFn) -> bool {
        self.steps
            .insert((state_type.to_string(), from), step)
            .is_some()
    }

    pub fn has_step(&self, state_type: &str, from: u32) -> bool {
        self.steps.contains_key(&(state_type.to_string(), from))
    }

    /// Bring `state` up to the current schema version.
    ///
    /// `state` must be an object with an integer `schemaVersion` and a `data`
    /// field. The result is a copy carrying the current version.
    pub fn migrate_state(&self, state_type: &str, state: &Value) -> Result<Value, MigrationError> {
        let object = state.as_object().ok_or(MigrationError::InvalidStateFormat)?;
        let version = object
            .get("schemaVersion")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or(MigrationError::InvalidStateFormat)?;
        let mut data = object
            .get("data")
            .cloned()
            .ok_or(MigrationError::InvalidStateFormat)?;

        if version > self.current {
            return Err(MigrationError::UnsupportedVersion {
                found: version,
                current: self.current,
            });
        }
        if version == self.current {
            return Ok(state.clone());
        }

        for from in version..self.current {
            let step = self
                .steps
                .get(&(state_type.to_string(), from))
                .ok_or_else(|| MigrationError::MissingStep {
                    state_type: state_type.to_string(),
                    from,
                })?;
            data = step(data);
            log::debug!("Migrated '{}' from v{} to v{}", state_type, from, from + 1);
        }

        let mut migrated = object.clone();
        migrated.insert("schemaVersion".to_string(), Value::from(self.current));
        migrated.insert("data".to_string(), data);
        Ok(Value::Object(migrated))
    }

    /// Migrate every entry, using the key as state type.
    ///
    /// Entries that fail keep their original value.
    pub fn migrate_all(&self, states: &BTreeMap<String, Value>) -> BTreeMap<String, Value> {
        states
            .iter()
            .map(|(state_type, state)| {
                let value = self.migrate_state(state_type, state).unwrap_or_else(|e| {
                    log::warn!("Keeping '{}' unmigrated: {}", state_type, e);
                    state.clone()
                });
                (state_type.clone(), value)
            })
            .collect()
    }
}

fn map_drawings(data: Value, f: impl Fn(&mut Map<String, Value>)) -> Value {
    match data {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|mut item| {
                    if let Value::Object(fields) = &mut item {
                        f(fields);
                    }
                    item
                })
                .collect(),
        ),
        other => other,
    }
}

/// v1 kept the layer under `layer`.
fn drawings_v1_to_v2(data: Value) -> Value {
    map_drawings(data, |fields| {
        let layer = fields
            .remove("layer")
            .filter(Value::is_string)
            .unwrap_or_else(|| Value::from(DEFAULT_LAYER_ID));
        fields.entry("layerId").or_insert(layer);
    })
}

/// v3 added lock and visibility flags.
fn drawings_v2_to_v3(data: Value) -> Value {
    map_drawings(data, |fields| {
        fields.entry("locked").or_insert(Value::Bool(false));
        fields.entry("hidden").or_insert(Value::Bool(false));
    })
}
