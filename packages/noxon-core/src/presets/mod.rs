//! Preset persistence port.
//!
//! A preset maps `(device MAC, slot)` to a station identifier. The protocol
//! handlers only see [`PresetPort`]; the server binary chooses between the
//! file-backed [`JsonPresets`] and the volatile [`MemoryPresets`].

mod json;

pub use json::JsonPresets;

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;

/// Builds the store key for a device's preset slot.
#[must_use]
pub fn preset_key(mac: &str, slot: &str) -> String {
    format!("{mac}-{slot}")
}

/// Errors returned when a preset cannot be persisted.
#[derive(Debug, Error)]
pub enum PresetError {
    /// Writing the backing file failed.
    #[error("Failed to write presets: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing the preset map failed.
    #[error("Failed to serialize presets: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Key/value store for presets.
pub trait PresetPort: Send + Sync {
    /// Stores `station_id` under `key`.
    fn put(&self, key: &str, station_id: &str) -> Result<(), PresetError>;

    /// Returns the station stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;
}

/// Volatile preset store; presets are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryPresets {
    presets: RwLock<HashMap<String, String>>,
}

impl MemoryPresets {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PresetPort for MemoryPresets {
    fn put(&self, key: &str, station_id: &str) -> Result<(), PresetError> {
        self.presets
            .write()
            .insert(key.to_string(), station_id.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Option<String> {
        self.presets.read().get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_key_joins_mac_and_slot() {
        assert_eq!(preset_key("0011AABB", "3"), "0011AABB-3");
        assert_eq!(preset_key("", "1"), "-1");
    }

    #[test]
    fn memory_presets_store_and_overwrite() {
        let presets = MemoryPresets::new();
        assert_eq!(presets.get("a-1"), None);
        presets.put("a-1", "7").unwrap();
        presets.put("a-1", "9").unwrap();
        assert_eq!(presets.get("a-1").as_deref(), Some("9"));
        assert_eq!(presets.get("b-1"), None);
    }
}
