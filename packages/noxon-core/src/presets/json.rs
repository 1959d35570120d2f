//! File-backed preset store.
//!
//! Presets live in a flat JSON object (`{"<mac>-<slot>": "<stationId>"}`).
//! The whole map is rewritten on every change using a temp file and rename,
//! so a crash mid-write never leaves a truncated file behind.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use super::{PresetError, PresetPort};

/// Preset store persisted to a JSON file.
#[derive(Debug)]
pub struct JsonPresets {
    path: PathBuf,
    presets: RwLock<HashMap<String, String>>,
}

impl JsonPresets {
    /// Opens the store at `path`, loading existing presets.
    ///
    /// A missing or unreadable file starts an empty store (the file is
    /// created on first write). A file that does not parse is logged and
    /// also starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let presets = match std::fs::read_to_string(&path) {
            Ok(contents) if !contents.trim().is_empty() => {
                match serde_json::from_str::<HashMap<String, String>>(&contents) {
                    Ok(map) => {
                        log::info!(
                            "[Presets] Loaded {} preset(s) from {}",
                            map.len(),
                            path.display()
                        );
                        map
                    }
                    Err(e) => {
                        log::error!("[Presets] Could not parse {}: {}", path.display(), e);
                        HashMap::new()
                    }
                }
            }
            Ok(_) => HashMap::new(),
            Err(e) => {
                log::warn!(
                    "[Presets] Could not read {} - will create it when needed: {}",
                    path.display(),
                    e
                );
                HashMap::new()
            }
        };

        Self {
            path,
            presets: RwLock::new(presets),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, presets: &HashMap<String, String>) -> Result<(), PresetError> {
        let contents = serde_json::to_string_pretty(presets)?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, contents)?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl PresetPort for JsonPresets {
    fn put(&self, key: &str, station_id: &str) -> Result<(), PresetError> {
        let mut presets = self.presets.write();
        let previous = presets.insert(key.to_string(), station_id.to_string());
        if let Err(e) = self.save(&presets) {
            // Keep memory and disk in agreement.
            match previous {
                Some(old) => presets.insert(key.to_string(), old),
                None => presets.remove(key),
            };
            log::error!("[Presets] Could not write {}: {}", self.path.display(), e);
            return Err(e);
        }
        log::info!(
            "[Presets] Wrote preset '{}' with stationId '{}'",
            key,
            station_id
        );
        Ok(())
    }

    fn get(&self, key: &str) -> Option<String> {
        let station_id = self.presets.read().get(key).cloned();
        log::debug!(
            "[Presets] Read stationId {:?} from preset '{}'",
            station_id,
            key
        );
        station_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.json");

        let presets = JsonPresets::open(&path);
        assert_eq!(presets.path(), path.as_path());
        assert_eq!(presets.get("AABB-1"), None);
        presets.put("AABB-1", "42").unwrap();

        let reopened = JsonPresets::open(&path);
        assert_eq!(reopened.get("AABB-1").as_deref(), Some("42"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn garbage_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.json");
        std::fs::write(&path, "[1, 2").unwrap();

        let presets = JsonPresets::open(&path);
        assert_eq!(presets.get("x"), None);
        presets.put("x", "1").unwrap();
        assert_eq!(JsonPresets::open(&path).get("x").as_deref(), Some("1"));
    }

    #[test]
    fn failed_write_is_reported_and_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in place of the file makes the rename fail.
        let path = dir.path().join("presets.json");
        std::fs::create_dir(&path).unwrap();

        let presets = JsonPresets::open(&path);
        assert!(presets.put("AABB-1", "42").is_err());
        assert_eq!(presets.get("AABB-1"), None);
    }
}
