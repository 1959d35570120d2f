//! Shared test fixtures for catalogs and preset stores.
//!
//! Used by the service and API test modules to avoid duplication.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::catalog::{CatalogEntry, CatalogPort, JsonCatalog};
use crate::presets::{MemoryPresets, PresetError, PresetPort};

/// Small tree: a `News` directory (id 0) with one station (id 1), a root
/// station `Jazz` (id 2) and an empty directory (id 3).
pub const SAMPLE_STATIONS: &str = r#"[
    {"dirName": "News", "children": [
        {"stationName": "DLF", "stationDescription": "Deutschlandfunk",
         "stationUrl": "http://dlf.example/stream.mp3"}
    ]},
    {"stationName": "Jazz", "stationUrl": "http://jazz.example/stream"},
    {"dirName": "Empty"}
]"#;

/// Parses [`SAMPLE_STATIONS`].
pub fn sample_catalog() -> JsonCatalog {
    JsonCatalog::from_json(SAMPLE_STATIONS.as_bytes()).unwrap()
}

/// Catalog with `count` root stations named `Station <n>`.
pub fn flat_catalog(count: usize) -> JsonCatalog {
    let nodes: Vec<_> = (0..count)
        .map(|i| {
            serde_json::json!({
                "stationName": format!("Station {i}"),
                "stationUrl": format!("http://upstream.example/{i}"),
            })
        })
        .collect();
    JsonCatalog::from_json(serde_json::to_string(&nodes).unwrap().as_bytes()).unwrap()
}

/// Catalog with a single root station pointing at `url` (id `"0"`).
pub fn single_station_catalog(url: &str) -> JsonCatalog {
    let nodes = serde_json::json!([{ "stationName": "Upstream", "stationUrl": url }]);
    JsonCatalog::from_json(nodes.to_string().as_bytes()).unwrap()
}

/// Catalog wrapper counting `entry_by_id` and `entry_at` calls.
pub struct CountingCatalog<C> {
    inner: C,
    by_id_calls: AtomicUsize,
    at_calls: AtomicUsize,
}

impl<C: CatalogPort> CountingCatalog<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            by_id_calls: AtomicUsize::new(0),
            at_calls: AtomicUsize::new(0),
        }
    }

    pub fn by_id_calls(&self) -> usize {
        self.by_id_calls.load(Ordering::SeqCst)
    }

    pub fn at_calls(&self) -> usize {
        self.at_calls.load(Ordering::SeqCst)
    }
}

impl<C: CatalogPort> CatalogPort for CountingCatalog<C> {
    fn count(&self, parent: Option<&str>) -> usize {
        self.inner.count(parent)
    }

    fn entry_at(&self, parent: Option<&str>, index: usize) -> Option<(CatalogEntry, String)> {
        self.at_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.entry_at(parent, index)
    }

    fn entry_by_id(&self, id: &str) -> Option<(CatalogEntry, String)> {
        self.by_id_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.entry_by_id(id)
    }
}

/// Preset store recording every `put` and optionally failing it.
#[derive(Default)]
pub struct RecordingPresets {
    inner: MemoryPresets,
    puts: Mutex<Vec<(String, String)>>,
    fail_writes: bool,
}

impl RecordingPresets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Default::default()
        }
    }

    pub fn puts(&self) -> Vec<(String, String)> {
        self.puts.lock().clone()
    }
}

impl PresetPort for RecordingPresets {
    fn put(&self, key: &str, station_id: &str) -> Result<(), PresetError> {
        self.puts
            .lock()
            .push((key.to_string(), station_id.to_string()));
        if self.fail_writes {
            return Err(PresetError::Io(std::io::Error::other("disk full")));
        }
        self.inner.put(key, station_id)
    }

    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }
}
