//! Catalog loaded from a `stations.json` tree.
//!
//! The file is a JSON array of nodes. A node with `dirName` is a directory,
//! a node with `stationName` is a station; anything else is hidden along
//! with its children. Identifiers are assigned by a depth-first pre-order
//! walk (`"0"`, `"1"`, ...) over every node, hidden ones included, so they
//! stay stable as long as the file does.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::{CatalogEntry, CatalogError, CatalogPort, StationEntry};
use crate::protocol_constants::DEFAULT_STATION_MIME;

/// Raw node as it appears in the JSON file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogNode {
    #[serde(default)]
    dir_name: String,
    #[serde(default)]
    station_name: String,
    #[serde(default)]
    station_description: String,
    #[serde(default)]
    station_url: String,
    #[serde(default)]
    station_format: String,
    #[serde(default)]
    station_bandwidth: String,
    #[serde(default)]
    station_mime: Option<String>,
    #[serde(default)]
    children: Vec<CatalogNode>,
}

impl CatalogNode {
    fn to_entry(&self) -> Option<CatalogEntry> {
        if !self.dir_name.is_empty() {
            Some(CatalogEntry::directory(self.dir_name.clone()))
        } else if !self.station_name.is_empty() {
            Some(CatalogEntry::Station(StationEntry {
                name: self.station_name.clone(),
                description: self.station_description.clone(),
                url: self.station_url.clone(),
                format: self.station_format.clone(),
                bandwidth: self.station_bandwidth.clone(),
                mime: self
                    .station_mime
                    .clone()
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| DEFAULT_STATION_MIME.to_string()),
            }))
        } else {
            None
        }
    }

    /// Number of nodes in this subtree, this node included.
    fn subtree_len(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(CatalogNode::subtree_len)
            .sum::<usize>()
    }
}

/// Flattened node with resolved child positions.
#[derive(Debug)]
struct IndexedNode {
    id: String,
    entry: CatalogEntry,
    children: Vec<usize>,
}

/// In-memory catalog indexed by identifier.
///
/// Immutable after construction, so concurrent reads need no locking.
#[derive(Debug, Default)]
pub struct JsonCatalog {
    nodes: Vec<IndexedNode>,
    roots: Vec<usize>,
    by_id: HashMap<String, usize>,
}

impl JsonCatalog {
    /// Parses a catalog from JSON bytes.
    pub fn from_json(data: &[u8]) -> Result<Self, CatalogError> {
        let tree: Vec<CatalogNode> = serde_json::from_slice(data)?;
        let mut catalog = Self::default();
        let mut next_id = 0;
        catalog.roots = catalog.index_level(&tree, &mut next_id);
        Ok(catalog)
    }

    /// Loads a catalog from a file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let data = std::fs::read(path)?;
        let catalog = Self::from_json(&data)?;
        log::info!(
            "[Catalog] Loaded {} entries ({} at root) from {}",
            catalog.len(),
            catalog.roots.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Loads a catalog from a file, treating a missing file as an empty catalog.
    ///
    /// Parse errors are still returned: serving an empty catalog because of a
    /// typo would silently hide every station.
    pub fn load_or_empty(path: &Path) -> Result<Self, CatalogError> {
        match Self::load(path) {
            Err(CatalogError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::error!(
                    "[Catalog] Stations file {} not found, serving an empty catalog",
                    path.display()
                );
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Total number of entries at all levels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the catalog has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Indexes one level of the tree in pre-order, returning node positions.
    ///
    /// Hidden nodes still consume an identifier for themselves and each
    /// descendant.
    fn index_level(&mut self, level: &[CatalogNode], next_id: &mut usize) -> Vec<usize> {
        let mut positions = Vec::with_capacity(level.len());
        for node in level {
            let Some(entry) = node.to_entry() else {
                log::warn!(
                    "[Catalog] Hiding node {} without dirName or stationName",
                    next_id
                );
                *next_id += node.subtree_len();
                continue;
            };
            let id = next_id.to_string();
            *next_id += 1;
            let position = self.nodes.len();
            self.by_id.insert(id.clone(), position);
            self.nodes.push(IndexedNode {
                id,
                entry,
                children: Vec::new(),
            });
            let children = self.index_level(&node.children, next_id);
            self.nodes[position].children = children;
            positions.push(position);
        }
        positions
    }

    fn children_of(&self, parent: Option<&str>) -> Option<&[usize]> {
        match parent {
            None => Some(&self.roots),
            Some(id) => self
                .by_id
                .get(id)
                .map(|&pos| self.nodes[pos].children.as_slice()),
        }
    }

    fn node(&self, position: usize) -> (CatalogEntry, String) {
        let node = &self.nodes[position];
        (node.entry.clone(), node.id.clone())
    }
}

impl CatalogPort for JsonCatalog {
    fn count(&self, parent: Option<&str>) -> usize {
        self.children_of(parent).map_or(0, <[usize]>::len)
    }

    fn entry_at(&self, parent: Option<&str>, index: usize) -> Option<(CatalogEntry, String)> {
        let children = self.children_of(parent);
        if children.is_none() {
            log::warn!(
                "[Catalog] Could not find parent {:?} for index {}",
                parent,
                index
            );
        }
        children?.get(index).map(|&pos| self.node(pos))
    }

    fn entry_by_id(&self, id: &str) -> Option<(CatalogEntry, String)> {
        self.by_id.get(id).map(|&pos| self.node(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"dirName": "News", "children": [
            {"stationName": "DLF", "stationDescription": "Deutschlandfunk",
             "stationUrl": "https://st01.sslstream.dlf.de/dlf/01/128/mp3/stream.mp3"},
            {"dirName": "Regional", "children": [
                {"stationName": "WDR 5", "stationUrl": "http://wdr.example/wdr5.mp3",
                 "stationMime": "AAC", "stationBandwidth": "96"}
            ]}
        ]},
        {"stationName": "Jazz", "stationUrl": "http://jazz.example/stream"},
        {"children": [
            {"stationName": "Orphan", "stationUrl": "http://orphan.example/stream"}
        ]},
        {"dirName": "Empty"}
    ]"#;

    fn sample() -> JsonCatalog {
        JsonCatalog::from_json(SAMPLE.as_bytes()).unwrap()
    }

    /// Walks every reachable entry and checks entry_by_id returns the same entry.
    fn assert_round_trip(catalog: &JsonCatalog, parent: Option<&str>) -> usize {
        let mut visited = 0;
        for index in 0..catalog.count(parent) {
            let (entry, id) = catalog.entry_at(parent, index).unwrap();
            assert!(!id.is_empty());
            let (again, id_again) = catalog.entry_by_id(&id).unwrap();
            assert_eq!(entry, again);
            assert_eq!(id, id_again);
            visited += 1 + assert_round_trip(catalog, Some(&id));
        }
        visited
    }

    #[test]
    fn every_reachable_entry_round_trips() {
        let catalog = sample();
        assert_eq!(assert_round_trip(&catalog, None), catalog.len());
    }

    #[test]
    fn ids_follow_preorder_and_hidden_nodes_consume_ids() {
        let catalog = sample();
        assert_eq!(catalog.len(), 6);
        assert_eq!(catalog.count(None), 3);

        let (news, id) = catalog.entry_at(None, 0).unwrap();
        assert_eq!(news, CatalogEntry::directory("News"));
        assert_eq!(id, "0");

        let (_, regional_id) = catalog.entry_at(Some("0"), 1).unwrap();
        assert_eq!(regional_id, "2");

        let (wdr, wdr_id) = catalog.entry_at(Some("2"), 0).unwrap();
        assert_eq!(wdr_id, "3");
        let station = wdr.as_station().unwrap();
        assert_eq!(station.mime, "AAC");
        assert_eq!(station.bandwidth, "96");

        let (jazz, jazz_id) = catalog.entry_at(None, 1).unwrap();
        assert_eq!(jazz_id, "4");
        assert_eq!(jazz.as_station().unwrap().mime, "MP3");

        // The untyped node is "5" and its child "6"; both stay hidden.
        let (_, empty_id) = catalog.entry_at(None, 2).unwrap();
        assert_eq!(empty_id, "7");
        assert!(catalog.entry_by_id("5").is_none());
        assert!(catalog.entry_by_id("6").is_none());
    }

    #[test]
    fn out_of_range_and_unknown_parents_do_not_panic() {
        let catalog = sample();
        assert!(catalog.entry_at(None, 99).is_none());
        assert!(catalog.entry_at(Some("nope"), 0).is_none());
        assert_eq!(catalog.count(Some("nope")), 0);
        assert_eq!(catalog.count(Some("7")), 0);
        assert!(catalog.entry_by_id("").is_none());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            JsonCatalog::from_json(b"{not json"),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = JsonCatalog::load_or_empty(&dir.path().join("stations.json")).unwrap();
        assert!(catalog.is_empty());
        assert_eq!(catalog.count(None), 0);
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stations.json");
        std::fs::write(&path, SAMPLE).unwrap();
        let catalog = JsonCatalog::load(&path).unwrap();
        assert_eq!(catalog.len(), 6);
    }
}
