//! Station catalog port.
//!
//! The catalog is a read-only tree of directories and stations. Handlers
//! depend on the [`CatalogPort`] trait rather than a concrete store; the
//! server binary injects [`JsonCatalog`] (or [`NullCatalog`] when no
//! stations file exists).

mod json;

pub use json::JsonCatalog;

use thiserror::Error;

use crate::protocol_constants::DEFAULT_STATION_MIME;

/// A catalog node as seen by the protocol handlers.
///
/// The identifier is returned alongside the entry by every port method
/// rather than stored in it, so the catalog owns identifier assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEntry {
    /// Browsable directory.
    Directory {
        /// Display title.
        title: String,
    },
    /// Playable station.
    Station(StationEntry),
}

/// Station fields exposed to devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationEntry {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Upstream stream URL the relay proxies.
    pub url: String,
    /// Stream format label (often empty).
    pub format: String,
    /// Bandwidth label, e.g. `128` (often empty).
    pub bandwidth: String,
    /// MIME label, e.g. `MP3`.
    pub mime: String,
}

impl StationEntry {
    /// Creates a station with the default MIME label and empty format/bandwidth.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            url: url.into(),
            format: String::new(),
            bandwidth: String::new(),
            mime: DEFAULT_STATION_MIME.to_string(),
        }
    }
}

impl CatalogEntry {
    /// Convenience constructor for a directory.
    pub fn directory(title: impl Into<String>) -> Self {
        Self::Directory {
            title: title.into(),
        }
    }

    /// Returns the station fields if this entry is a station.
    #[must_use]
    pub fn as_station(&self) -> Option<&StationEntry> {
        match self {
            Self::Station(station) => Some(station),
            Self::Directory { .. } => None,
        }
    }
}

/// Read access to the station catalog.
///
/// Implementations must be safe for concurrent reads from many requests.
/// Lookups never panic: unknown parents count as empty and out-of-range
/// indices yield `None`.
pub trait CatalogPort: Send + Sync {
    /// Number of children of `parent` (`None` = root).
    fn count(&self, parent: Option<&str>) -> usize;

    /// Child `index` (0-based) of `parent` with its identifier.
    fn entry_at(&self, parent: Option<&str>, index: usize) -> Option<(CatalogEntry, String)>;

    /// Entry with the given identifier.
    fn entry_by_id(&self, id: &str) -> Option<(CatalogEntry, String)>;
}

/// Catalog with no entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCatalog;

impl CatalogPort for NullCatalog {
    fn count(&self, _parent: Option<&str>) -> usize {
        0
    }

    fn entry_at(&self, _parent: Option<&str>, _index: usize) -> Option<(CatalogEntry, String)> {
        None
    }

    fn entry_by_id(&self, _id: &str) -> Option<(CatalogEntry, String)> {
        None
    }
}

/// Errors that can occur while loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Catalog file could not be read.
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    /// Catalog file is not valid JSON of the expected shape.
    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
}
