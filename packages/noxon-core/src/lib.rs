//! Noxon Core - emulation of the Noxon internet radio backend.
//!
//! Stands in for the vendor's cloud service so radios can browse a custom
//! station catalog, log in, store and recall presets, and stream through a
//! relaying proxy.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`catalog`]: Station catalog port and the JSON-file adapter
//! - [`presets`]: Preset store port with memory and JSON-file adapters
//! - [`protocol`]: `ListOfItems` wire format and the item builder
//! - [`services`]: Access gate, protocol handlers, playback relay, session store
//! - [`api`]: Axum router, middleware and server startup
//! - [`context`]: Device identity extraction and URL building
//! - [`state`]: Core configuration
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`CatalogPort`](catalog::CatalogPort): read-only station tree
//! - [`PresetPort`](presets::PresetPort): preset key/value store
//! - [`Clock`](utils::Clock): time source for cache ages

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod bootstrap;
pub mod catalog;
pub mod context;
pub mod error;
pub mod presets;
pub mod protocol;
pub mod protocol_constants;
pub mod services;
pub mod state;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_fixtures;

// Re-export commonly used types at the crate root
pub use catalog::{CatalogEntry, CatalogError, CatalogPort, JsonCatalog, NullCatalog, StationEntry};
pub use context::{DeviceInfo, RequestContext, UrlBuilder};
pub use error::{NoxonError, NoxonResult};
pub use presets::{preset_key, JsonPresets, MemoryPresets, PresetError, PresetPort};
pub use protocol::{ListOfItems, LoginToken, WireItem};
pub use state::{Config, EndpointConfig};
pub use utils::{now_millis, Clock, ManualClock, SystemClock};

// Re-export service types
pub use services::{
    AccessDecision, AccessGate, BrowseService, PlaybackRelay, PlaybackSession,
    PlaybackSessionStore, UpstreamOutcome,
};

// Re-export bootstrap types
pub use bootstrap::{bootstrap_services, bootstrap_services_with_clock, BootstrappedServices};

// Re-export API types
pub use api::{bind_listener, serve, start_server, AppState, ServerError};
