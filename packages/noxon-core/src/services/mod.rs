//! Application services layer.
//!
//! This module contains the protocol handlers, the access gate and the
//! playback relay, plus the store they share.

pub mod access_gate;
pub mod browse_service;
pub mod playback_relay;
pub mod playback_session_store;

pub use access_gate::{AccessDecision, AccessGate};
pub use browse_service::BrowseService;
pub use playback_relay::{inspect_upstream, PlaybackRelay, UpstreamOutcome};
pub use playback_session_store::{PlaybackSession, PlaybackSessionStore, StoreSnapshot};
