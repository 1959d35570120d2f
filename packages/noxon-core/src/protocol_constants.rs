//! Protocol constants shared across modules.
//!
//! Centralizes fixed endpoint paths, wire strings, and timing values so they
//! are defined in one place and match what the radios expect.

// ─────────────────────────────────────────────────────────────────────────────
// Fixed Endpoints
// ─────────────────────────────────────────────────────────────────────────────

/// Normalized login/browse path. Always registered in addition to the
/// configured vendor login paths; browse URLs handed to devices point here.
pub const LOGIN_PATH: &str = "/login";

/// Playback relay path.
pub const PLAYBACK_PATH: &str = "/playback";

/// Liveness probe path. Always allowed by the access gate.
pub const HEALTH_PATH: &str = "/health";

/// Diagnostics page path.
pub const STATUS_PATH: &str = "/status";

// ─────────────────────────────────────────────────────────────────────────────
// Wire Format
// ─────────────────────────────────────────────────────────────────────────────

/// XML declaration prepended to every `ListOfItems` envelope.
///
/// The radios require this exact declaration even though the body is UTF-8.
pub const XML_DECLARATION: &str =
    r#"<?xml version="1.0" encoding="iso-8859-1" standalone="yes"?>"#;

/// Content type used for envelope responses (what the vendor backend sent).
pub const ENVELOPE_CONTENT_TYPE: &str = "text/html";

/// Fixed token returned for login requests.
///
/// The radio only checks that a token comes back; no cryptography is involved.
pub const LOGIN_TOKEN: &str = "a6703ded78821be5";

/// `ItemCount` value meaning "count not applicable".
pub const ITEM_COUNT_NOT_APPLICABLE: i64 = -1;

/// Default MIME label for stations that do not declare one.
pub const DEFAULT_STATION_MIME: &str = "MP3";

// ─────────────────────────────────────────────────────────────────────────────
// Pagination
// ─────────────────────────────────────────────────────────────────────────────

/// Number of items in a browse page when `enditems` is not supplied.
pub const DEFAULT_PAGE_SIZE: i64 = 100;

// ─────────────────────────────────────────────────────────────────────────────
// Device Messages
// ─────────────────────────────────────────────────────────────────────────────

pub const MSG_NO_STATIONS: &str = "No stations found";
pub const MSG_PRESET_NOT_SET: &str = "Preset not set";
pub const MSG_PRESET_SAVED: &str = "Preset saved";
pub const MSG_PRESET_SAVE_FAILED: &str = "Preset could not be saved";
pub const MSG_PRESET_NO_PLAYBACK: &str = "Preset not created - select a station and try again";

// ─────────────────────────────────────────────────────────────────────────────
// Relay Timing
// ─────────────────────────────────────────────────────────────────────────────

/// Resolved stream URLs older than this are re-read from the catalog (1 hour).
pub const DEFAULT_RESOLVE_TTL_SECS: u64 = 3600;

/// Connect timeout for upstream stream requests.
///
/// There is deliberately no total timeout: live streams never end on their own.
pub const DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Port range scanned when no preferred port is configured.
pub const FALLBACK_PORT_RANGE: (u16, u16) = (8080, 8090);
