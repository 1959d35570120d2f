//! General utilities shared across the application.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;

// ─────────────────────────────────────────────────────────────────────────────
// Time Utilities
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the current Unix timestamp in milliseconds.
///
/// Returns 0 if the system clock is before the Unix epoch (shouldn't happen in practice).
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Source of wall-clock time for cache staleness and session start times.
///
/// Injected into the relay so TTL behavior can be tested without sleeping.
pub trait Clock: Send + Sync {
    /// Returns the current Unix timestamp in milliseconds.
    fn now_millis(&self) -> u64;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Creates a new `SystemClock` wrapped in an Arc.
    #[must_use]
    pub fn arc() -> Arc<dyn Clock> {
        Arc::new(Self)
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        now_millis()
    }
}

/// Manually advanced clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    /// Creates a clock frozen at the given timestamp.
    #[must_use]
    pub fn starting_at(millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(millis),
        }
    }

    /// Moves the clock forward.
    pub fn advance_secs(&self, secs: u64) {
        self.millis.fetch_add(secs * 1000, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Identifier Encoding
// ─────────────────────────────────────────────────────────────────────────────

/// Encodes a catalog identifier for use in URLs (URL-safe base64, padded).
#[must_use]
pub fn encode_id(id: &str) -> String {
    URL_SAFE.encode(id.as_bytes())
}

/// Decodes an identifier produced by [`encode_id`].
///
/// Returns `None` for malformed base64 or for bytes that are not valid UTF-8.
#[must_use]
pub fn decode_id(encoded: &str) -> Option<String> {
    let bytes = URL_SAFE.decode(encoded.as_bytes()).ok()?;
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_ids_round_trip() {
        for id in ["0", "42", "1337", "dir/with spaces", "ümlaut", ""] {
            assert_eq!(decode_id(&encode_id(id)).as_deref(), Some(id));
        }
    }

    #[test]
    fn encoded_ids_are_url_safe() {
        // "??>" encodes to "Pz8-" in the URL-safe alphabet ("Pz8+" in standard)
        assert_eq!(encode_id("??>"), "Pz8-");
        assert!(!encode_id("???").contains('/'));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert_eq!(decode_id("not base64!"), None);
        assert_eq!(decode_id("Zg"), None); // missing padding
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::starting_at(1_000);
        clock.advance_secs(60);
        assert_eq!(clock.now_millis(), 61_000);
    }
}
