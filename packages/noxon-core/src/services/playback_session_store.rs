//! Playback session storage shared by the protocol handlers and the relay.
//!
//! Holds the three process-lifetime maps behind one coarse lock:
//! - active playback per device MAC
//! - resolved stream URLs per (MAC, station id)
//! - proxy history (upstream URL -> most recent MAC)
//!
//! Every method takes the lock for a single map operation and returns owned
//! values, so no caller can hold it across an upstream network call.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::Serialize;

/// An active playback of one station on one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSession {
    /// Device MAC (may be empty for anonymous devices).
    pub mac: String,
    /// Catalog identifier of the station being played.
    pub station_id: String,
    /// Upstream URL the relay is proxying.
    pub stream_url: String,
    /// Unix timestamp (ms) when proxying began.
    pub started_at_millis: u64,
    /// Monotonic number distinguishing successive sessions of one device.
    pub session_no: u64,
}

/// Cached resolution of a station to a playable URL for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    /// Currently known stream URL (may differ from the catalog after redirects).
    pub url: String,
    /// Unix timestamp (ms) of the last resolution or redirect.
    pub resolved_at_millis: u64,
}

impl ResolvedUrl {
    /// Returns true if this entry is older than `ttl_millis` at `now_millis`.
    #[must_use]
    pub fn is_stale(&self, now_millis: u64, ttl_millis: u64) -> bool {
        now_millis.saturating_sub(self.resolved_at_millis) > ttl_millis
    }
}

/// Point-in-time copy of the store for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    /// Active sessions, most recently started first.
    pub sessions: Vec<PlaybackSession>,
    /// Proxy history as (upstream URL, last MAC), sorted by URL.
    pub history: Vec<(String, String)>,
}

#[derive(Default)]
struct StoreInner {
    sessions: HashMap<String, PlaybackSession>,
    resolved: HashMap<(String, String), ResolvedUrl>,
    history: HashMap<String, String>,
    last_session_no: u64,
}

/// Concurrency-safe store for playback sessions, resolved URLs and history.
#[derive(Default)]
pub struct PlaybackSessionStore {
    inner: Mutex<StoreInner>,
}

impl PlaybackSessionStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Active sessions
    // ─────────────────────────────────────────────────────────────────────────

    /// Records the start of playback for `mac` and notes `stream_url` in the
    /// proxy history. Replaces any previous session of the same device.
    ///
    /// Returns the new session's number.
    pub fn begin_session(
        &self,
        mac: &str,
        station_id: &str,
        stream_url: &str,
        now_millis: u64,
    ) -> u64 {
        let mut inner = self.inner.lock();
        // Numbered under the lock so numbers follow insertion order.
        inner.last_session_no += 1;
        let session_no = inner.last_session_no;
        let session = PlaybackSession {
            mac: mac.to_string(),
            station_id: station_id.to_string(),
            stream_url: stream_url.to_string(),
            started_at_millis: now_millis,
            session_no,
        };
        if let Some(previous) = inner.sessions.insert(mac.to_string(), session) {
            log::debug!(
                "[Relay] Session #{} for mac={} replaced by #{}",
                previous.session_no,
                mac,
                session_no
            );
        }
        inner
            .history
            .insert(stream_url.to_string(), mac.to_string());
        session_no
    }

    /// Removes the session of `mac` only if it is still session `session_no`.
    ///
    /// A newer session from the same device is left untouched.
    pub fn finish_session(&self, mac: &str, session_no: u64) -> Option<PlaybackSession> {
        let mut inner = self.inner.lock();
        match inner.sessions.get(mac) {
            Some(current) if current.session_no == session_no => inner.sessions.remove(mac),
            _ => None,
        }
    }

    /// Removes the session of `mac` unconditionally.
    ///
    /// Idempotent: removing an absent session is a no-op.
    pub fn end_session(&self, mac: &str) -> Option<PlaybackSession> {
        self.inner.lock().sessions.remove(mac)
    }

    /// Returns the active session of `mac`, if any.
    pub fn active_session(&self, mac: &str) -> Option<PlaybackSession> {
        self.inner.lock().sessions.get(mac).cloned()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resolved URLs
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the cached resolution for (`mac`, `station_id`), stale or not.
    pub fn resolved_url(&self, mac: &str, station_id: &str) -> Option<ResolvedUrl> {
        self.inner
            .lock()
            .resolved
            .get(&(mac.to_string(), station_id.to_string()))
            .cloned()
    }

    /// Stores (or overwrites) the resolution for (`mac`, `station_id`).
    pub fn store_resolved(&self, mac: &str, station_id: &str, url: &str, now_millis: u64) {
        self.inner.lock().resolved.insert(
            (mac.to_string(), station_id.to_string()),
            ResolvedUrl {
                url: url.to_string(),
                resolved_at_millis: now_millis,
            },
        );
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Diagnostics
    // ─────────────────────────────────────────────────────────────────────────

    /// Copies sessions and history for presentation.
    pub fn snapshot(&self) -> StoreSnapshot {
        let (mut sessions, mut history) = {
            let inner = self.inner.lock();
            (
                inner.sessions.values().cloned().collect::<Vec<_>>(),
                inner
                    .history
                    .iter()
                    .map(|(url, mac)| (url.clone(), mac.clone()))
                    .collect::<Vec<_>>(),
            )
        };
        sessions.sort_by(|a, b| {
            b.started_at_millis
                .cmp(&a.started_at_millis)
                .then(b.session_no.cmp(&a.session_no))
        });
        history.sort();
        StoreSnapshot { sessions, history }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_session_overwrites_previous_session_of_device() {
        let store = PlaybackSessionStore::new();
        let first = store.begin_session("AA", "1", "http://a", 10);
        let second = store.begin_session("AA", "2", "http://b", 20);
        assert!(second > first);

        let session = store.active_session("AA").unwrap();
        assert_eq!(session.station_id, "2");
        assert_eq!(session.stream_url, "http://b");
        assert_eq!(store.snapshot().sessions.len(), 1);
    }

    #[test]
    fn concurrent_sessions_of_one_device_keep_the_newest_number() {
        let store = std::sync::Arc::new(PlaybackSessionStore::new());
        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store.begin_session("AA", &worker.to_string(), "http://a", i);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        // The surviving session is the last one inserted, so it holds the
        // highest number handed out.
        assert_eq!(store.active_session("AA").unwrap().session_no, 400);
    }

    #[test]
    fn finish_session_leaves_newer_session_alone() {
        let store = PlaybackSessionStore::new();
        let old = store.begin_session("AA", "1", "http://a", 10);
        let new = store.begin_session("AA", "2", "http://b", 20);

        assert!(store.finish_session("AA", old).is_none());
        assert_eq!(store.active_session("AA").unwrap().session_no, new);

        assert!(store.finish_session("AA", new).is_some());
        assert!(store.active_session("AA").is_none());
    }

    #[test]
    fn end_session_is_idempotent() {
        let store = PlaybackSessionStore::new();
        assert!(store.end_session("AA").is_none());
        store.begin_session("AA", "1", "http://a", 10);
        assert!(store.end_session("AA").is_some());
        assert!(store.end_session("AA").is_none());
        assert!(store.end_session("").is_none());
    }

    #[test]
    fn resolved_urls_are_per_device_and_station() {
        let store = PlaybackSessionStore::new();
        store.store_resolved("AA", "1", "http://a", 100);
        assert_eq!(store.resolved_url("AA", "1").unwrap().url, "http://a");
        assert!(store.resolved_url("BB", "1").is_none());
        assert!(store.resolved_url("AA", "2").is_none());

        store.store_resolved("AA", "1", "http://moved", 200);
        let resolved = store.resolved_url("AA", "1").unwrap();
        assert_eq!(resolved.url, "http://moved");
        assert_eq!(resolved.resolved_at_millis, 200);
    }

    #[test]
    fn staleness_is_strictly_after_ttl() {
        let resolved = ResolvedUrl {
            url: "http://a".into(),
            resolved_at_millis: 1_000,
        };
        assert!(!resolved.is_stale(1_000 + 3_600_000, 3_600_000));
        assert!(resolved.is_stale(1_001 + 3_600_000, 3_600_000));
        // Clock going backwards never marks an entry stale.
        assert!(!resolved.is_stale(0, 3_600_000));
    }

    #[test]
    fn snapshot_orders_sessions_and_history() {
        let store = PlaybackSessionStore::new();
        store.begin_session("AA", "1", "http://b", 10);
        store.begin_session("BB", "2", "http://a", 30);
        store.begin_session("CC", "3", "http://b", 20);

        let snapshot = store.snapshot();
        let macs: Vec<_> = snapshot.sessions.iter().map(|s| s.mac.as_str()).collect();
        assert_eq!(macs, vec!["BB", "CC", "AA"]);
        assert_eq!(
            snapshot.history,
            vec![
                ("http://a".to_string(), "BB".to_string()),
                ("http://b".to_string(), "CC".to_string()),
            ]
        );
    }

    #[test]
    fn history_survives_session_end() {
        let store = PlaybackSessionStore::new();
        store.begin_session("AA", "1", "http://a", 10);
        store.end_session("AA");
        assert_eq!(store.snapshot().history.len(), 1);
        assert!(store.snapshot().sessions.is_empty());
    }
}
