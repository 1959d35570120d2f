//! Playback relay.
//!
//! Resolves a station to a stream URL per device (cached, re-resolved after
//! the TTL), reverse-proxies the stream, and absorbs upstream redirects: the
//! device is sent back to our own playback URL while the cache learns the new
//! location.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderName};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::catalog::CatalogPort;
use crate::context::RequestContext;
use crate::error::{NoxonError, NoxonResult};
use crate::services::browse_service::decode_param;
use crate::services::playback_session_store::PlaybackSessionStore;
use crate::state::Config;
use crate::utils::Clock;

/// Query parameters of the playback endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlaybackParams {
    /// Base64 identifier of the station.
    #[serde(rename = "stationId")]
    pub station_id: Option<String>,
}

/// Result of inspecting an upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamOutcome {
    /// Deliver the response to the device as-is.
    Passthrough,
    /// Upstream redirected; the device must not see this location.
    RedirectTo(String),
}

/// Classifies an upstream response.
///
/// 301/302/307/308 become [`UpstreamOutcome::RedirectTo`]; a redirect without
/// a usable `Location` header is an upstream protocol violation.
pub fn inspect_upstream(status: StatusCode, headers: &HeaderMap) -> NoxonResult<UpstreamOutcome> {
    let is_redirect = matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    );
    if !is_redirect {
        return Ok(UpstreamOutcome::Passthrough);
    }
    headers
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|location| !location.is_empty())
        .map(|location| UpstreamOutcome::RedirectTo(location.to_string()))
        .ok_or_else(|| NoxonError::Upstream(format!("{status} without Location header")))
}

/// Hop-by-hop headers never copied from upstream to the device.
fn is_hop_by_hop(name: &HeaderName) -> bool {
    name == header::CONNECTION || name == header::TRANSFER_ENCODING || name.as_str() == "keep-alive"
}

/// Inbound headers forwarded upstream (everything but `Host`).
fn forward_request_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = inbound.clone();
    headers.remove(header::HOST);
    headers
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Guard
// ─────────────────────────────────────────────────────────────────────────────

/// Ends a playback session when dropped.
///
/// Owned by the streaming body, so it drops when the stream ends, the client
/// disconnects, or the response is abandoned. Removal is conditional on the
/// session number, so an older stream never ends a newer session.
pub(crate) struct SessionGuard {
    sessions: Arc<PlaybackSessionStore>,
    mac: String,
    session_no: u64,
    stream_url: String,
    started: Instant,
    bytes: u64,
    chunks: u64,
    first_error: Option<String>,
}

impl SessionGuard {
    fn new(
        sessions: Arc<PlaybackSessionStore>,
        mac: &str,
        session_no: u64,
        stream_url: &str,
    ) -> Self {
        Self {
            sessions,
            mac: mac.to_string(),
            session_no,
            stream_url: stream_url.to_string(),
            started: Instant::now(),
            bytes: 0,
            chunks: 0,
            first_error: None,
        }
    }

    fn record_chunk(&mut self, len: usize) {
        self.chunks += 1;
        self.bytes += len as u64;
    }

    fn record_error(&mut self, error: &reqwest::Error) {
        if self.first_error.is_none() {
            self.first_error = Some(error.to_string());
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let ended = self.sessions.finish_session(&self.mac, self.session_no);
        let error_suffix = self
            .first_error
            .as_deref()
            .map(|e| format!(", error={e}"))
            .unwrap_or_default();
        log::info!(
            "[Relay] Proxy #{} ended: mac={}, url={}, bytes={}, chunks={}, duration={:.1}s{}{}",
            self.session_no,
            self.mac,
            self.stream_url,
            self.bytes,
            self.chunks,
            self.started.elapsed().as_secs_f64(),
            error_suffix,
            if ended.is_some() { "" } else { " (superseded)" }
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Relay
// ─────────────────────────────────────────────────────────────────────────────

/// Reverse proxy from devices to upstream stream servers.
pub struct PlaybackRelay {
    catalog: Arc<dyn CatalogPort>,
    sessions: Arc<PlaybackSessionStore>,
    client: Client,
    clock: Arc<dyn Clock>,
    resolve_ttl_millis: u64,
}

impl PlaybackRelay {
    /// Creates a relay.
    ///
    /// `client` must not follow redirects, or they never reach the
    /// inspection step.
    pub fn new(
        catalog: Arc<dyn CatalogPort>,
        sessions: Arc<PlaybackSessionStore>,
        client: Client,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        Self {
            catalog,
            sessions,
            client,
            clock,
            resolve_ttl_millis: config.resolve_ttl_millis(),
        }
    }

    /// Returns the stream URL for (`mac`, `station_id`).
    ///
    /// Uses the cached URL unless it is missing or older than the TTL, in
    /// which case the catalog is consulted and the cache overwritten.
    pub fn resolve(&self, mac: &str, station_id: &str) -> NoxonResult<String> {
        let now = self.clock.now_millis();
        if let Some(resolved) = self.sessions.resolved_url(mac, station_id) {
            if !resolved.is_stale(now, self.resolve_ttl_millis) {
                return Ok(resolved.url);
            }
            log::debug!(
                "[Relay] Resolved URL for station {} (mac={}) is stale, reloading",
                station_id,
                mac
            );
        }

        let (entry, _) = self
            .catalog
            .entry_by_id(station_id)
            .ok_or_else(|| NoxonError::NotFound(format!("station {station_id}")))?;
        let station = entry
            .as_station()
            .ok_or_else(|| NoxonError::NotFound(format!("{station_id} is not a station")))?;

        self.sessions
            .store_resolved(mac, station_id, &station.url, now);
        Ok(station.url.clone())
    }

    /// Serves a playback request.
    ///
    /// Returns once upstream response headers arrive; the body keeps
    /// streaming afterwards and ends the session when dropped.
    pub async fn play(
        &self,
        ctx: &RequestContext,
        params: &PlaybackParams,
        inbound_headers: &HeaderMap,
    ) -> NoxonResult<Response> {
        let encoded = params
            .station_id
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| NoxonError::InvalidRequest("missing stationId parameter".to_string()))?;
        let station_id = decode_param("stationId", encoded)?;
        let mac = ctx.device.mac.as_str();
        log::debug!(
            "[Relay] Playback request for station {} from {}",
            station_id,
            ctx.device
        );

        let stream_url = self.resolve(mac, &station_id)?;
        let target = Url::parse(&stream_url).map_err(|e| {
            NoxonError::Internal(format!("invalid stream URL '{stream_url}': {e}"))
        })?;

        let session_no =
            self.sessions
                .begin_session(mac, &station_id, &stream_url, self.clock.now_millis());
        let mut guard = SessionGuard::new(Arc::clone(&self.sessions), mac, session_no, &stream_url);
        log::info!(
            "[Relay] Starting proxy #{} for {} to {}",
            session_no,
            ctx.device,
            target
        );

        let upstream = self
            .client
            .get(target)
            .headers(forward_request_headers(inbound_headers))
            .send()
            .await
            .map_err(|e| NoxonError::Upstream(format!("request to {stream_url} failed: {e}")))?;

        match inspect_upstream(upstream.status(), upstream.headers())? {
            UpstreamOutcome::RedirectTo(location) => {
                let location = upstream
                    .url()
                    .join(&location)
                    .map(String::from)
                    .unwrap_or(location);
                log::info!(
                    "[Relay] Upstream redirected station {} (mac={}) to {}",
                    station_id,
                    mac,
                    location
                );
                self.sessions
                    .store_resolved(mac, &station_id, &location, self.clock.now_millis());
                let own_url = ctx.url_builder().playback_url(&station_id);
                Ok((StatusCode::FOUND, [(header::LOCATION, own_url)]).into_response())
            }
            UpstreamOutcome::Passthrough => {
                let mut builder = Response::builder().status(upstream.status());
                for (name, value) in upstream.headers() {
                    if !is_hop_by_hop(name) {
                        builder = builder.header(name, value);
                    }
                }
                let body = upstream.bytes_stream().map(move |chunk| {
                    match &chunk {
                        Ok(bytes) => guard.record_chunk(bytes.len()),
                        Err(e) => guard.record_error(e),
                    }
                    chunk
                });
                builder
                    .body(Body::from_stream(body))
                    .map_err(|e| NoxonError::Internal(e.to_string()))
            }
        }
    }
}
