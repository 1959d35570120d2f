//! Login/browse, search and preset handlers.
//!
//! Translates catalog queries into `ListOfItems` envelopes. Handlers are
//! plain methods on [`BrowseService`] so they can be exercised without HTTP;
//! the axum layer only extracts parameters and forwards.

use std::ops::Range;
use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;
use serde::Deserialize;

use crate::catalog::CatalogPort;
use crate::context::RequestContext;
use crate::error::{NoxonError, NoxonResult};
use crate::presets::{preset_key, PresetPort};
use crate::protocol::{ListOfItems, LoginToken, WireItem};
use crate::protocol_constants::{
    DEFAULT_PAGE_SIZE, MSG_NO_STATIONS, MSG_PRESET_NOT_SET, MSG_PRESET_NO_PLAYBACK,
    MSG_PRESET_SAVED, MSG_PRESET_SAVE_FAILED,
};
use crate::services::playback_session_store::PlaybackSessionStore;
use crate::utils::decode_id;

// ─────────────────────────────────────────────────────────────────────────────
// Request Parameters
// ─────────────────────────────────────────────────────────────────────────────

/// Query parameters of the login/browse endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginParams {
    pub token: Option<String>,
    /// Base64 identifier of the directory to browse.
    pub gofile: Option<String>,
    /// First item, 1-based inclusive.
    pub startitems: Option<String>,
    /// Last item, 1-based inclusive.
    pub enditems: Option<String>,
}

/// Query parameters of the search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// Base64 identifier of the item to resolve.
    #[serde(rename = "Search")]
    pub search: Option<String>,
}

/// Query parameters of the preset endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PresetParams {
    /// Preset slot.
    pub id: Option<String>,
}

/// Returns the parameter value if present and non-empty.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

// ─────────────────────────────────────────────────────────────────────────────
// Pagination
// ─────────────────────────────────────────────────────────────────────────────

/// Requested page, converted from the wire's 1-based inclusive indices to
/// 0-based inclusive indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    first: i64,
    last: i64,
}

impl Page {
    /// Parses `startitems`/`enditems`. A missing `enditems` selects a
    /// 100-item window starting at `startitems`.
    pub fn from_wire(start: Option<&str>, end: Option<&str>) -> NoxonResult<Self> {
        let first = parse_index("startitems", start)?.unwrap_or(1);
        let last = parse_index("enditems", end)?
            .unwrap_or_else(|| first.saturating_add(DEFAULT_PAGE_SIZE - 1));
        Ok(Self {
            first: first.saturating_sub(1),
            last: last.saturating_sub(1),
        })
    }

    /// Clamps the page to a parent with `count` children.
    ///
    /// The end is `min(last + 1, count)`, so indices outside the range never
    /// reach the catalog.
    #[must_use]
    pub fn range(&self, count: usize) -> Range<usize> {
        let count = i64::try_from(count).unwrap_or(i64::MAX);
        let end = self.last.saturating_add(1).min(count).max(0);
        let start = self.first.max(0).min(end);
        usize::try_from(start).unwrap_or(0)..usize::try_from(end).unwrap_or(0)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            first: 0,
            last: DEFAULT_PAGE_SIZE - 1,
        }
    }
}

fn parse_index(name: &str, value: Option<&str>) -> NoxonResult<Option<i64>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<i64>()
            .map(Some)
            .map_err(|_| NoxonError::InvalidRequest(format!("{name} is not a number: {raw}"))),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Responses
// ─────────────────────────────────────────────────────────────────────────────

/// Reply of the login/browse endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginReply {
    /// Authentication acknowledgment.
    Token(LoginToken),
    /// Menu listing.
    Items(ListOfItems),
}

impl IntoResponse for LoginReply {
    fn into_response(self) -> Response {
        match self {
            Self::Token(token) => token.into_response(),
            Self::Items(items) => items.into_response(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Service
// ─────────────────────────────────────────────────────────────────────────────

/// Protocol handlers for login/browse, search, get-preset and add-preset.
pub struct BrowseService {
    catalog: Arc<dyn CatalogPort>,
    presets: Arc<dyn PresetPort>,
    /// Serializes preset access; separate from the session lock since
    /// preset writes may hit the disk.
    preset_lock: Mutex<()>,
    sessions: Arc<PlaybackSessionStore>,
}

impl BrowseService {
    pub fn new(
        catalog: Arc<dyn CatalogPort>,
        presets: Arc<dyn PresetPort>,
        sessions: Arc<PlaybackSessionStore>,
    ) -> Self {
        Self {
            catalog,
            presets,
            preset_lock: Mutex::new(()),
            sessions,
        }
    }

    /// Login acknowledgment, root menu, or directory listing.
    pub fn login(&self, ctx: &RequestContext, params: &LoginParams) -> NoxonResult<LoginReply> {
        if non_empty(&params.token).is_some() {
            log::debug!("[Browse] Login request from {}", ctx.device);
            return Ok(LoginReply::Token(LoginToken));
        }

        let page = Page::from_wire(params.startitems.as_deref(), params.enditems.as_deref())?;

        let Some(gofile) = non_empty(&params.gofile) else {
            log::debug!("[Browse] Root menu request from {}", ctx.device);
            if self.catalog.count(None) == 0 {
                return Ok(LoginReply::Items(ListOfItems::message(MSG_NO_STATIONS)));
            }
            return Ok(LoginReply::Items(self.collect(ctx, None, page)));
        };

        let parent = decode_param("gofile", gofile)?;
        log::debug!(
            "[Browse] Submenu request for parent {} ({:?}) from {}",
            parent,
            page,
            ctx.device
        );
        Ok(LoginReply::Items(self.collect(ctx, Some(&parent), page)))
    }

    /// Resolves a single catalog item.
    pub fn search(&self, ctx: &RequestContext, params: &SearchParams) -> NoxonResult<ListOfItems> {
        let encoded = non_empty(&params.search)
            .ok_or_else(|| NoxonError::InvalidRequest("missing Search parameter".to_string()))?;
        let id = decode_param("Search", encoded)?;
        log::debug!("[Browse] Search request for {} from {}", id, ctx.device);

        let (entry, id) = self
            .catalog
            .entry_by_id(&id)
            .ok_or_else(|| NoxonError::NotFound(format!("item {id}")))?;
        Ok(ListOfItems::single(WireItem::build(
            &entry,
            &id,
            &ctx.url_builder(),
        )))
    }

    /// Recalls the station stored in a preset slot.
    pub fn get_preset(&self, ctx: &RequestContext, params: &PresetParams) -> ListOfItems {
        let Some(slot) = non_empty(&params.id) else {
            return ListOfItems::message(MSG_PRESET_NOT_SET);
        };
        let key = preset_key(&ctx.device.mac, slot);
        let station_id = {
            let _guard = self.preset_lock.lock();
            self.presets.get(&key)
        };

        match station_id.and_then(|id| self.catalog.entry_by_id(&id)) {
            Some((entry, id)) => {
                log::debug!("[Presets] Recalled {} from '{}'", id, key);
                ListOfItems::single(WireItem::build(&entry, &id, &ctx.url_builder()))
            }
            None => {
                log::debug!("[Presets] Preset '{}' not set", key);
                ListOfItems::message(MSG_PRESET_NOT_SET)
            }
        }
    }

    /// Stores the device's current station in a preset slot.
    pub fn add_preset(&self, ctx: &RequestContext, params: &PresetParams) -> ListOfItems {
        let session = self.sessions.active_session(&ctx.device.mac);
        let (Some(slot), Some(session)) = (non_empty(&params.id), session) else {
            log::info!(
                "[Presets] Declined preset without active playback from {}",
                ctx.device
            );
            return ListOfItems::message(MSG_PRESET_NO_PLAYBACK);
        };

        let key = preset_key(&ctx.device.mac, slot);
        log::info!(
            "[Presets] Saving station {} to preset {} for {}",
            session.station_id,
            slot,
            ctx.device
        );
        let result = {
            let _guard = self.preset_lock.lock();
            self.presets.put(&key, &session.station_id)
        };
        match result {
            Ok(()) => ListOfItems::message(MSG_PRESET_SAVED),
            Err(e) => {
                log::error!("[Presets] Could not save preset '{}': {}", key, e);
                ListOfItems::message(MSG_PRESET_SAVE_FAILED)
            }
        }
    }

    /// Builds the clamped page of children of `parent`.
    fn collect(&self, ctx: &RequestContext, parent: Option<&str>, page: Page) -> ListOfItems {
        let count = self.catalog.count(parent);
        let urls = ctx.url_builder();
        let items = page
            .range(count)
            .filter_map(|index| {
                let item = self.catalog.entry_at(parent, index);
                if item.is_none() {
                    log::warn!(
                        "[Browse] Missing entry {} under {:?} (count {})",
                        index,
                        parent,
                        count
                    );
                }
                item
            })
            .map(|(entry, id)| WireItem::build(&entry, &id, &urls))
            .collect();
        ListOfItems::counted(count, items)
    }
}

/// Decodes a base64 identifier parameter.
pub(crate) fn decode_param(name: &str, encoded: &str) -> NoxonResult<String> {
    decode_id(encoded)
        .ok_or_else(|| NoxonError::InvalidRequest(format!("could not decode {name}: {encoded}")))
}
