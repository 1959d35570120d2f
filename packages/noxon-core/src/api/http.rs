//! HTTP route handlers.
//!
//! All handlers are thin - they delegate to services for business logic.
//! Every request passes the access gate middleware first.

use std::time::Instant;

use axum::{
    extract::{Query, Request, State},
    http::HeaderMap,
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::api::status::{render_status_page, HEALTH_PAGE};
use crate::api::AppState;
use crate::context::{DeviceInfo, RequestContext};
use crate::error::{NoxonError, NoxonResult};
use crate::protocol::ListOfItems;
use crate::protocol_constants::{HEALTH_PATH, LOGIN_PATH, PLAYBACK_PATH, STATUS_PATH};
use crate::services::browse_service::{LoginParams, LoginReply, PresetParams, SearchParams};
use crate::services::playback_relay::PlaybackParams;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Creates the Axum router with the fixed routes plus every configured
/// vendor endpoint path.
pub fn create_router(state: AppState) -> Router {
    let endpoints = state.config.endpoints.clone();

    let mut router = Router::new()
        .route(LOGIN_PATH, get(handle_login))
        .route(PLAYBACK_PATH, get(handle_playback))
        .route(HEALTH_PATH, get(health_check))
        .route(STATUS_PATH, get(status_page));

    for path in &endpoints.login {
        router = router.route(path, get(handle_login));
    }
    for path in &endpoints.search {
        router = router.route(path, get(handle_search));
    }
    for path in &endpoints.get_preset {
        router = router.route(path, get(handle_get_preset));
    }
    for path in &endpoints.add_preset {
        router = router.route(path, get(handle_add_preset));
    }

    router
        .layer(middleware::from_fn_with_state(state.clone(), access_gate))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Middleware
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TokenQuery {
    token: Option<String>,
}

/// Rejects requests the access gate denies with a bare 401.
///
/// Denials are logged at info level through [`NoxonError::Unauthorized`].
async fn access_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let device = Query::<DeviceInfo>::try_from_uri(request.uri())
        .map(|Query(device)| device)
        .unwrap_or_default();
    let token = Query::<TokenQuery>::try_from_uri(request.uri())
        .map(|Query(query)| query.token)
        .unwrap_or_default();

    let decision = state
        .gate
        .decide(request.uri().path(), &device.mac, token.as_deref());
    if decision.is_allowed() {
        next.run(request).await
    } else {
        NoxonError::Unauthorized(format!("{} on {}", device, request.uri().path()))
            .into_response()
    }
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    log::debug!(
        "[Http] {} {} -> {} ({} ms)",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Liveness probe. Always allowed by the access gate.
async fn health_check() -> Html<&'static str> {
    Html(HEALTH_PAGE)
}

async fn status_page(State(state): State<AppState>) -> Html<String> {
    let snapshot = state.sessions.snapshot();
    Html(render_status_page(&snapshot, state.clock.now_millis()))
}

async fn handle_login(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(params): Query<LoginParams>,
) -> NoxonResult<LoginReply> {
    state.browse.login(&ctx, &params)
}

async fn handle_search(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(params): Query<SearchParams>,
) -> NoxonResult<ListOfItems> {
    state.browse.search(&ctx, &params)
}

async fn handle_get_preset(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(params): Query<PresetParams>,
) -> ListOfItems {
    state.browse.get_preset(&ctx, &params)
}

async fn handle_add_preset(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(params): Query<PresetParams>,
) -> ListOfItems {
    state.browse.add_preset(&ctx, &params)
}

/// Relays a station stream. The response body keeps streaming after the
/// handler returns.
async fn handle_playback(
    State(state): State<AppState>,
    ctx: RequestContext,
    headers: HeaderMap,
    Query(params): Query<PlaybackParams>,
) -> NoxonResult<Response> {
    state.relay.play(&ctx, &params, &headers).await
}
