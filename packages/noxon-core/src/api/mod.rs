//! HTTP API layer.
//!
//! This module contains thin handlers that delegate to services.
//! It provides the router construction and server startup functionality.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::bootstrap::BootstrappedServices;
use crate::protocol_constants::FALLBACK_PORT_RANGE;
use crate::services::{AccessGate, BrowseService, PlaybackRelay, PlaybackSessionStore};
use crate::state::Config;
use crate::utils::Clock;

pub mod http;
pub mod status;

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to a TCP port.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),

    /// No available ports in the specified range.
    #[error("No available ports in range {start}-{end}")]
    NoAvailablePort { start: u16, end: u16 },
}

/// Shared application state for the API layer.
///
/// This is a thin wrapper that holds references to services.
/// All business logic lives in the services themselves.
#[derive(Clone)]
pub struct AppState {
    /// Validated configuration.
    pub config: Arc<Config>,
    /// Shared playback/cache/history store (read by `/status`).
    pub sessions: Arc<PlaybackSessionStore>,
    /// MAC-based access decision.
    pub gate: Arc<AccessGate>,
    /// Login/browse, search and preset handlers.
    pub browse: Arc<BrowseService>,
    /// Playback reverse proxy.
    pub relay: Arc<PlaybackRelay>,
    /// Time source for the status page.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Creates the API state from bootstrapped services.
    pub fn new(services: &BootstrappedServices) -> Self {
        Self {
            config: Arc::clone(&services.config),
            sessions: Arc::clone(&services.sessions),
            gate: Arc::clone(&services.gate),
            browse: Arc::clone(&services.browse),
            relay: Arc::clone(&services.relay),
            clock: Arc::clone(&services.clock),
        }
    }
}

async fn find_available_port(start: u16, end: u16) -> Result<(u16, TcpListener), ServerError> {
    for port in start..=end {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        match TcpListener::bind(&addr).await {
            Ok(listener) => return Ok((port, listener)),
            Err(_) => continue,
        }
    }
    Err(ServerError::NoAvailablePort { start, end })
}

/// Binds the configured port, or the first free port of the fallback range
/// when the configured port is 0.
pub async fn bind_listener(preferred_port: u16) -> Result<(u16, TcpListener), ServerError> {
    if preferred_port > 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], preferred_port));
        Ok((preferred_port, TcpListener::bind(&addr).await?))
    } else {
        let (start, end) = FALLBACK_PORT_RANGE;
        find_available_port(start, end).await
    }
}

/// Starts the HTTP server on the configured or auto-discovered port.
pub async fn start_server(state: AppState) -> Result<(), ServerError> {
    let (port, listener) = bind_listener(state.config.preferred_port).await?;
    log::info!("[Server] Listening on http://0.0.0.0:{}", port);
    serve(listener, state).await
}

/// Serves the API on an already bound listener.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), ServerError> {
    let app = http::create_router(state);
    axum::serve(listener, app).await?;
    Ok(())
}
