//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root - the single place where the
//! session store, the handlers and the relay are instantiated and wired to
//! the catalog and preset ports chosen by the caller.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{redirect, Client};

use crate::catalog::CatalogPort;
use crate::error::{NoxonError, NoxonResult};
use crate::presets::PresetPort;
use crate::services::{AccessGate, BrowseService, PlaybackRelay, PlaybackSessionStore};
use crate::state::Config;
use crate::utils::{Clock, SystemClock};

/// Container for all bootstrapped services.
///
/// Consumed by `AppState` to build the HTTP layer's state.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Validated configuration.
    pub config: Arc<Config>,
    /// Shared playback/cache/history store.
    pub sessions: Arc<PlaybackSessionStore>,
    /// MAC-based access decision.
    pub gate: Arc<AccessGate>,
    /// Login/browse, search and preset handlers.
    pub browse: Arc<BrowseService>,
    /// Playback reverse proxy.
    pub relay: Arc<PlaybackRelay>,
    /// Time source for cache ages and session timestamps.
    pub clock: Arc<dyn Clock>,
}

/// Creates the HTTP client used for upstream streams.
///
/// Redirects are never followed so the relay can absorb them. Only the
/// connect phase has a timeout; a live stream has no natural end.
pub(crate) fn create_http_client(config: &Config) -> reqwest::Result<Client> {
    Client::builder()
        .redirect(redirect::Policy::none())
        .connect_timeout(Duration::from_secs(config.upstream_connect_timeout_secs))
        .build()
}

/// Bootstraps all services with the system clock.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the HTTP client
/// cannot be created.
pub fn bootstrap_services(
    config: Config,
    catalog: Arc<dyn CatalogPort>,
    presets: Arc<dyn PresetPort>,
) -> NoxonResult<BootstrappedServices> {
    bootstrap_services_with_clock(config, catalog, presets, SystemClock::arc())
}

/// Bootstraps all services with an explicit clock.
pub fn bootstrap_services_with_clock(
    config: Config,
    catalog: Arc<dyn CatalogPort>,
    presets: Arc<dyn PresetPort>,
    clock: Arc<dyn Clock>,
) -> NoxonResult<BootstrappedServices> {
    config
        .validate()
        .map_err(|e| NoxonError::Internal(format!("Invalid configuration: {e}")))?;

    let http_client = create_http_client(&config)
        .map_err(|e| NoxonError::Internal(format!("Failed to create HTTP client: {e}")))?;

    let sessions = Arc::new(PlaybackSessionStore::new());
    let gate = Arc::new(AccessGate::new(config.clone()));
    let browse = Arc::new(BrowseService::new(
        Arc::clone(&catalog),
        presets,
        Arc::clone(&sessions),
    ));
    let relay = Arc::new(PlaybackRelay::new(
        catalog,
        Arc::clone(&sessions),
        http_client,
        Arc::clone(&clock),
        &config,
    ));

    Ok(BootstrappedServices {
        config: Arc::new(config),
        sessions,
        gate,
        browse,
        relay,
        clock,
    })
}
