//! Noxon Server - stand-in for the Noxon internet radio backend.
//!
//! Serves the vendor's browse, search and preset endpoints from a local
//! station catalog and relays playback streams. An optional DNS responder
//! points the radios' hard-coded vendor host names at this server.

mod config;
mod dns;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use noxon_core::{
    bootstrap_services, start_server, AppState, CatalogPort, JsonCatalog, JsonPresets,
    MemoryPresets, PresetPort,
};
use tokio::signal;

use crate::config::ServerConfig;
use crate::dns::DnsResponder;

/// Noxon Server - internet radio backend emulator.
#[derive(Parser, Debug)]
#[command(name = "noxon-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "NOXON_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long, env = "NOXON_BIND_PORT")]
    port: Option<u16>,

    /// Station catalog file (overrides config file).
    #[arg(short = 's', long, value_name = "FILE")]
    stations_file: Option<PathBuf>,

    /// Preset file (overrides config file). Empty keeps presets in memory.
    #[arg(long, value_name = "FILE")]
    presets_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Noxon Server v{}", env!("CARGO_PKG_VERSION"));

    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.bind_port = port;
    }
    if let Some(stations_file) = args.stations_file {
        config.stations_file = stations_file;
    }
    if let Some(presets_file) = args.presets_file {
        config.presets_file = presets_file;
    }

    log::info!(
        "Configuration: bind_port={}, whitelist={:?}, blacklist={:?}",
        config.bind_port,
        config.whitelist,
        config.blacklist
    );

    let catalog: Arc<dyn CatalogPort> = Arc::new(
        JsonCatalog::load_or_empty(&config.stations_file).with_context(|| {
            format!(
                "Failed to load stations file {}",
                config.stations_file.display()
            )
        })?,
    );

    let presets: Arc<dyn PresetPort> = match config.presets_path() {
        Some(path) => {
            let store = JsonPresets::open(path);
            log::info!("Storing presets in {}", store.path().display());
            Arc::new(store)
        }
        None => {
            log::info!("No presets file configured - presets will not persist");
            Arc::new(MemoryPresets::new())
        }
    };

    let services = bootstrap_services(config.to_core_config(), catalog, presets)
        .context("Failed to bootstrap services")?;

    log::info!("Services bootstrapped successfully");

    let app_state = AppState::new(&services);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(app_state).await {
            log::error!("Server error: {}", e);
        }
    });

    let dns_handle = if config.dns.enabled {
        let socket = dns::bind(&config.dns).await?;
        let responder = Arc::new(DnsResponder::new(&config.dns));
        Some(tokio::spawn(dns::run(socket, responder)))
    } else {
        log::info!("DNS responder disabled");
        None
    };

    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    server_handle.abort();
    if let Some(handle) = dns_handle {
        handle.abort();
    }

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
