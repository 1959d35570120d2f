//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.
//! List-valued variables are comma-separated (MAC addresses contain `:`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use noxon_core::EndpointConfig;
use serde::Deserialize;

/// DNS responder configuration.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DnsConfig {
    /// Start the DNS responder.
    /// Override: `NOXON_DNS_ENABLED`
    pub enabled: bool,

    /// IP address returned for the vendor domains (this server).
    /// Override: `NOXON_DNS_HOST_IP`
    pub host_ip: String,

    /// Vendor domains redirected to `host_ip`.
    /// Override: `NOXON_DNS_DOMAINS`
    pub domains: Vec<String>,

    /// Host whose addresses answer the radio's NTP-check domain.
    /// Override: `NOXON_DNS_NTP_HOST`
    pub ntp_host: String,

    /// UDP port of the responder.
    /// Override: `NOXON_DNS_PORT`
    pub port: u16,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host_ip: String::new(),
            domains: vec!["noxonserver.eu".to_string(), "vtuner.com".to_string()],
            ntp_host: "de.pool.ntp.org".to_string(),
            port: 53,
        }
    }
}

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to bind the HTTP server to (0 = scan for a free port).
    /// Override: `NOXON_BIND_PORT`
    pub bind_port: u16,

    /// Device MACs allowed to use the server.
    /// Override: `NOXON_WHITELIST`
    pub whitelist: Vec<String>,

    /// Device MACs refused by the server.
    /// Override: `NOXON_BLACKLIST`
    pub blacklist: Vec<String>,

    /// Make blacklist matches deny even whitelisted devices.
    pub blacklist_enforced: bool,

    /// Vendor endpoint paths.
    /// Overrides: `NOXON_ENDPOINTS_LOGIN`, `NOXON_ENDPOINTS_SEARCH`,
    /// `NOXON_ENDPOINTS_GET_PRESET`, `NOXON_ENDPOINTS_ADD_PRESET`
    pub endpoints: EndpointConfig,

    /// Station catalog file.
    /// Override: `NOXON_STATIONS_FILE`
    pub stations_file: PathBuf,

    /// Preset file; empty keeps presets in memory only.
    /// Override: `NOXON_PRESETS_FILE`
    pub presets_file: String,

    /// Resolved stream URLs older than this are re-read from the catalog.
    pub resolve_ttl_secs: u64,

    /// Connect timeout for upstream stream servers.
    pub upstream_connect_timeout_secs: u64,

    /// DNS responder settings.
    pub dns: DnsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let core = noxon_core::Config::default();
        Self {
            bind_port: core.preferred_port,
            whitelist: core.whitelist,
            blacklist: core.blacklist,
            blacklist_enforced: core.blacklist_enforced,
            endpoints: core.endpoints,
            stations_file: PathBuf::from("stations.json"),
            presets_file: "presets.json".to_string(),
            resolve_ttl_secs: core.resolve_ttl_secs,
            upstream_connect_timeout_secs: core.upstream_connect_timeout_secs,
            dns: DnsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies environment variable overrides using `lookup` to read them.
    ///
    /// Empty values are ignored.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = var("NOXON_BIND_PORT").and_then(|v| v.trim().parse().ok()) {
            self.bind_port = port;
        }
        if let Some(list) = var("NOXON_WHITELIST") {
            self.whitelist = split_list(&list);
        }
        if let Some(list) = var("NOXON_BLACKLIST") {
            self.blacklist = split_list(&list);
        }
        if let Some(list) = var("NOXON_ENDPOINTS_LOGIN") {
            self.endpoints.login = split_list(&list);
        }
        if let Some(list) = var("NOXON_ENDPOINTS_SEARCH") {
            self.endpoints.search = split_list(&list);
        }
        if let Some(list) = var("NOXON_ENDPOINTS_GET_PRESET") {
            self.endpoints.get_preset = split_list(&list);
        }
        if let Some(list) = var("NOXON_ENDPOINTS_ADD_PRESET") {
            self.endpoints.add_preset = split_list(&list);
        }
        if let Some(file) = var("NOXON_STATIONS_FILE") {
            self.stations_file = PathBuf::from(file);
        }
        // An explicitly empty value selects the in-memory store.
        if let Some(file) = lookup("NOXON_PRESETS_FILE") {
            self.presets_file = file.trim().to_string();
        }
        if let Some(enabled) = var("NOXON_DNS_ENABLED") {
            self.dns.enabled = !enabled.trim().eq_ignore_ascii_case("false");
        }
        if let Some(ip) = var("NOXON_DNS_HOST_IP") {
            self.dns.host_ip = ip.trim().to_string();
        }
        if let Some(list) = var("NOXON_DNS_DOMAINS") {
            self.dns.domains = split_list(&list);
        }
        if let Some(host) = var("NOXON_DNS_NTP_HOST") {
            self.dns.ntp_host = host.trim().to_string();
        }
        if let Some(port) = var("NOXON_DNS_PORT").and_then(|v| v.trim().parse().ok()) {
            self.dns.port = port;
        }
    }

    /// Preset file path, or `None` for the in-memory store.
    pub fn presets_path(&self) -> Option<PathBuf> {
        let trimmed = self.presets_file.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }

    /// Converts to noxon-core's Config type.
    pub fn to_core_config(&self) -> noxon_core::Config {
        noxon_core::Config {
            preferred_port: self.bind_port,
            whitelist: self.whitelist.clone(),
            blacklist: self.blacklist.clone(),
            blacklist_enforced: self.blacklist_enforced,
            endpoints: self.endpoints.clone(),
            resolve_ttl_secs: self.resolve_ttl_secs,
            upstream_connect_timeout_secs: self.upstream_connect_timeout_secs,
        }
    }
}

/// Splits a comma-separated list, dropping blank entries.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
