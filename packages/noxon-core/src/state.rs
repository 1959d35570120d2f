//! Core configuration types.
//!
//! [`Config`] is built once at startup and shared read-only afterwards; the
//! server binary assembles it from its YAML file, environment and CLI flags.

use serde::{Deserialize, Serialize};

use crate::protocol_constants::{
    DEFAULT_RESOLVE_TTL_SECS, DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS, HEALTH_PATH, LOGIN_PATH,
    PLAYBACK_PATH, STATUS_PATH,
};

/// Vendor endpoint paths the radios request.
///
/// Different firmware generations use different paths for the same
/// operation, so each operation accepts a list.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct EndpointConfig {
    /// Login/browse paths.
    pub login: Vec<String>,
    /// Search (resolve single item) paths.
    pub search: Vec<String>,
    /// Preset recall paths.
    pub get_preset: Vec<String>,
    /// Preset store paths.
    pub add_preset: Vec<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            login: vec![
                "/setupapp/fs/asp/BrowseXML/loginXML.asp".to_string(),
                "/setupapp/radio567/asp/BrowseXPA/LoginXML.asp".to_string(),
            ],
            search: vec!["/setupapp/fs/asp/BrowseXML/Search.asp".to_string()],
            get_preset: vec!["/Favorites/GetPreset.aspx".to_string()],
            add_preset: vec!["/Favorites/AddPreset.aspx".to_string()],
        }
    }
}

impl EndpointConfig {
    /// Returns true if `path` is the normalized login path or one of the
    /// configured vendor login paths.
    #[must_use]
    pub fn is_login_path(&self, path: &str) -> bool {
        path == LOGIN_PATH || self.login.iter().any(|p| p == path)
    }

    /// Iterates every configured path across all operations.
    fn all_paths(&self) -> impl Iterator<Item = &String> {
        self.login
            .iter()
            .chain(&self.search)
            .chain(&self.get_preset)
            .chain(&self.add_preset)
    }
}

/// Configuration for the Noxon server core.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    // Server
    /// Preferred port for the HTTP server (0 = scan the fallback range).
    pub preferred_port: u16,

    // Access
    /// Device MACs allowed to use the server (`*` allows everyone).
    pub whitelist: Vec<String>,

    /// Device MACs refused by the server (`*` matches everyone).
    pub blacklist: Vec<String>,

    /// Whether a blacklist match denies even when the whitelist matches.
    ///
    /// Off by default: the whitelist wins, which keeps the behavior deployed
    /// radios have always seen.
    pub blacklist_enforced: bool,

    // Endpoints
    /// Vendor endpoint paths.
    pub endpoints: EndpointConfig,

    // Relay
    /// Age after which a resolved stream URL is re-read from the catalog (seconds).
    pub resolve_ttl_secs: u64,

    /// Connect timeout for upstream stream servers (seconds).
    pub upstream_connect_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferred_port: 80,
            whitelist: vec!["*".to_string()],
            blacklist: Vec::new(),
            blacklist_enforced: false,
            endpoints: EndpointConfig::default(),
            resolve_ttl_secs: DEFAULT_RESOLVE_TTL_SECS,
            upstream_connect_timeout_secs: DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.resolve_ttl_secs == 0 {
            return Err("resolve_ttl_secs must be >= 1".to_string());
        }
        if self.upstream_connect_timeout_secs == 0 {
            return Err("upstream_connect_timeout_secs must be >= 1".to_string());
        }
        let fixed = [LOGIN_PATH, PLAYBACK_PATH, HEALTH_PATH, STATUS_PATH];
        let mut seen = std::collections::HashSet::new();
        for path in self.endpoints.all_paths() {
            if !path.starts_with('/') {
                return Err(format!("endpoint path must start with '/': {path}"));
            }
            if fixed.contains(&path.as_str()) {
                return Err(format!("endpoint path collides with a built-in route: {path}"));
            }
            if !seen.insert(path) {
                return Err(format!("endpoint path configured twice: {path}"));
            }
        }
        Ok(())
    }

    /// Resolve TTL in milliseconds.
    #[must_use]
    pub fn resolve_ttl_millis(&self) -> u64 {
        self.resolve_ttl_secs.saturating_mul(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.whitelist, vec!["*"]);
        assert!(config.blacklist.is_empty());
        assert_eq!(config.resolve_ttl_millis(), 3_600_000);
    }

    #[test]
    fn config_rejects_zero_ttl() {
        let config = Config {
            resolve_ttl_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_rejects_colliding_endpoint() {
        let mut config = Config::default();
        config.endpoints.search.push("/playback".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.endpoints.login.push("relative/path".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config
            .endpoints
            .add_preset
            .push("/Favorites/GetPreset.aspx".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn login_path_includes_normalized_path() {
        let endpoints = EndpointConfig::default();
        assert!(endpoints.is_login_path("/login"));
        assert!(endpoints.is_login_path("/setupapp/fs/asp/BrowseXML/loginXML.asp"));
        assert!(!endpoints.is_login_path("/Favorites/GetPreset.aspx"));
    }

    #[test]
    fn partial_config_deserializes_with_defaults() {
        let config: Config = serde_json::from_str(r#"{"whitelist": ["0011223344AA"]}"#).unwrap();
        assert_eq!(config.whitelist, vec!["0011223344AA"]);
        assert_eq!(config.endpoints, EndpointConfig::default());
        assert_eq!(config.preferred_port, 80);
    }
}
