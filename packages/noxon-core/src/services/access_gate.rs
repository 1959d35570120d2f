//! MAC-based access control.
//!
//! Consulted by the HTTP middleware before any handler runs. The decision is
//! a pure function of the request and the configuration.

use crate::protocol_constants::HEALTH_PATH;
use crate::state::Config;

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny,
}

impl AccessDecision {
    /// Returns true for [`AccessDecision::Allow`].
    #[must_use]
    pub fn is_allowed(self) -> bool {
        self == Self::Allow
    }
}

/// Access gate over the configured whitelist and blacklist.
#[derive(Debug, Clone)]
pub struct AccessGate {
    config: Config,
}

impl AccessGate {
    /// Creates a gate for the given configuration.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Decides whether a request for `path` from `mac` may proceed.
    ///
    /// Order:
    /// 1. login paths carrying a non-empty `token` are allowed
    /// 2. the health path is allowed
    /// 3. a whitelist match (exact MAC or `*`) allows, otherwise deny
    ///
    /// A blacklist match (exact MAC or `*`) only denies ahead of the whitelist
    /// when `blacklist_enforced` is set.
    #[must_use]
    pub fn decide(&self, path: &str, mac: &str, token: Option<&str>) -> AccessDecision {
        if self.config.endpoints.is_login_path(path) && token.is_some_and(|t| !t.is_empty()) {
            return AccessDecision::Allow;
        }
        if path == HEALTH_PATH {
            return AccessDecision::Allow;
        }

        let blacklisted = matches_any(&self.config.blacklist, mac);
        if blacklisted && self.config.blacklist_enforced {
            return AccessDecision::Deny;
        }
        if matches_any(&self.config.whitelist, mac) {
            return AccessDecision::Allow;
        }
        AccessDecision::Deny
    }
}

fn matches_any(list: &[String], mac: &str) -> bool {
    list.iter().any(|entry| entry == "*" || entry == mac)
}
