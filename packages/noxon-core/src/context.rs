//! Per-request device context and URL building.
//!
//! Radios identify themselves only through query parameters, and every URL
//! handed back to them must point at whatever host name they used to reach
//! us (usually a vendor domain redirected by DNS). [`RequestContext`]
//! captures both and [`UrlBuilder`] turns them into browse and playback URLs.

use std::convert::Infallible;
use std::fmt;

use axum::extract::{FromRequestParts, Query};
use axum::http::header::HOST;
use axum::http::request::Parts;
use serde::Deserialize;

use crate::protocol_constants::{LOGIN_PATH, PLAYBACK_PATH};
use crate::utils::encode_id;

/// Identity a radio reports in its query string.
///
/// Every field is optional on the wire; missing values become empty strings.
/// An empty MAC is a valid (anonymous) identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeviceInfo {
    /// Device MAC address, the key for sessions and presets.
    pub mac: String,
    /// Firmware version.
    #[serde(rename = "fver")]
    pub firmware_version: String,
    /// Hardware version.
    #[serde(rename = "hw")]
    pub hardware_version: String,
    /// Vendor identifier.
    #[serde(rename = "ven")]
    pub vendor: String,
    /// Device language.
    #[serde(rename = "dlang")]
    pub language: String,
}

impl DeviceInfo {
    /// Creates a device identity with only a MAC set.
    pub fn with_mac(mac: impl Into<String>) -> Self {
        Self {
            mac: mac.into(),
            ..Default::default()
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mac = if self.mac.is_empty() {
            "<anonymous>"
        } else {
            &self.mac
        };
        write!(f, "mac={mac}")?;
        if !self.vendor.is_empty() {
            write!(f, " ven={}", self.vendor)?;
        }
        if !self.firmware_version.is_empty() {
            write!(f, " fver={}", self.firmware_version)?;
        }
        if !self.hardware_version.is_empty() {
            write!(f, " hw={}", self.hardware_version)?;
        }
        Ok(())
    }
}

/// Device identity plus the base URL the device used to reach us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Reported device identity.
    pub device: DeviceInfo,
    /// Base URL (scheme and host) of the inbound request.
    pub base_url: String,
}

impl RequestContext {
    /// Creates a context from a device identity and base URL.
    pub fn new(device: DeviceInfo, base_url: impl Into<String>) -> Self {
        Self {
            device,
            base_url: base_url.into(),
        }
    }

    /// Returns a `UrlBuilder` for this request.
    #[must_use]
    pub fn url_builder(&self) -> UrlBuilder<'_> {
        UrlBuilder::new(&self.base_url, &self.device.mac)
    }

    /// Derives the base URL from a `Host` header value.
    fn base_url_from_host(host: Option<&str>) -> String {
        match host.map(str::trim) {
            Some(host) if !host.is_empty() => format!("http://{host}"),
            _ => "http://localhost".to_string(),
        }
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let device = Query::<DeviceInfo>::try_from_uri(&parts.uri)
            .map(|Query(device)| device)
            .unwrap_or_default();
        let host = parts.headers.get(HOST).and_then(|v| v.to_str().ok());
        Ok(Self::new(device, Self::base_url_from_host(host)))
    }
}

/// Builds the request-scoped URLs embedded in wire items.
///
/// URLs embed the requesting MAC and base URL, so they must never be
/// cached across devices.
pub struct UrlBuilder<'a> {
    base_url: &'a str,
    mac: &'a str,
}

impl<'a> UrlBuilder<'a> {
    /// Creates a new `UrlBuilder` for the given base URL and device MAC.
    pub fn new(base_url: &'a str, mac: &'a str) -> Self {
        Self { base_url, mac }
    }

    /// Returns the browse URL for a directory (`/login?gofile=<b64 id>`).
    #[must_use]
    pub fn browse_url(&self, directory_id: &str) -> String {
        format!(
            "{}{}?gofile={}",
            self.base_url,
            LOGIN_PATH,
            encode_id(directory_id)
        )
    }

    /// Returns the playback URL for a station (`/playback?mac=..&stationId=<b64 id>`).
    #[must_use]
    pub fn playback_url(&self, station_id: &str) -> String {
        format!(
            "{}{}?mac={}&stationId={}",
            self.base_url,
            PLAYBACK_PATH,
            self.mac,
            encode_id(station_id)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(uri: &str, host: Option<&str>) -> RequestContext {
        let mut builder = Request::builder().uri(uri);
        if let Some(host) = host {
            builder = builder.header(HOST, host);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        RequestContext::from_request_parts(&mut parts, &())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn extracts_device_and_host() {
        let ctx = extract(
            "/login?mac=001122AABBCC&fver=7.1&hw=2&ven=noxon&dlang=de",
            Some("radio.example:8080"),
        )
        .await;
        assert_eq!(ctx.device.mac, "001122AABBCC");
        assert_eq!(ctx.device.firmware_version, "7.1");
        assert_eq!(ctx.device.vendor, "noxon");
        assert_eq!(ctx.device.language, "de");
        assert_eq!(ctx.base_url, "http://radio.example:8080");
    }

    #[tokio::test]
    async fn missing_mac_is_anonymous() {
        let ctx = extract("/health", None).await;
        assert_eq!(ctx.device, DeviceInfo::default());
        assert_eq!(ctx.base_url, "http://localhost");
        assert_eq!(ctx.device.to_string(), "mac=<anonymous>");
    }

    #[test]
    fn url_builder_generates_correct_urls() {
        let builder = UrlBuilder::new("http://192.168.1.100", "AABB");
        assert_eq!(
            builder.browse_url("12"),
            "http://192.168.1.100/login?gofile=MTI="
        );
        assert_eq!(
            builder.playback_url("12"),
            "http://192.168.1.100/playback?mac=AABB&stationId=MTI="
        );
    }
}
