//! Centralized error types for the Noxon core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps errors to appropriate HTTP status codes
//! - Implements `IntoResponse` for bare status responses (the radio protocol
//!   has no error body, so only the status code is sent)

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type for request handling.
#[derive(Debug, Error)]
pub enum NoxonError {
    /// Malformed request: undecodable identifier or missing parameter.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Identifier does not resolve to a catalog entry of the required kind.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream stream server misbehaved or was unreachable.
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// Device is not allowed to use this server.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NoxonError {
    /// Returns a machine-readable error code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::NotFound(_) => "not_found",
            Self::Upstream(_) => "upstream_failure",
            Self::Unauthorized(_) => "unauthorized",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convenient Result alias for request handling.
pub type NoxonResult<T> = Result<T, NoxonError>;

impl IntoResponse for NoxonError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            Self::Upstream(_) | Self::Internal(_) => {
                log::error!("[Http] {} ({}): {}", status, self.code(), self);
            }
            Self::Unauthorized(_) => log::info!("[Access] {}", self),
            _ => log::warn!("[Http] {} ({}): {}", status, self.code(), self),
        }
        status.into_response()
    }
}
