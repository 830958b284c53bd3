//! Error kinds raised by the token proxy.
//!
//! A rejected API key has no type here: it is answered at the HTTP boundary
//! and never reaches the cache.

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde_json::json;
use thiserror::Error;

/// A required setting is missing or unusable at startup.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("{0}")]
    Arguments(String),
}

/// The directory lookup for the account's API domain failed.
#[derive(Debug, Error)]
pub enum UpstreamResolutionError {
    #[error("directory request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("directory responded with status {0}")]
    Status(StatusCode),

    #[error("directory returned malformed body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("directory returned no records")]
    EmptyDirectory,

    #[error("directory record has no domain_api")]
    MissingDomain,
}

impl UpstreamResolutionError {
    pub fn reason(&self) -> &'static str {
        match self {
            UpstreamResolutionError::Transport(e) if e.is_timeout() => "resolve_timeout",
            UpstreamResolutionError::Transport(_) => "resolve_transport",
            UpstreamResolutionError::Status(_) => "resolve_status",
            UpstreamResolutionError::Decode(_) => "resolve_decode",
            UpstreamResolutionError::EmptyDirectory => "resolve_empty",
            UpstreamResolutionError::MissingDomain => "resolve_missing_domain",
        }
    }
}

/// A refresh of the cached bearer token failed. The cache is left as it was.
#[derive(Debug, Error)]
pub enum TokenRefreshError {
    #[error("domain resolution failed: {0}")]
    Resolution(#[from] UpstreamResolutionError),

    #[error("token exchange request failed: {0}")]
    ExchangeTransport(#[source] reqwest::Error),

    #[error("token endpoint responded with status {0}")]
    ExchangeStatus(StatusCode),

    #[error("token endpoint returned malformed body: {0}")]
    ExchangeDecode(#[source] serde_json::Error),

    #[error("token endpoint returned an empty access token")]
    EmptyAccessToken,
}

impl TokenRefreshError {
    /// Short label used for the refresh failure metric.
    pub fn reason(&self) -> &'static str {
        match self {
            TokenRefreshError::Resolution(e) => e.reason(),
            TokenRefreshError::ExchangeTransport(e) if e.is_timeout() => "exchange_timeout",
            TokenRefreshError::ExchangeTransport(_) => "exchange_transport",
            TokenRefreshError::ExchangeStatus(_) => "exchange_status",
            TokenRefreshError::ExchangeDecode(_) => "exchange_decode",
            TokenRefreshError::EmptyAccessToken => "exchange_empty_token",
        }
    }
}

impl IntoResponse for TokenRefreshError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
