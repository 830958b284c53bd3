use std::collections::HashSet;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// ================================
/// Global service-wide settings
/// ================================
#[derive(Debug, Clone)]
pub struct ProxySettings {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub credentials: Credentials,
    /// seconds subtracted from the token expiry to force early renewal
    pub refresh_margin_seconds: i64,
    pub api_keys: ApiKeySet,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// ================================
/// Upstream identity provider
/// ================================
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// directory API, queried as `{base}/{username}/email`
    pub panel_user_api_base_url: String,
    /// appended to the resolved domain, e.g. `/auth/api/oauth/token`
    pub token_endpoint_path: String,
    pub timeout_seconds: u64,
}

/// Credentials passed verbatim to the token endpoint. `Debug` prints none of them.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub grant_type: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

/// Keys accepted in the `x-api-key` header.
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ApiKeySet(HashSet<String>);

impl ApiKeySet {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(keys.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// never print the keys themselves
impl fmt::Debug for ApiKeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKeySet({} keys)", self.0.len())
    }
}

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub path: String,
    pub is_enabled: bool,
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Compact,
}
