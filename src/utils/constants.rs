//! Shared constants and invariants

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_REFRESH_MARGIN_SECS: i64 = 60;
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

/// Both spellings are served by the token handler.
pub const TOKEN_ROUTES: [&str; 2] = ["/token", "/token/"];

pub const API_KEY_HEADER: &str = "x-api-key";
pub const UNAUTHORIZED_MSG: &str = "Unauthorized";
