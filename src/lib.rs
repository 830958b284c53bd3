//! # Token Proxy Library
//!
//! Serves a single bearer token to authenticated callers, fetching it from the
//! Nusawork identity provider and caching it until it is close to expiry.
//!
//! Modules:
//! - `config` — environment/CLI settings and their validation
//! - `cache` — the single-slot token cache
//! - `sources` — directory lookup and credential exchange against the provider
//! - `server` — axum router, API key gate and the token endpoint
//! - `observability` — prometheus metrics and the metrics route

pub mod config;
pub mod cache;
pub mod errors;
pub mod sources;
pub mod observability;
pub mod server;
pub mod helpers;
pub mod utils;
#[cfg(test)]
pub mod tests;


pub use crate::cache::token_cache::TokenCache;
pub use crate::errors::{ConfigurationError, TokenRefreshError, UpstreamResolutionError};
