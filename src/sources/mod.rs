//! Upstream token sources.
//!
//! The Nusawork flow is two calls: a directory lookup for the account's API
//! domain, then a credential exchange against that domain.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;

use crate::config::settings::{Credentials, ProxySettings, UpstreamConfig};
use crate::errors::TokenRefreshError;

pub mod domain;
pub mod dto;
pub mod exchange;

/// A freshly issued token with its lifetime relative to the request time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: i64,
}

pub trait FetchToken: Send + Sync {
    fn fetch_token(&self) -> impl Future<Output = Result<IssuedToken, TokenRefreshError>> + Send;
}

/// HTTP client shared by both upstream calls. The timeout bounds each call.
pub fn build_http_client(timeout_seconds: u64) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
}

#[derive(Debug, Clone)]
pub struct NusaworkSource {
    client: Client,
    upstream: UpstreamConfig,
    credentials: Credentials,
}

impl NusaworkSource {
    pub fn new(client: Client, upstream: UpstreamConfig, credentials: Credentials) -> Self {
        Self {
            client,
            upstream,
            credentials,
        }
    }

    pub fn from_settings(client: Client, settings: &ProxySettings) -> Self {
        Self::new(
            client,
            settings.upstream.clone(),
            settings.credentials.clone(),
        )
    }
}

impl FetchToken for NusaworkSource {
    async fn fetch_token(&self) -> Result<IssuedToken, TokenRefreshError> {
        let domain = domain::resolve_domain(
            &self.client,
            &self.upstream.panel_user_api_base_url,
            &self.credentials.username,
        )
        .await?;

        let token = exchange::exchange_credentials(
            &self.client,
            &domain,
            &self.upstream.token_endpoint_path,
            &self.credentials,
        )
        .await?;

        Ok(IssuedToken {
            access_token: token.access_token,
            expires_in: token.expires_in,
        })
    }
}
