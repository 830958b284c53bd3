use reqwest::Client;
use tracing::debug;

use crate::config::settings::Credentials;
use crate::errors::TokenRefreshError;
use crate::sources::dto::{TokenRequest, TokenResponse};

/// Trade the configured credentials for a bearer token at `{domain}{endpoint_path}`.
pub async fn exchange_credentials(
    client: &Client,
    domain_base_url: &str,
    endpoint_path: &str,
    credentials: &Credentials,
) -> Result<TokenResponse, TokenRefreshError> {
    let url = format!("{}{}", domain_base_url, endpoint_path);
    debug!(%url, "exchanging credentials");

    let body = TokenRequest {
        grant_type: &credentials.grant_type,
        client_id: &credentials.client_id,
        client_secret: &credentials.client_secret,
        username: &credentials.username,
        password: &credentials.password,
    };

    let response = client
        .post(&url)
        .json(&body)
        .send()
        .await
        .map_err(TokenRefreshError::ExchangeTransport)?;
    if !response.status().is_success() {
        return Err(TokenRefreshError::ExchangeStatus(response.status()));
    }

    let raw = response
        .text()
        .await
        .map_err(TokenRefreshError::ExchangeTransport)?;
    let token: TokenResponse =
        serde_json::from_str(&raw).map_err(TokenRefreshError::ExchangeDecode)?;
    if token.access_token.is_empty() {
        return Err(TokenRefreshError::EmptyAccessToken);
    }
    Ok(token)
}
