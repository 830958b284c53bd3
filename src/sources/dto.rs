//! Wire shapes of the two upstream calls.

use serde::{Deserialize, Serialize};

/// `GET {base}/{username}/email`
#[derive(Debug, Deserialize)]
pub struct DirectoryResponse {
    pub data: Vec<DirectoryRecord>,
}

#[derive(Debug, Deserialize)]
pub struct DirectoryRecord {
    #[serde(default)]
    pub domain_api: Option<String>,
}

/// Body of `POST {domain_api}{token_endpoint_path}`
#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    pub grant_type: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// lifetime in seconds, relative to the time of the request
    pub expires_in: i64,
}
