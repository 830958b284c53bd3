use reqwest::{Client, Url};
use tracing::debug;

use crate::errors::UpstreamResolutionError;
use crate::sources::dto::DirectoryResponse;

/// Ask the directory which API domain serves `username`.
///
/// Returns the `domain_api` of the first record. Not cached and never retried.
pub async fn resolve_domain(
    client: &Client,
    base_api_url: &str,
    username: &str,
) -> Result<String, UpstreamResolutionError> {
    let url = format!("{}/{}/email", base_api_url.trim_end_matches('/'), username);
    // the path carries the username
    let host = Url::parse(base_api_url)
        .ok()
        .and_then(|base| base.host_str().map(str::to_owned))
        .unwrap_or_default();
    debug!(%host, "resolving domain api");

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| UpstreamResolutionError::Transport(e.without_url()))?;
    if !response.status().is_success() {
        return Err(UpstreamResolutionError::Status(response.status()));
    }

    let body = response
        .text()
        .await
        .map_err(|e| UpstreamResolutionError::Transport(e.without_url()))?;
    let directory: DirectoryResponse =
        serde_json::from_str(&body).map_err(UpstreamResolutionError::Decode)?;

    directory
        .data
        .into_iter()
        .next()
        .ok_or(UpstreamResolutionError::EmptyDirectory)?
        .domain_api
        .filter(|domain| !domain.is_empty())
        .ok_or(UpstreamResolutionError::MissingDomain)
}
