// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::net::SocketAddr;
use std::sync::Arc;

use httpmock::prelude::*;
use httpmock::Mock;
use reqwest::Client;

use crate::cache::token_cache::TokenCache;
use crate::config::settings::{ApiKeySet, Credentials, MetricsConfig, UpstreamConfig};
use crate::helpers::time::ManualClock;
use crate::observability::metrics::get_metrics;
use crate::server::server::{self, AppState};
use crate::sources::{build_http_client, NusaworkSource};

pub const USERNAME: &str = "ops@acme.example";
pub const DIRECTORY_PATH: &str = "/users/ops@acme.example/email";
pub const TOKEN_PATH: &str = "/auth/api/oauth/token";
pub const VALID_KEY: &str = "key-1";

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

pub fn test_credentials() -> Credentials {
    Credentials {
        client_id: "client-1".into(),
        client_secret: "secret-1".into(),
        grant_type: "password".into(),
        username: USERNAME.into(),
        password: "hunter2".into(),
    }
}

pub fn upstream_config(server: &MockServer, timeout_seconds: u64) -> UpstreamConfig {
    UpstreamConfig {
        panel_user_api_base_url: server.url("/users"),
        token_endpoint_path: TOKEN_PATH.to_owned(),
        timeout_seconds,
    }
}

/// Directory lookup answering with `domain` as the account's API domain.
pub async fn mock_directory<'a>(server: &'a MockServer, domain: &str) -> Mock<'a> {
    let domain = domain.to_owned();
    server
        .mock_async(move |when, then| {
            when.method(GET).path(DIRECTORY_PATH);
            then.status(200)
                .json_body(json!({ "data": [{ "domain_api": domain, "email": USERNAME }] }));
        })
        .await
}

pub async fn mock_token_endpoint<'a>(
    server: &'a MockServer,
    access_token: &str,
    expires_in: i64,
) -> Mock<'a> {
    let access_token = access_token.to_owned();
    server
        .mock_async(move |when, then| {
            when.method(POST).path(TOKEN_PATH);
            then.status(200).json_body(json!({
                "access_token": access_token,
                "expires_in": expires_in,
                "token_type": "Bearer"
            }));
        })
        .await
}

/// Token cache wired against `server` with a manual clock starting at `now`.
pub fn cache_against(
    server: &MockServer,
    refresh_margin_seconds: i64,
    now: i64,
) -> (TokenCache, ManualClock) {
    let upstream = upstream_config(server, 5);
    let client = build_http_client(upstream.timeout_seconds).expect("reqwest client");
    let source = NusaworkSource::new(client, upstream, test_credentials());
    let clock = ManualClock::new(now);
    let cache = TokenCache::with_clock(source, refresh_margin_seconds, Arc::new(clock.clone()));
    (cache, clock)
}

/// Full proxy router around `cache`, accepting only [`VALID_KEY`].
pub async fn proxy_app(cache: TokenCache, metrics_enabled: bool) -> (AppState, Router) {
    let state = AppState::new(cache, ApiKeySet::new([VALID_KEY]), get_metrics().await);
    let metrics_config = MetricsConfig {
        path: "/metrics".to_owned(),
        is_enabled: metrics_enabled,
    };
    let router = server::router(state.clone(), &metrics_config);
    (state, router)
}
