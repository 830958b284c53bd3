use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tokio::time::Instant;
use tracing::info;

use crate::cache::token_cache::TokenCache;
use crate::config::settings::{ApiKeySet, MetricsConfig, ServerConfig};
use crate::observability::metrics::{get_metrics, Metrics};
use crate::observability::routes::MetricsState;
use crate::server::auth::require_api_key;
use crate::server::routes;
use crate::utils::constants::TOKEN_ROUTES;

#[derive(Clone)]
pub struct AppState {
    pub token_cache: Arc<TokenCache>,
    pub api_keys: Arc<ApiKeySet>,
    pub metrics_state: MetricsState,
}

impl AppState {
    pub fn new(token_cache: TokenCache, api_keys: ApiKeySet, metrics: &Metrics) -> Self {
        Self {
            token_cache: Arc::new(token_cache),
            api_keys: Arc::new(api_keys),
            metrics_state: MetricsState::new(metrics.registry.clone()),
        }
    }
}

/// `/token` and `/token/` behind the API key gate, plus the optional metrics route.
pub fn router(state: AppState, metrics_config: &MetricsConfig) -> Router {
    let token_routes = TOKEN_ROUTES
        .into_iter()
        .fold(Router::<AppState>::new(), |router, path| {
            router.route(path, get(routes::get_token))
        })
        .route_layer(middleware::from_fn_with_state(
            state.api_keys.clone(),
            require_api_key,
        ));

    Router::new()
        .merge(token_routes)
        .merge(state.metrics_state.router(metrics_config))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

async fn log_request(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let response = next.run(request).await;
    info!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "request completed"
    );
    response
}

/// Bind and serve until ctrl-c.
pub async fn start(
    server_config: &ServerConfig,
    metrics_config: &MetricsConfig,
    state: AppState,
) -> Result<()> {
    let app = router(state, metrics_config);

    let bind_addr = server_config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!(address = %bind_addr, "token proxy listening");

    let metrics = get_metrics().await;
    metrics.up.set(1);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    metrics.up.set(0);

    info!("token proxy stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
