use anyhow::{Context, Result};
use token_proxy::cache::token_cache::TokenCache;
use token_proxy::config::loader;
use token_proxy::observability::metrics::get_metrics;
use token_proxy::server;
use token_proxy::server::server::AppState;
use token_proxy::sources::{build_http_client, NusaworkSource};
use token_proxy::utils::logging;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load settings
    //
    // .env file (optional), then env / args
    // -------------------------------

    let _ = dotenvy::dotenv();
    let settings = loader::load()?;
    logging::init_logging(&settings.logging);

    info!(
        port = settings.server.port,
        refresh_margin_seconds = settings.refresh_margin_seconds,
        api_keys = settings.api_keys.len(),
        metrics_enabled = settings.metrics.is_enabled,
        "Service starting..."
    );
    if settings.api_keys.is_empty() {
        tracing::warn!("API_KEYS is empty, every token request will be rejected");
    }

    // -------------------------------
    // 2. Create request client and token cache
    // -------------------------------

    let client = build_http_client(settings.upstream.timeout_seconds)
        .context("failed to build HTTP client")?;
    let source = NusaworkSource::from_settings(client, &settings);
    let token_cache = TokenCache::new(source, settings.refresh_margin_seconds);

    // -------------------------------
    // 3. Start http server
    // -------------------------------

    let metrics = get_metrics().await;
    let state = AppState::new(token_cache, settings.api_keys.clone(), metrics);
    server::server::start(&settings.server, &settings.metrics, state).await
}
