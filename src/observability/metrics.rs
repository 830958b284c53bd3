use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use tracing::info;
use std::sync::Arc;
use tokio::sync::OnceCell;


// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the process-wide `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| async {
        info!("Initializing Metrics ...");
        Metrics::new()}
    ).await
}


#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Endpoint metrics
    pub token_requests: IntCounterVec,
    pub unauthorized_requests: IntCounter,

    // Cache metrics
    pub cache_hits: IntCounter,
    pub token_expiry_unix: IntGauge,

    // Upstream metrics
    pub refreshes: IntCounter,
    pub refresh_failures: IntCounterVec,
    pub refresh_duration: HistogramVec,

    // Runtime
    pub up: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("tokenproxy".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Endpoint
            token_requests: IntCounterVec::new(Opts::new("token_requests_total", "Token endpoint requests by outcome"),&["outcome"],).unwrap(),
            unauthorized_requests: IntCounter::new("unauthorized_requests_total", "Requests rejected by the API key gate").unwrap(),

            // Cache
            cache_hits: IntCounter::new("cache_hits_total", "Token requests served from cache").unwrap(),
            token_expiry_unix: IntGauge::new("token_expiry_unix_seconds", "Expiry of the cached token").unwrap(),

            // Upstream
            refreshes: IntCounter::new("token_refresh_total", "Successful token refreshes").unwrap(),
            refresh_failures: IntCounterVec::new(Opts::new("token_refresh_failures_total", "Refresh failures by reason"),&["reason"],).unwrap(),
            refresh_duration: HistogramVec::new(HistogramOpts::new("token_refresh_duration_seconds", "Refresh duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),&["outcome"],).unwrap(),

            up: IntGauge::new("up", "1 if service is serving").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.token_requests.clone())).unwrap();
        reg.register(Box::new(metrics.unauthorized_requests.clone())).unwrap();
        reg.register(Box::new(metrics.cache_hits.clone())).unwrap();
        reg.register(Box::new(metrics.token_expiry_unix.clone())).unwrap();
        reg.register(Box::new(metrics.refreshes.clone())).unwrap();
        reg.register(Box::new(metrics.refresh_failures.clone())).unwrap();
        reg.register(Box::new(metrics.refresh_duration.clone())).unwrap();
        reg.register(Box::new(metrics.up.clone())).unwrap();

        metrics
    }
}
