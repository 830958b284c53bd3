use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::cache::token::CachedToken;
use crate::errors::TokenRefreshError;
use crate::helpers::time::{Clock, SystemClock};
use crate::observability::metrics::get_metrics;
use crate::sources::{FetchToken, NusaworkSource};

/// Holds at most one bearer token and refreshes it from `source` when stale.
///
/// The freshness check and the refresh run under one lock, so callers that
/// arrive while a refresh is in flight wait for it and reuse its result.
#[derive(Debug)]
pub struct TokenCache<S = NusaworkSource> {
    source: S,
    clock: Arc<dyn Clock>,
    refresh_margin_seconds: i64,
    slot: Mutex<Option<CachedToken>>,
}

impl<S: FetchToken> TokenCache<S> {
    pub fn new(source: S, refresh_margin_seconds: i64) -> Self {
        Self::with_clock(source, refresh_margin_seconds, Arc::new(SystemClock))
    }

    pub fn with_clock(source: S, refresh_margin_seconds: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            clock,
            refresh_margin_seconds,
            slot: Mutex::new(None),
        }
    }

    /// Return the cached token, refreshing it first if absent or within the margin of expiry.
    ///
    /// A failed refresh leaves the cache exactly as it was.
    pub async fn get_token(&self) -> Result<String, TokenRefreshError> {
        let metrics = get_metrics().await;
        let mut slot = self.slot.lock().await;

        let now = self.clock.now();
        if let Some(cached) = slot
            .as_ref()
            .filter(|token| token.is_fresh(now, self.refresh_margin_seconds))
        {
            metrics.cache_hits.inc();
            return Ok(cached.value.clone());
        }

        debug!(
            cached = slot.is_some(),
            refresh_margin_seconds = self.refresh_margin_seconds,
            "cached token absent or stale, refreshing"
        );
        let start = Instant::now();
        let issued = match self.source.fetch_token().await {
            Ok(issued) => issued,
            Err(e) => {
                error!(error = %e, "Error fetching bearer token");
                metrics.refresh_failures.with_label_values(&[e.reason()]).inc();
                metrics
                    .refresh_duration
                    .with_label_values(&["failure"])
                    .observe(start.elapsed().as_secs_f64());
                return Err(e);
            }
        };

        // expiry is anchored to the time the refresh was decided, not when it finished
        let token = CachedToken::new(issued.access_token, now.saturating_add(issued.expires_in));
        info!(
            expires_at = token.expires_at,
            expires_in = issued.expires_in,
            "bearer token refreshed"
        );
        metrics.refreshes.inc();
        metrics.token_expiry_unix.set(token.expires_at);
        metrics
            .refresh_duration
            .with_label_values(&["success"])
            .observe(start.elapsed().as_secs_f64());

        let value = token.value.clone();
        *slot = Some(token);
        Ok(value)
    }

    /// Current cache contents, without checking freshness.
    pub async fn snapshot(&self) -> Option<CachedToken> {
        self.slot.lock().await.clone()
    }

    #[cfg(test)]
    pub(crate) async fn prime(&self, token: CachedToken) {
        *self.slot.lock().await = Some(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::UpstreamResolutionError;
    use crate::helpers::time::ManualClock;
    use crate::sources::IssuedToken;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Source that replays scripted outcomes and counts calls.
    #[derive(Debug, Default)]
    struct ScriptedSource {
        outcomes: std::sync::Mutex<VecDeque<Result<IssuedToken, TokenRefreshError>>>,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl ScriptedSource {
        fn new(outcomes: Vec<Result<IssuedToken, TokenRefreshError>>) -> Self {
            Self {
                outcomes: std::sync::Mutex::new(outcomes.into()),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl FetchToken for ScriptedSource {
        async fn fetch_token(&self) -> Result<IssuedToken, TokenRefreshError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected fetch")
        }
    }

    fn issued(token: &str, expires_in: i64) -> Result<IssuedToken, TokenRefreshError> {
        Ok(IssuedToken {
            access_token: token.to_string(),
            expires_in,
        })
    }

    fn cache_at(source: ScriptedSource, now: i64) -> (TokenCache<ScriptedSource>, ManualClock) {
        let clock = ManualClock::new(now);
        let cache = TokenCache::with_clock(source, 60, Arc::new(clock.clone()));
        (cache, clock)
    }

    #[tokio::test]
    async fn empty_cache_refreshes_and_commits_expiry() {
        let (cache, _clock) = cache_at(ScriptedSource::new(vec![issued("abc", 3600)]), 1_000);

        assert_eq!(cache.get_token().await.unwrap(), "abc");
        assert_eq!(
            cache.snapshot().await,
            Some(CachedToken::new("abc".into(), 4_600))
        );
        assert_eq!(cache.source.calls(), 1);

        // served from cache immediately afterwards
        assert_eq!(cache.get_token().await.unwrap(), "abc");
        assert_eq!(cache.source.calls(), 1);
    }

    #[tokio::test]
    async fn fresh_token_is_served_without_fetching() {
        let (cache, _clock) = cache_at(ScriptedSource::new(vec![]), 4_000);
        cache.prime(CachedToken::new("abc".into(), 4_600)).await;

        assert_eq!(cache.get_token().await.unwrap(), "abc");
        assert_eq!(cache.source.calls(), 0);
    }

    #[tokio::test]
    async fn token_inside_margin_is_refreshed() {
        let (cache, clock) = cache_at(ScriptedSource::new(vec![issued("def", 3600)]), 4_539);
        cache.prime(CachedToken::new("abc".into(), 4_600)).await;

        assert_eq!(cache.get_token().await.unwrap(), "abc");
        clock.set(4_540);
        assert_eq!(cache.get_token().await.unwrap(), "def");
        assert_eq!(cache.snapshot().await.unwrap().expires_at, 4_540 + 3600);
        assert_eq!(cache.source.calls(), 1);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_token() {
        let source = ScriptedSource::new(vec![
            Err(UpstreamResolutionError::EmptyDirectory.into()),
            Err(TokenRefreshError::EmptyAccessToken),
        ]);
        let (cache, _clock) = cache_at(source, 4_600);
        let previous = CachedToken::new("abc".into(), 4_600);
        cache.prime(previous.clone()).await;

        let err = cache.get_token().await.unwrap_err();
        assert!(matches!(
            err,
            TokenRefreshError::Resolution(UpstreamResolutionError::EmptyDirectory)
        ));
        assert_eq!(cache.snapshot().await, Some(previous.clone()));

        // each request is its own retry
        assert!(cache.get_token().await.is_err());
        assert_eq!(cache.snapshot().await, Some(previous));
        assert_eq!(cache.source.calls(), 2);
    }

    #[tokio::test]
    async fn failed_refresh_on_empty_cache_stays_empty() {
        let source = ScriptedSource::new(vec![Err(TokenRefreshError::EmptyAccessToken)]);
        let (cache, _clock) = cache_at(source, 1_000);

        assert!(cache.get_token().await.is_err());
        assert_eq!(cache.snapshot().await, None);
    }

    #[tokio::test]
    async fn margin_longer_than_lifetime_always_refreshes() {
        let source = ScriptedSource::new(vec![issued("a", 30), issued("b", 30)]);
        let (cache, _clock) = cache_at(source, 1_000);

        assert_eq!(cache.get_token().await.unwrap(), "a");
        assert_eq!(cache.get_token().await.unwrap(), "b");
        assert_eq!(cache.source.calls(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_one_refresh() {
        let source = ScriptedSource {
            delay: Some(Duration::from_millis(100)),
            ..ScriptedSource::new(vec![issued("abc", 3600)])
        };
        let (cache, _clock) = cache_at(source, 1_000);
        let cache = Arc::new(cache);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move { cache.get_token().await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "abc");
        }
        assert_eq!(cache.source.calls(), 1);
    }
}
