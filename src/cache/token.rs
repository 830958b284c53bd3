
/// A bearer token and the absolute time it stops being valid.
///
/// Held as `Option<CachedToken>` so the value and expiry are always present
/// or absent together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub value: String,
    pub expires_at: i64, // UNIX TIMESTAMP
}

impl CachedToken {
    pub fn new(value: String, expires_at: i64) -> Self {
        Self { value, expires_at }
    }

    /// A margin larger than the token lifetime makes the token permanently stale.
    pub fn is_fresh(&self, now: i64, refresh_margin_seconds: i64) -> bool {
        now < self.expires_at.saturating_sub(refresh_margin_seconds)
    }
}
