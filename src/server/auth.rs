use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::warn;

use crate::config::settings::ApiKeySet;
use crate::observability::metrics::get_metrics;
use crate::utils::constants::{API_KEY_HEADER, UNAUTHORIZED_MSG};

/// Reject the request with `401 {"error":"Unauthorized"}` unless `x-api-key` is in the set.
///
/// Runs before the handler, so rejected requests never touch the cache or upstream.
pub async fn require_api_key(
    State(api_keys): State<Arc<ApiKeySet>>,
    request: Request,
    next: Next,
) -> Response {
    let authorized = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|key| api_keys.contains(key));

    if !authorized {
        get_metrics().await.unauthorized_requests.inc();
        warn!(path = %request.uri().path(), "rejected request with missing or unknown api key");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": UNAUTHORIZED_MSG })),
        )
            .into_response();
    }

    next.run(request).await
}
