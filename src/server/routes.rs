use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::errors::TokenRefreshError;
use crate::observability::metrics::get_metrics;
use crate::server::server::AppState;

#[derive(Debug, Serialize)]
pub struct TokenBody {
    pub token: String,
}

/// `GET /token/`
pub async fn get_token(State(state): State<AppState>) -> Result<Json<TokenBody>, TokenRefreshError> {
    let metrics = get_metrics().await;
    match state.token_cache.get_token().await {
        Ok(token) => {
            metrics.token_requests.with_label_values(&["ok"]).inc();
            Ok(Json(TokenBody { token }))
        }
        Err(e) => {
            metrics.token_requests.with_label_values(&["upstream_error"]).inc();
            Err(e)
        }
    }
}
