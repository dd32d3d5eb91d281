//! Passthrough proxy to the default instance.
//!
//! Forwards arbitrary requests to the first registered instance without
//! queueing or health selection. This is a convenience surface for
//! instance-native endpoints the dispatch layer does not model.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, Method};
use axum::Json;
use foreman_core::CoreError;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// ANY /api/v1/proxy/{*path}
///
/// Forwards the method, path, and JSON body to the default instance and
/// relays its JSON response. 503 when no instance is registered.
pub async fn forward(
    State(state): State<AppState>,
    Path(path): Path<String>,
    method: Method,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let instance = state
        .registry
        .select_default()
        .await
        .ok_or_else(|| CoreError::Unavailable("No instance registered".to_string()))?;

    let mut request = state
        .http
        .request(method, format!("{}/{path}", instance.url));
    if let Some(token) = &instance.token {
        request = request.bearer_auth(token);
    }
    if !body.is_empty() {
        request = request
            .header(header::CONTENT_TYPE, "application/json")
            .body(body);
    }

    let response = request
        .send()
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;
    let value: Value = response
        .json()
        .await
        .map_err(|e| AppError::Upstream(format!("Instance returned non-JSON body: {e}")))?;
    Ok(Json(value))
}
