//! API-key authentication for the v1 surface.
//!
//! Accepts either `Authorization: Bearer <key>` or an `api_key` query
//! parameter matching the configured secret. When no secret is
//! configured the check is disabled (local development).

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::state::AppState;

/// Middleware entry point, mounted with
/// `axum::middleware::from_fn_with_state`.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = &state.config.api_key else {
        return next.run(request).await;
    };

    let presented = bearer_token(&request).or_else(|| query_api_key(&request));
    match presented {
        Some(key) if key == *expected => next.run(request).await,
        _ => unauthorized(),
    }
}

fn bearer_token(request: &Request) -> Option<String> {
    let header = request.headers().get(AUTHORIZATION)?.to_str().ok()?;
    header.strip_prefix("Bearer ").map(str::to_string)
}

fn query_api_key(request: &Request) -> Option<String> {
    request
        .uri()
        .query()?
        .split('&')
        .find_map(|pair| pair.strip_prefix("api_key="))
        .map(str::to_string)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        axum::Json(json!({
            "error": "Invalid API key",
            "code": "UNAUTHORIZED",
        })),
    )
        .into_response()
}
