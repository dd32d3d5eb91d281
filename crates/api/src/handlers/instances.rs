//! Handlers for worker-instance management.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use foreman_core::InstanceView;
use serde::Deserialize;

use crate::error::AppResult;
use crate::response::{DataResponse, StatusResponse};
use crate::state::AppState;

/// Request body for instance registration.
#[derive(Debug, Deserialize)]
pub struct AddInstanceRequest {
    pub url: String,
    pub token: Option<String>,
}

/// GET /api/v1/instances
///
/// All registered instances, without tokens.
pub async fn list(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<InstanceView>>>> {
    Ok(Json(DataResponse {
        data: state.registry.list().await,
    }))
}

/// POST /api/v1/instances
///
/// Register a new instance. 400 on malformed or duplicate urls.
pub async fn add(
    State(state): State<AppState>,
    Json(input): Json<AddInstanceRequest>,
) -> AppResult<(StatusCode, Json<StatusResponse>)> {
    // An empty token field means no token at all.
    let token = input.token.filter(|token| !token.is_empty());
    state.registry.add(&input.url, token).await?;
    Ok((StatusCode::CREATED, Json(StatusResponse::success())))
}

/// DELETE /api/v1/instances/{url}
///
/// Deregister an instance by (percent-encoded) url. 409 while the
/// instance is executing a task, 404 when unknown.
pub async fn remove(
    State(state): State<AppState>,
    Path(url): Path<String>,
) -> AppResult<Json<StatusResponse>> {
    state.registry.remove(&url).await?;
    Ok(Json(StatusResponse::success()))
}
