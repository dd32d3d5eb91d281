//! Handlers for task submission and status lookup.

use axum::extract::{Path, State};
use axum::Json;
use foreman_core::TaskStatus;
use foreman_dispatch::SyncOutcome;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::state::AppState;

/// Response body for asynchronous submission.
#[derive(Debug, Serialize)]
pub struct TaskIdResponse {
    pub task_id: String,
}

/// POST /api/v1/run
///
/// Enqueue the payload and block until a terminal outcome. A task-level
/// failure is reported in the body, not as a transport failure.
pub async fn run_sync(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> AppResult<Json<Value>> {
    match state.tasks.submit_sync(payload).await? {
        SyncOutcome::Completed(result) => Ok(Json(result)),
        SyncOutcome::Failed { task_id, error } => Ok(Json(json!({
            "error": error,
            "task_id": task_id,
        }))),
    }
}

/// POST /api/v1/run_async
///
/// Enqueue the payload and return the generated task id immediately.
pub async fn run_async(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> AppResult<Json<TaskIdResponse>> {
    let task_id = state.tasks.submit_async(payload).await?;
    Ok(Json(TaskIdResponse { task_id }))
}

/// GET /api/v1/tasks/{task_id}
///
/// Canonical status record; 404 for unknown ids.
pub async fn get_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> AppResult<Json<TaskStatus>> {
    Ok(Json(state.tasks.get_status(&task_id).await?))
}
