//! Route definitions for task submission and status lookup.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::tasks;
use crate::state::AppState;

/// Task routes mounted under `/api/v1`.
///
/// ```text
/// POST /run              -> run_sync
/// POST /run_async        -> run_async
/// GET  /tasks/{task_id}  -> get_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/run", post(tasks::run_sync))
        .route("/run_async", post(tasks::run_async))
        .route("/tasks/{task_id}", get(tasks::get_status))
}
