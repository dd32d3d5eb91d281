//! Route definitions for worker-instance management.

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::instances;
use crate::state::AppState;

/// Instance management routes mounted under `/api/v1`.
///
/// ```text
/// GET    /instances        -> list
/// POST   /instances        -> add
/// DELETE /instances/{url}  -> remove
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/instances", get(instances::list).post(instances::add))
        .route("/instances/{url}", delete(instances::remove))
}
