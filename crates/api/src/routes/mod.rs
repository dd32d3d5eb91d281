//! Route definitions.

pub mod health;
pub mod instances;
pub mod proxy;
pub mod tasks;

use axum::Router;

use crate::state::AppState;

/// All `/api/v1` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(tasks::router())
        .merge(instances::router())
        .nest("/proxy", proxy::router())
}
