//! Route definitions for the passthrough proxy.

use axum::routing::get;
use axum::Router;

use crate::handlers::proxy;
use crate::state::AppState;

/// Proxy routes nested under `/api/v1/proxy`.
///
/// Every path below the mount point forwards to the default instance.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{*path}",
        get(proxy::forward)
            .post(proxy::forward)
            .put(proxy::forward)
            .delete(proxy::forward),
    )
}
