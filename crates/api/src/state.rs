use std::sync::Arc;

use foreman_dispatch::{InstanceRegistry, TaskService};
use foreman_store::Store;

use crate::config::ServerConfig;

/// Shared application state available to all handlers via
/// `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// The storage client (queue, status store, result channel).
    pub store: Arc<dyn Store>,
    /// Worker-instance registry shared with the background services.
    pub registry: Arc<InstanceRegistry>,
    /// Task submission front end.
    pub tasks: Arc<TaskService>,
    /// Client used by the passthrough proxy.
    pub http: reqwest::Client,
}
