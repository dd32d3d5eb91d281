use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use foreman_api::config::ServerConfig;
use foreman_api::router::build_app_router;
use foreman_api::state::AppState;
use foreman_dispatch::{
    Dispatcher, HealthMonitor, InstanceClient, InstanceRegistry, ResultListener, TaskService,
};
use foreman_store::{RedisStore, Store};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "foreman_api=debug,foreman_dispatch=debug,foreman_store=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Store ---
    let store: Arc<dyn Store> = Arc::new(
        RedisStore::connect(&config.redis_url)
            .await
            .expect("Failed to connect to Redis"),
    );

    // --- Instance registry ---
    let registry = Arc::new(InstanceRegistry::with_snapshot(&config.registry_snapshot_path).await);
    tracing::info!(
        count = registry.list().await.len(),
        "Instance registry ready"
    );

    // --- Background services ---
    let cancel = CancellationToken::new();

    let monitor = HealthMonitor::new(
        Arc::clone(&registry),
        InstanceClient::new(None),
        Duration::from_secs(config.health_check_interval_secs),
        Duration::from_secs(config.health_check_timeout_secs),
    );
    let monitor_handle = tokio::spawn(monitor.run(cancel.child_token()));

    let listener_handle = tokio::spawn(ResultListener::run(
        Arc::clone(&store),
        cancel.child_token(),
    ));

    let dispatcher = Dispatcher::new(
        Arc::clone(&store),
        Arc::clone(&registry),
        InstanceClient::new(config.run_timeout()),
        Duration::from_millis(config.dispatch_poll_ms),
    );
    let dispatcher_handle = tokio::spawn(dispatcher.run(cancel.child_token()));

    tracing::info!("Background services started (health monitor, dispatcher, result listener)");

    // --- App state ---
    let tasks = Arc::new(TaskService::new(
        Arc::clone(&store),
        Duration::from_millis(config.sync_wait_poll_ms),
    ));
    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        registry,
        tasks,
        http: reqwest::Client::new(),
    };

    let app = build_app_router(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    for (name, handle) in [
        ("dispatcher", dispatcher_handle),
        ("health monitor", monitor_handle),
        ("result listener", listener_handle),
    ] {
        if tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .is_err()
        {
            tracing::warn!(service = name, "Background service did not stop in time");
        }
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
