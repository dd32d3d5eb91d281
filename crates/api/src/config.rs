//! Server configuration loaded from environment variables.

use std::time::Duration;

/// Runtime configuration for the API server and the dispatch engine.
///
/// All fields have defaults suitable for local development. In
/// production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Redis connection URL (default: `redis://127.0.0.1:6379/0`).
    pub redis_url: String,
    /// Path of the instance registry snapshot file
    /// (default: `instances.json`).
    pub registry_snapshot_path: String,
    /// API key required on `/api/v1` requests. Unset disables the check.
    pub api_key: Option<String>,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `600`). This is the
    /// only bound on synchronous submission waits, which are otherwise
    /// unbounded by design.
    pub request_timeout_secs: u64,
    /// Seconds between health-check cycles (default: `30`).
    pub health_check_interval_secs: u64,
    /// Per-probe timeout in seconds (default: `5`).
    pub health_check_timeout_secs: u64,
    /// Cap on a single remote invocation in seconds; `0` means
    /// unbounded (default: `600`).
    pub run_timeout_secs: u64,
    /// Dispatcher tick in milliseconds (default: `100`).
    pub dispatch_poll_ms: u64,
    /// Sleep between synchronous-wait checks in milliseconds
    /// (default: `100`).
    pub sync_wait_poll_ms: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                     |
    /// |------------------------------|-----------------------------|
    /// | `HOST`                       | `0.0.0.0`                   |
    /// | `PORT`                       | `3000`                      |
    /// | `REDIS_URL`                  | `redis://127.0.0.1:6379/0`  |
    /// | `REGISTRY_SNAPSHOT_PATH`     | `instances.json`            |
    /// | `API_KEY`                    | unset (check disabled)      |
    /// | `CORS_ORIGINS`               | `http://localhost:5173`     |
    /// | `REQUEST_TIMEOUT_SECS`       | `600`                       |
    /// | `HEALTH_CHECK_INTERVAL_SECS` | `30`                        |
    /// | `HEALTH_CHECK_TIMEOUT_SECS`  | `5`                         |
    /// | `RUN_TIMEOUT_SECS`           | `600` (`0` = unbounded)     |
    /// | `DISPATCH_POLL_MS`           | `100`                       |
    /// | `SYNC_WAIT_POLL_MS`          | `100`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/0".into());

        let registry_snapshot_path =
            std::env::var("REGISTRY_SNAPSHOT_PATH").unwrap_or_else(|_| "instances.json".into());

        let api_key = std::env::var("API_KEY").ok().filter(|key| !key.is_empty());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host,
            port,
            redis_url,
            registry_snapshot_path,
            api_key,
            cors_origins,
            request_timeout_secs: env_u64("REQUEST_TIMEOUT_SECS", 600),
            health_check_interval_secs: env_u64("HEALTH_CHECK_INTERVAL_SECS", 30),
            health_check_timeout_secs: env_u64("HEALTH_CHECK_TIMEOUT_SECS", 5),
            run_timeout_secs: env_u64("RUN_TIMEOUT_SECS", 600),
            dispatch_poll_ms: env_u64("DISPATCH_POLL_MS", 100),
            sync_wait_poll_ms: env_u64("SYNC_WAIT_POLL_MS", 100),
        }
    }

    /// Remote invocation timeout, `None` when configured unbounded.
    pub fn run_timeout(&self) -> Option<Duration> {
        (self.run_timeout_secs > 0).then(|| Duration::from_secs(self.run_timeout_secs))
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{name} must be a valid u64")),
        Err(_) => default,
    }
}
