//! HTTP client for remote worker instances.
//!
//! Wraps the two endpoints every instance exposes: `POST /run` for task
//! execution and `GET /healthz` for liveness probes.

use std::time::Duration;

use foreman_core::Instance;
use serde_json::Value;

/// Shared HTTP client for invoking and probing instances.
pub struct InstanceClient {
    client: reqwest::Client,
    /// Per-request cap on task execution time. `None` means unbounded.
    run_timeout: Option<Duration>,
}

/// Errors from remote instance invocation.
#[derive(Debug, thiserror::Error)]
pub enum InstanceClientError {
    /// The HTTP request itself failed (connect, DNS, timeout).
    #[error("Request to instance failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The instance answered with a non-success status code.
    #[error("Instance error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for the task's error record.
        body: String,
    },
}

impl InstanceClient {
    pub fn new(run_timeout: Option<Duration>) -> Self {
        Self {
            client: reqwest::Client::new(),
            run_timeout,
        }
    }

    /// Execute a task payload on `instance` via `POST {url}/run`.
    ///
    /// The payload is forwarded verbatim; the instance's JSON response
    /// body is returned without further interpretation.
    pub async fn run_task(
        &self,
        instance: &Instance,
        payload: &Value,
    ) -> Result<Value, InstanceClientError> {
        let mut request = self
            .client
            .post(format!("{}/run", instance.url))
            .json(payload);
        if let Some(timeout) = self.run_timeout {
            request = request.timeout(timeout);
        }
        if let Some(token) = &instance.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.json().await?)
    }

    /// Probe `GET {url}/healthz` with a bounded timeout.
    ///
    /// Healthy iff the instance answers HTTP 200 within the timeout.
    pub async fn probe(&self, instance: &Instance, timeout: Duration) -> bool {
        let mut request = self
            .client
            .get(format!("{}/healthz", instance.url))
            .timeout(timeout);
        if let Some(token) = &instance.token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(e) => {
                tracing::debug!(url = %instance.url, error = %e, "Health probe failed");
                false
            }
        }
    }

    /// Ensure the response has a success status code, or capture the
    /// status and body for the task's error record.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, InstanceClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(InstanceClientError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}
