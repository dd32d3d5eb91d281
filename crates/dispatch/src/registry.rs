//! Worker-instance registry.
//!
//! A single coordination lock guards every read-then-write sequence
//! against instance state; the dispatcher, the health monitor, and the
//! management API all go through it. The full instance list is rewritten
//! to a JSON snapshot file on every mutation and every health cycle;
//! that snapshot is the sole durability mechanism for instance state
//! across restarts.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use foreman_core::validate::validate_instance_url;
use foreman_core::{CoreError, Instance, InstanceView};
use tokio::sync::Mutex;

use crate::client::InstanceClient;

/// Registry of remote worker instances, ordered by registration.
pub struct InstanceRegistry {
    /// The single coordination lock for all instance state.
    instances: Mutex<Vec<Instance>>,
    /// Snapshot file path. `None` disables persistence.
    snapshot_path: Option<PathBuf>,
}

impl InstanceRegistry {
    /// An empty registry without snapshot persistence.
    pub fn new() -> Self {
        Self {
            instances: Mutex::new(Vec::new()),
            snapshot_path: None,
        }
    }

    /// A registry persisting to `path`, seeded from the existing snapshot
    /// when one is present.
    ///
    /// `busy` flags are reset on load: a restarted process has no
    /// in-flight dispatches, and a stale flag would strand the instance
    /// forever.
    pub async fn with_snapshot(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let instances = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<Vec<Instance>>(&raw) {
                Ok(mut list) => {
                    for instance in &mut list {
                        instance.busy = false;
                    }
                    tracing::info!(
                        count = list.len(),
                        path = %path.display(),
                        "Loaded instance snapshot"
                    );
                    list
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        path = %path.display(),
                        "Ignoring unreadable instance snapshot"
                    );
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };

        Self {
            instances: Mutex::new(instances),
            snapshot_path: Some(path),
        }
    }

    /// Register a new instance, idle and assumed healthy until the first
    /// probe. The url is the unique key; duplicates are rejected.
    pub async fn add(&self, url: &str, token: Option<String>) -> Result<(), CoreError> {
        validate_instance_url(url)?;

        let mut instances = self.instances.lock().await;
        if instances.iter().any(|i| i.url == url) {
            return Err(CoreError::Validation(format!(
                "Instance {url} is already registered"
            )));
        }
        instances.push(Instance::new(url, token));
        tracing::info!(url, count = instances.len(), "Instance added");
        self.persist(&instances).await;
        Ok(())
    }

    /// Deregister an instance. An instance executing a task cannot be
    /// removed.
    pub async fn remove(&self, url: &str) -> Result<(), CoreError> {
        let mut instances = self.instances.lock().await;
        let Some(position) = instances.iter().position(|i| i.url == url) else {
            return Err(CoreError::NotFound {
                entity: "instance",
                id: url.to_string(),
            });
        };
        if instances[position].busy {
            return Err(CoreError::Busy("Instance is busy".to_string()));
        }
        instances.remove(position);
        tracing::info!(url, count = instances.len(), "Instance removed");
        self.persist(&instances).await;
        Ok(())
    }

    /// Snapshot of all instances without sensitive fields.
    pub async fn list(&self) -> Vec<InstanceView> {
        self.instances
            .lock()
            .await
            .iter()
            .map(InstanceView::from)
            .collect()
    }

    /// First idle healthy instance in registration order, or `None`.
    ///
    /// Plain first-fit; the single-consumer dispatcher has at most one
    /// task in flight, so nothing more is needed.
    pub async fn select_available(&self) -> Option<Instance> {
        self.instances
            .lock()
            .await
            .iter()
            .find(|i| i.is_available())
            .cloned()
    }

    /// First registered instance regardless of health or busy state.
    /// Used only by the passthrough proxy.
    pub async fn select_default(&self) -> Option<Instance> {
        self.instances.lock().await.first().cloned()
    }

    /// Toggle the busy flag.
    ///
    /// Calls must be paired: set before dispatch, clear on the cleanup
    /// path regardless of outcome.
    pub async fn mark_busy(&self, url: &str, busy: bool) {
        let mut instances = self.instances.lock().await;
        match instances.iter_mut().find(|i| i.url == url) {
            Some(instance) => {
                instance.busy = busy;
                self.persist(&instances).await;
            }
            None => tracing::warn!(url, busy, "mark_busy on unknown instance"),
        }
    }

    /// Probe every instance and update its health flags, all under the
    /// coordination lock.
    ///
    /// Instances are judged independently; one unreachable instance never
    /// aborts the pass. The snapshot is rewritten once at the end.
    pub async fn run_health_cycle(&self, client: &InstanceClient, probe_timeout: Duration) {
        let mut instances = self.instances.lock().await;
        for instance in instances.iter_mut() {
            instance.healthy = client.probe(instance, probe_timeout).await;
            instance.last_check = Some(Utc::now());
            tracing::debug!(
                url = %instance.url,
                healthy = instance.healthy,
                "Probed instance"
            );
        }
        self.persist(&instances).await;
        tracing::debug!(count = instances.len(), "Health cycle complete");
    }

    /// Rewrite the snapshot file. Failures are logged, never fatal.
    async fn persist(&self, instances: &[Instance]) {
        let Some(path) = &self.snapshot_path else {
            return;
        };
        let raw = match serde_json::to_string_pretty(instances) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize instance snapshot");
                return;
            }
        };
        if let Err(e) = tokio::fs::write(path, raw).await {
            tracing::error!(
                error = %e,
                path = %path.display(),
                "Failed to write instance snapshot"
            );
        }
    }

    #[cfg(test)]
    pub(crate) async fn set_healthy(&self, url: &str, healthy: bool) {
        let mut instances = self.instances.lock().await;
        if let Some(instance) = instances.iter_mut().find(|i| i.url == url) {
            instance.healthy = healthy;
        }
    }
}

impl Default for InstanceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
