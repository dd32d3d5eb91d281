//! Periodic instance health monitoring.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client::InstanceClient;
use crate::registry::InstanceRegistry;

/// Background prober that keeps every instance's `healthy` flag current.
///
/// One probe cycle locks the registry, probes each instance with a
/// bounded timeout, and rewrites the snapshot. `MissedTickBehavior::Delay`
/// plus the registry lock inside the cycle guarantee that cycles never
/// overlap under scheduling jitter.
pub struct HealthMonitor {
    registry: Arc<InstanceRegistry>,
    client: InstanceClient,
    check_interval: Duration,
    probe_timeout: Duration,
}

impl HealthMonitor {
    pub fn new(
        registry: Arc<InstanceRegistry>,
        client: InstanceClient,
        check_interval: Duration,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            client,
            check_interval,
            probe_timeout,
        }
    }

    /// Run probe cycles on a fixed cadence until cancelled.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(
            interval_secs = self.check_interval.as_secs(),
            timeout_secs = self.probe_timeout.as_secs(),
            "Health monitor started"
        );

        // The first tick fires immediately, probing the instances loaded
        // from the snapshot at startup.
        let mut tick = tokio::time::interval(self.check_interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Health monitor stopping");
                    break;
                }
                _ = tick.tick() => {
                    self.registry
                        .run_health_cycle(&self.client, self.probe_timeout)
                        .await;
                }
            }
        }
    }
}
