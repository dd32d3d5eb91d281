//! The queue-consuming dispatch loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use foreman_core::{Task, TaskOutcome, TaskState, TaskStatus};
use foreman_store::{keys, ResultBus, Store, StoreError, TaskQueue};
use tokio_util::sync::CancellationToken;

use crate::client::InstanceClient;
use crate::registry::InstanceRegistry;
use crate::repo::TaskStatusRepo;

/// Single-consumer dispatcher: pops tasks, assigns instances, records
/// outcomes.
///
/// Exactly one dispatcher loop runs per process. Remote invocation blocks
/// the loop, so execution is serialized even when several healthy
/// instances exist. Single-consumer operation is also what allows
/// `select_available` and `mark_busy` to remain separate steps under the
/// registry lock; a second dispatcher would require merging them into one
/// atomic operation.
pub struct Dispatcher {
    store: Arc<dyn Store>,
    registry: Arc<InstanceRegistry>,
    client: InstanceClient,
    poll_interval: Duration,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<InstanceRegistry>,
        client: InstanceClient,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            registry,
            client,
            poll_interval,
        }
    }

    /// Consume the queue until cancelled.
    ///
    /// A failed cycle is logged and absorbed; the loop never terminates
    /// because of a single task or store error.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(
            poll_ms = self.poll_interval.as_millis() as u64,
            "Dispatcher started"
        );

        let mut tick = tokio::time::interval(self.poll_interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Dispatcher stopping");
                    break;
                }
                _ = tick.tick() => {
                    if let Err(e) = self.run_once().await {
                        tracing::error!(error = %e, "Dispatch cycle failed");
                    }
                }
            }
        }
    }

    /// Process at most one task from the queue head.
    ///
    /// Returns `Ok(true)` when a task was popped (dispatched or
    /// requeued), `Ok(false)` when the queue was empty.
    pub async fn run_once(&self) -> Result<bool, StoreError> {
        let Some(raw) = self.store.pop_head().await? else {
            return Ok(false);
        };
        let task: Task = match serde_json::from_str(&raw) {
            Ok(task) => task,
            Err(e) => {
                tracing::error!(error = %e, "Discarding undecodable task descriptor");
                return Ok(true);
            }
        };
        self.dispatch(task).await?;
        Ok(true)
    }

    /// Run one task through the state machine:
    /// running -> (completed | failed), or back to pending when no
    /// instance is free.
    async fn dispatch(&self, task: Task) -> Result<(), StoreError> {
        let mut status = TaskStatus::running(Utc::now());
        TaskStatusRepo::set(self.store.as_ref(), &task.id, &status).await?;

        let Some(instance) = self.registry.select_available().await else {
            // At-least-once with no backoff: the task goes back on the
            // tail and is retried next cycle. Starves if no instance ever
            // frees up, which callers accept.
            tracing::warn!(task_id = %task.id, "No instance available, requeueing");
            let raw = serde_json::to_string(&task)
                .map_err(|e| StoreError::Backend(format!("Failed to serialize task: {e}")))?;
            self.store.push_tail(&raw).await?;
            status.status = TaskState::Pending;
            TaskStatusRepo::set(self.store.as_ref(), &task.id, &status).await?;
            return Ok(());
        };

        self.registry.mark_busy(&instance.url, true).await;
        status.instance_url = Some(instance.url.clone());
        TaskStatusRepo::set(self.store.as_ref(), &task.id, &status).await?;

        tracing::info!(task_id = %task.id, url = %instance.url, "Dispatching task");
        let invocation = self.client.run_task(&instance, &task.payload).await;

        // The busy flag must clear even when the invocation or the status
        // write failed, so the write result is held until after cleanup.
        let write = match invocation {
            Ok(result) => {
                tracing::info!(task_id = %task.id, url = %instance.url, "Task completed");
                status.status = TaskState::Completed;
                status.end_time = Some(Utc::now());
                status.result = Some(result.clone());
                let write = TaskStatusRepo::set(self.store.as_ref(), &task.id, &status).await;
                self.publish(TaskOutcome::completed(&task.id, result)).await;
                write
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(
                    task_id = %task.id,
                    url = %instance.url,
                    error = %message,
                    "Task failed"
                );
                status.status = TaskState::Failed;
                status.end_time = Some(Utc::now());
                status.error = Some(message.clone());
                let write = TaskStatusRepo::set(self.store.as_ref(), &task.id, &status).await;
                self.publish(TaskOutcome::failed(&task.id, message)).await;
                write
            }
        };

        self.registry.mark_busy(&instance.url, false).await;
        write
    }

    /// Publish a terminal outcome on the result channel. Failures are
    /// logged only; the canonical record is already written.
    async fn publish(&self, outcome: TaskOutcome) {
        let payload = match serde_json::to_string(&outcome) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(task_id = %outcome.task_id, error = %e, "Failed to serialize outcome");
                return;
            }
        };
        if let Err(e) = self.store.publish(keys::TASK_RESULTS_TOPIC, &payload).await {
            tracing::error!(task_id = %outcome.task_id, error = %e, "Failed to publish outcome");
        }
    }
}
