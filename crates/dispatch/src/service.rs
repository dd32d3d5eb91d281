//! Task submission: synchronous wait, fire-and-forget, status lookup.

use std::sync::Arc;
use std::time::Duration;

use foreman_core::{CoreError, Task, TaskState, TaskStatus};
use foreman_store::{Store, TaskQueue};
use serde_json::Value;

use crate::repo::TaskStatusRepo;

/// Terminal outcome observed by a synchronous submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The instance's JSON response body.
    Completed(Value),
    /// Task-level failure. Delivered as a payload, never as a transport
    /// error.
    Failed { task_id: String, error: String },
}

/// Submission front end shared by the HTTP handlers.
pub struct TaskService {
    store: Arc<dyn Store>,
    /// Sleep between result checks in [`submit_sync`](Self::submit_sync).
    wait_poll_interval: Duration,
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>, wait_poll_interval: Duration) -> Self {
        Self {
            store,
            wait_poll_interval,
        }
    }

    /// Enqueue and return the generated task id immediately.
    pub async fn submit_async(&self, payload: Value) -> Result<String, CoreError> {
        let task = Task::new(payload);
        self.enqueue(&task).await?;
        Ok(task.id)
    }

    /// Enqueue, then block until a terminal outcome is observed.
    ///
    /// Each round checks the denormalized error key, the denormalized
    /// result key, then the canonical record, and sleeps a fixed
    /// interval. There is no upper bound; callers may rely on unbounded
    /// waiting.
    pub async fn submit_sync(&self, payload: Value) -> Result<SyncOutcome, CoreError> {
        let task = Task::new(payload);
        self.enqueue(&task).await?;

        loop {
            if let Some(error) = TaskStatusRepo::error(self.store.as_ref(), &task.id).await? {
                return Ok(SyncOutcome::Failed {
                    task_id: task.id,
                    error,
                });
            }
            if let Some(result) = TaskStatusRepo::result(self.store.as_ref(), &task.id).await? {
                return Ok(SyncOutcome::Completed(result));
            }

            // Fall back to the canonical record: the listener may have
            // missed the publish.
            if let Some(status) = TaskStatusRepo::get(self.store.as_ref(), &task.id).await? {
                match status.status {
                    TaskState::Failed => {
                        return Ok(SyncOutcome::Failed {
                            task_id: task.id,
                            error: status.error.unwrap_or_else(|| "Task failed".to_string()),
                        });
                    }
                    TaskState::Completed => {
                        if let Some(result) = status.result {
                            return Ok(SyncOutcome::Completed(result));
                        }
                    }
                    TaskState::Pending | TaskState::Running => {}
                }
            }

            tokio::time::sleep(self.wait_poll_interval).await;
        }
    }

    /// Canonical status record for `task_id`.
    pub async fn get_status(&self, task_id: &str) -> Result<TaskStatus, CoreError> {
        TaskStatusRepo::get(self.store.as_ref(), task_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "task",
                id: task_id.to_string(),
            })
    }

    /// Record the pending status, then push the descriptor.
    ///
    /// Status-before-enqueue: a fast dispatcher must never observe a
    /// task ahead of its status record.
    async fn enqueue(&self, task: &Task) -> Result<(), CoreError> {
        TaskStatusRepo::set(self.store.as_ref(), &task.id, &TaskStatus::pending()).await?;
        let raw = serde_json::to_string(task)
            .map_err(|e| CoreError::Internal(format!("Failed to serialize task: {e}")))?;
        self.store.push_tail(&raw).await?;
        tracing::debug!(task_id = %task.id, "Task enqueued");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use foreman_core::TaskOutcome;
    use foreman_store::{keys, MemoryStore, ResultBus, TaskQueue};
    use serde_json::json;

    fn service(store: Arc<MemoryStore>) -> TaskService {
        TaskService::new(store, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn submit_async_records_pending_and_enqueues() {
        let store = Arc::new(MemoryStore::new());
        let service = service(Arc::clone(&store));

        let task_id = service.submit_async(json!({"prompt": "a cat"})).await.unwrap();

        let status = service.get_status(&task_id).await.unwrap();
        assert_eq!(status.status, TaskState::Pending);

        let raw = store.pop_head().await.unwrap().expect("descriptor queued");
        let task: Task = serde_json::from_str(&raw).unwrap();
        assert_eq!(task.id, task_id);
        assert_eq!(task.payload, json!({"prompt": "a cat"}));
    }

    #[tokio::test]
    async fn get_status_unknown_task_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store);

        let err = service.get_status("nope").await.unwrap_err();
        assert_matches!(err, CoreError::NotFound { entity: "task", .. });
    }

    #[tokio::test]
    async fn status_reads_are_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let service = service(Arc::clone(&store));

        let task_id = service.submit_async(json!({})).await.unwrap();
        let first = service.get_status(&task_id).await.unwrap();
        let second = service.get_status(&task_id).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn sync_submit_returns_result_from_denormalized_key() {
        let store = Arc::new(MemoryStore::new());
        let service = service(Arc::clone(&store));

        // Stand-in for the dispatcher + listener: pop the descriptor and
        // write the denormalized result key.
        let worker_store = Arc::clone(&store);
        tokio::spawn(async move {
            loop {
                if let Some(raw) = worker_store.pop_head().await.unwrap() {
                    let task: Task = serde_json::from_str(&raw).unwrap();
                    TaskStatusRepo::set_result(worker_store.as_ref(), &task.id, &json!({"ok": 1}))
                        .await
                        .unwrap();
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });

        let outcome = tokio::time::timeout(
            Duration::from_secs(2),
            service.submit_sync(json!({"prompt": "a cat"})),
        )
        .await
        .expect("sync wait must observe the result")
        .unwrap();

        assert_eq!(outcome, SyncOutcome::Completed(json!({"ok": 1})));
    }

    #[tokio::test]
    async fn sync_submit_falls_back_to_canonical_record() {
        let store = Arc::new(MemoryStore::new());
        let service = service(Arc::clone(&store));

        // Only the canonical record is written, no denormalized keys,
        // as when the listener missed the publish.
        let worker_store = Arc::clone(&store);
        tokio::spawn(async move {
            loop {
                if let Some(raw) = worker_store.pop_head().await.unwrap() {
                    let task: Task = serde_json::from_str(&raw).unwrap();
                    let mut status = TaskStatus::running(Utc::now());
                    TaskStatusRepo::set(worker_store.as_ref(), &task.id, &status)
                        .await
                        .unwrap();
                    status.status = TaskState::Failed;
                    status.error = Some("boom".to_string());
                    TaskStatusRepo::set(worker_store.as_ref(), &task.id, &status)
                        .await
                        .unwrap();
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });

        let outcome = tokio::time::timeout(
            Duration::from_secs(2),
            service.submit_sync(json!({"prompt": "a cat"})),
        )
        .await
        .expect("sync wait must observe the failure")
        .unwrap();

        assert_matches!(outcome, SyncOutcome::Failed { error, .. } if error == "boom");
    }

    #[tokio::test]
    async fn outcome_message_matches_wire_format() {
        // The sync path and the listener must agree on the wire shape.
        let store = Arc::new(MemoryStore::new());
        let mut rx = store.subscribe(keys::TASK_RESULTS_TOPIC).await.unwrap();

        let outcome = TaskOutcome::failed("t1", "boom");
        store
            .publish(
                keys::TASK_RESULTS_TOPIC,
                &serde_json::to_string(&outcome).unwrap(),
            )
            .await
            .unwrap();

        let raw = rx.recv().await.unwrap();
        let parsed: TaskOutcome = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, outcome);
    }
}
