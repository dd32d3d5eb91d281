//! Typed access to task status records over the key-value store.

use foreman_core::{lifecycle, TaskStatus};
use foreman_store::{keys, KvStore, Store, StoreError};
use serde_json::Value;

/// Reads and writes the canonical `task:{id}` record plus the
/// denormalized result/error lookup keys.
pub struct TaskStatusRepo;

impl TaskStatusRepo {
    /// Fetch the canonical status record.
    pub async fn get(store: &dyn Store, task_id: &str) -> Result<Option<TaskStatus>, StoreError> {
        let Some(raw) = store.get(&keys::task_key(task_id)).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw).map(Some).map_err(|e| {
            StoreError::Backend(format!("Corrupt status record for task {task_id}: {e}"))
        })
    }

    /// Overwrite the canonical status record.
    ///
    /// A write that is not a valid lifecycle transition from the existing
    /// record is dropped; in particular, completed and failed records are
    /// never overwritten. Same-state rewrites (e.g. stamping the
    /// instance url onto a running record) are always allowed.
    pub async fn set(
        store: &dyn Store,
        task_id: &str,
        status: &TaskStatus,
    ) -> Result<(), StoreError> {
        if let Some(existing) = Self::get(store, task_id).await? {
            if existing.status != status.status
                && !lifecycle::can_transition(existing.status, status.status)
            {
                tracing::warn!(
                    task_id,
                    from = %existing.status,
                    to = %status.status,
                    "Dropping invalid status transition"
                );
                return Ok(());
            }
        }
        let raw = serde_json::to_string(status)
            .map_err(|e| StoreError::Backend(format!("Failed to serialize status: {e}")))?;
        store.set(&keys::task_key(task_id), &raw).await
    }

    /// Read the denormalized result payload, if the listener wrote one.
    pub async fn result(store: &dyn Store, task_id: &str) -> Result<Option<Value>, StoreError> {
        let Some(raw) = store.get(&keys::task_result_key(task_id)).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw).map(Some).map_err(|e| {
            StoreError::Backend(format!("Corrupt result payload for task {task_id}: {e}"))
        })
    }

    /// Read the denormalized error string, if the listener wrote one.
    pub async fn error(store: &dyn Store, task_id: &str) -> Result<Option<String>, StoreError> {
        store.get(&keys::task_error_key(task_id)).await
    }

    /// Write the denormalized result payload.
    pub async fn set_result(
        store: &dyn Store,
        task_id: &str,
        data: &Value,
    ) -> Result<(), StoreError> {
        let raw = serde_json::to_string(data)
            .map_err(|e| StoreError::Backend(format!("Failed to serialize result: {e}")))?;
        store.set(&keys::task_result_key(task_id), &raw).await
    }

    /// Write the denormalized error string.
    pub async fn set_error(
        store: &dyn Store,
        task_id: &str,
        error: &str,
    ) -> Result<(), StoreError> {
        store.set(&keys::task_error_key(task_id), error).await
    }
}
