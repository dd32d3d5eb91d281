//! Domain types shared across the foreman crates.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Instance
// ---------------------------------------------------------------------------

/// A remote worker capable of executing one task at a time.
///
/// The `url` is the unique key within the registry. Instances are owned
/// exclusively by the registry and mutated only under its lock: `busy` by
/// the dispatcher, `healthy`/`last_check` by the health monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    /// Base URL, e.g. `http://worker1:8000`.
    pub url: String,
    /// Optional bearer token sent on invocations and health probes.
    pub token: Option<String>,
    /// Set while a task is executing on this instance.
    pub busy: bool,
    /// Verdict of the most recent health probe.
    pub healthy: bool,
    /// When the most recent health probe ran.
    pub last_check: Option<DateTime<Utc>>,
}

impl Instance {
    /// A freshly registered instance: idle, assumed healthy, stamped now.
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            url: url.into(),
            token,
            busy: false,
            healthy: true,
            last_check: Some(Utc::now()),
        }
    }

    /// Whether the dispatcher may assign a task to this instance.
    pub fn is_available(&self) -> bool {
        !self.busy && self.healthy
    }
}

/// Instance projection returned to clients. Carries no token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceView {
    pub url: String,
    pub busy: bool,
    pub healthy: bool,
    pub last_check: Option<DateTime<Utc>>,
}

impl From<&Instance> for InstanceView {
    fn from(instance: &Instance) -> Self {
        Self {
            url: instance.url.clone(),
            busy: instance.busy,
            healthy: instance.healthy,
            last_check: instance.last_check,
        }
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A unit of submitted work. Immutable once created; only its
/// [`TaskStatus`] record evolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique id generated at submission.
    pub id: String,
    /// Opaque JSON document passed through to the instance unmodified.
    pub payload: Value,
}

impl Task {
    /// Create a task with a fresh UUID v4 id.
    pub fn new(payload: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            payload,
        }
    }
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskState {
    /// Completed and failed records are never left once reached.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Canonical status record for one task id.
///
/// Overwritten in place on each transition; last writer wins, no history
/// kept. Written directly by the dispatcher, so it remains authoritative
/// even when the result channel drops a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub status: TaskState,
    /// The instance executing the task, recorded once running.
    pub instance_url: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Human-readable failure message for terminal `failed` records.
    pub error: Option<String>,
    /// Instance response body for terminal `completed` records.
    pub result: Option<Value>,
}

impl TaskStatus {
    /// A fresh submission record.
    pub fn pending() -> Self {
        Self {
            status: TaskState::Pending,
            instance_url: None,
            start_time: None,
            end_time: None,
            error: None,
            result: None,
        }
    }

    /// A record for a task just popped off the queue.
    pub fn running(start_time: DateTime<Utc>) -> Self {
        Self {
            status: TaskState::Running,
            instance_url: None,
            start_time: Some(start_time),
            end_time: None,
            error: None,
            result: None,
        }
    }
}

// ---------------------------------------------------------------------------
// TaskOutcome
// ---------------------------------------------------------------------------

/// Wire message broadcast on the result channel for each terminal
/// outcome. Exactly one of `data` / `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskOutcome {
    pub fn completed(task_id: impl Into<String>, data: Value) -> Self {
        Self {
            task_id: task_id.into(),
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(task_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            data: None,
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_instance_is_idle_and_healthy() {
        let instance = Instance::new("http://worker1:8000", None);
        assert!(!instance.busy);
        assert!(instance.healthy);
        assert!(instance.last_check.is_some());
        assert!(instance.is_available());
    }

    #[test]
    fn busy_or_unhealthy_instance_is_not_available() {
        let mut instance = Instance::new("http://worker1:8000", None);
        instance.busy = true;
        assert!(!instance.is_available());

        instance.busy = false;
        instance.healthy = false;
        assert!(!instance.is_available());
    }

    #[test]
    fn instance_view_has_no_token_field() {
        let instance = Instance::new("http://worker1:8000", Some("secret".to_string()));
        let view = InstanceView::from(&instance);
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("token").is_none());
        assert_eq!(json["url"], "http://worker1:8000");
    }

    #[test]
    fn task_ids_are_unique() {
        let a = Task::new(json!({}));
        let b = Task::new(json!({}));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn task_state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TaskState::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&TaskState::Completed).unwrap(),
            "\"completed\""
        );
    }

    #[test]
    fn outcome_omits_unset_fields_on_the_wire() {
        let completed = TaskOutcome::completed("t1", json!({"ok": true}));
        let json = serde_json::to_value(&completed).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["data"]["ok"], true);

        let failed = TaskOutcome::failed("t2", "boom");
        let json = serde_json::to_value(&failed).unwrap();
        assert!(json.get("data").is_none());
        assert_eq!(json["error"], "boom");
    }

    #[test]
    fn status_roundtrips_through_json() {
        let status = TaskStatus {
            status: TaskState::Completed,
            instance_url: Some("http://worker1:8000".to_string()),
            start_time: Some(Utc::now()),
            end_time: Some(Utc::now()),
            error: None,
            result: Some(json!({"frames": 24})),
        };
        let raw = serde_json::to_string(&status).unwrap();
        let parsed: TaskStatus = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, status);
    }
}
