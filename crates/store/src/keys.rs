//! Key and topic layout shared by the queue, status store, and result
//! channel.

/// List key holding pending task descriptors in FIFO order.
pub const TASK_QUEUE_KEY: &str = "task_queue";

/// Pub/sub topic carrying one message per terminal task outcome.
pub const TASK_RESULTS_TOPIC: &str = "task_results";

/// Canonical status record for a task.
pub fn task_key(task_id: &str) -> String {
    format!("task:{task_id}")
}

/// Denormalized result payload written by the result listener.
pub fn task_result_key(task_id: &str) -> String {
    format!("task:{task_id}:result")
}

/// Denormalized error string written by the result listener.
pub fn task_error_key(task_id: &str) -> String {
    format!("task:{task_id}:error")
}
