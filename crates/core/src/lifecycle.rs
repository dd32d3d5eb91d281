//! Task lifecycle state machine.
//!
//! `pending -> running -> {completed, failed}`, plus `running -> pending`
//! taken when no instance is available and the task goes back on the
//! queue. Terminal states have no outgoing transitions.

use crate::types::TaskState;

/// Returns the set of states reachable from `from` in one transition.
pub fn valid_transitions(from: TaskState) -> &'static [TaskState] {
    match from {
        TaskState::Pending => &[TaskState::Running],
        // Running -> Pending is the requeue edge.
        TaskState::Running => &[TaskState::Completed, TaskState::Failed, TaskState::Pending],
        TaskState::Completed | TaskState::Failed => &[],
    }
}

/// Check whether a transition from `from` to `to` is valid.
pub fn can_transition(from: TaskState, to: TaskState) -> bool {
    valid_transitions(from).contains(&to)
}
