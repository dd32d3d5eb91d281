//! Foreman domain types, task lifecycle rules, and error taxonomy.
//!
//! This crate has zero internal dependencies so every other crate in the
//! workspace can build on it.

pub mod error;
pub mod lifecycle;
pub mod types;
pub mod validate;

pub use error::CoreError;
pub use types::{Instance, InstanceView, Task, TaskOutcome, TaskState, TaskStatus};
