//! Storage collaborators behind the dispatch engine.
//!
//! Three narrow interfaces back the core: a durable FIFO task queue, a
//! key-value status store, and a publish/subscribe result channel.
//! [`RedisStore`] implements all three against one Redis deployment;
//! [`MemoryStore`] is a process-local stand-in for tests and embedded
//! single-process use.
//!
//! A store is constructed explicitly at startup and shared via
//! `Arc<dyn Store>`; there is no global connection state.

pub mod keys;
pub mod memory;
pub mod redis;

use async_trait::async_trait;
use tokio::sync::mpsc;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Error type shared by all storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to reach or authenticate with the backend.
    #[error("Store connection error: {0}")]
    Connection(String),

    /// A backend command failed or returned undecodable data.
    #[error("Store error: {0}")]
    Backend(String),
}

impl From<StoreError> for foreman_core::CoreError {
    fn from(err: StoreError) -> Self {
        foreman_core::CoreError::Internal(err.to_string())
    }
}

/// Ordered, externally persisted list of pending task descriptors.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Append a serialized task descriptor to the tail of the queue.
    async fn push_tail(&self, payload: &str) -> Result<(), StoreError>;

    /// Non-blocking pop from the head. `None` when the queue is empty.
    async fn pop_head(&self) -> Result<Option<String>, StoreError>;
}

/// Durable key-value store, overwrite-on-write.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Publish/subscribe channel for terminal task outcomes.
///
/// Delivery is at-most-once per publish: a message published while no
/// subscriber is listening is lost. Consumers must treat the canonical
/// status record as the source of truth, not this channel.
#[async_trait]
pub trait ResultBus: Send + Sync {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), StoreError>;

    /// Open a subscription. Messages arrive on the returned channel until
    /// the backend connection closes or the receiver is dropped.
    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<String>, StoreError>;
}

/// The full storage surface the dispatch engine needs.
pub trait Store: TaskQueue + KvStore + ResultBus {}

impl<T: TaskQueue + KvStore + ResultBus> Store for T {}
