//! In-memory store for tests and single-process deployments.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::{KvStore, ResultBus, StoreError, TaskQueue};

/// Buffer size of each subscriber channel.
const SUBSCRIBER_BUFFER: usize = 256;

/// Process-local implementation of the full [`Store`](crate::Store)
/// surface.
///
/// Queue order and key-value semantics match the Redis backend. Pub/sub
/// fans out to all live subscribers with at-most-once delivery: a closed
/// or full subscriber simply misses messages, mirroring Redis pub/sub.
#[derive(Default)]
pub struct MemoryStore {
    queue: Mutex<VecDeque<String>>,
    kv: Mutex<HashMap<String, String>>,
    subscribers: Mutex<HashMap<String, Vec<mpsc::Sender<String>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskQueue for MemoryStore {
    async fn push_tail(&self, payload: &str) -> Result<(), StoreError> {
        self.queue.lock().await.push_back(payload.to_string());
        Ok(())
    }

    async fn pop_head(&self) -> Result<Option<String>, StoreError> {
        Ok(self.queue.lock().await.pop_front())
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.kv.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.kv
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[async_trait]
impl ResultBus for MemoryStore {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), StoreError> {
        let mut subscribers = self.subscribers.lock().await;
        if let Some(senders) = subscribers.get_mut(topic) {
            senders.retain(|tx| !tx.is_closed());
            for tx in senders.iter() {
                // A full buffer drops the message for that subscriber.
                let _ = tx.try_send(payload.to_string());
            }
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<String>, StoreError> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        self.subscribers
            .lock()
            .await
            .entry(topic.to_string())
            .or_default()
            .push(tx);
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queue_preserves_fifo_order() {
        let store = MemoryStore::new();
        store.push_tail("a").await.unwrap();
        store.push_tail("b").await.unwrap();
        store.push_tail("c").await.unwrap();

        assert_eq!(store.pop_head().await.unwrap().as_deref(), Some("a"));
        assert_eq!(store.pop_head().await.unwrap().as_deref(), Some("b"));
        assert_eq!(store.pop_head().await.unwrap().as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn pop_on_empty_queue_returns_none() {
        let store = MemoryStore::new();
        assert_eq!(store.pop_head().await.unwrap(), None);
    }

    #[tokio::test]
    async fn kv_overwrites_in_place() {
        let store = MemoryStore::new();
        store.set("task:1", "first").await.unwrap();
        store.set("task:1", "second").await.unwrap();
        assert_eq!(store.get("task:1").await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn missing_key_returns_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("task:absent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn subscriber_receives_published_message() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe("task_results").await.unwrap();

        store.publish("task_results", "{\"task_id\":\"1\"}").await.unwrap();

        let message = rx.recv().await.expect("should receive the message");
        assert_eq!(message, "{\"task_id\":\"1\"}");
    }

    #[tokio::test]
    async fn publish_without_subscribers_succeeds() {
        let store = MemoryStore::new();
        store.publish("task_results", "orphan").await.unwrap();
    }

    #[tokio::test]
    async fn message_published_before_subscribe_is_lost() {
        let store = MemoryStore::new();
        store.publish("task_results", "early").await.unwrap();

        let mut rx = store.subscribe("task_results").await.unwrap();
        store.publish("task_results", "late").await.unwrap();

        assert_eq!(rx.recv().await.as_deref(), Some("late"));
    }

    #[tokio::test]
    async fn topics_are_isolated() {
        let store = MemoryStore::new();
        let mut results = store.subscribe("task_results").await.unwrap();
        let mut other = store.subscribe("other").await.unwrap();

        store.publish("task_results", "for-results").await.unwrap();

        assert_eq!(results.recv().await.as_deref(), Some("for-results"));
        assert!(other.try_recv().is_err());
    }
}
