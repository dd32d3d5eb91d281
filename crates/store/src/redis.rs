//! Redis-backed store: list queue, flat status keys, pub/sub results.

use async_trait::async_trait;
use futures::StreamExt;
use redis::AsyncCommands;
use tokio::sync::mpsc;

use crate::keys::TASK_QUEUE_KEY;
use crate::{KvStore, ResultBus, StoreError, TaskQueue};

/// Buffer size of the channel between the pub/sub forwarder task and a
/// subscriber.
const SUBSCRIBER_BUFFER: usize = 256;

/// Store implementation backed by a single Redis deployment.
///
/// Queue operations use `RPUSH`/`LPOP` on a list, status records live
/// under flat string keys, and results travel over Redis pub/sub. One
/// multiplexed connection serves all request/response commands;
/// `subscribe` opens a dedicated pub/sub connection per call, as the
/// protocol requires.
pub struct RedisStore {
    client: redis::Client,
    conn: redis::aio::MultiplexedConnection,
}

impl RedisStore {
    /// Connect to Redis at `url` (e.g. `redis://127.0.0.1:6379/0`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)
            .map_err(|e| StoreError::Connection(format!("Invalid Redis URL: {e}")))?;
        let conn = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to connect to Redis: {e}")))?;

        tracing::info!("Connected to Redis");
        Ok(Self { client, conn })
    }
}

fn backend_err(err: redis::RedisError) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl TaskQueue for RedisStore {
    async fn push_tail(&self, payload: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.rpush::<_, _, ()>(TASK_QUEUE_KEY, payload)
            .await
            .map_err(backend_err)
    }

    async fn pop_head(&self) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let head: Option<String> = conn
            .lpop(TASK_QUEUE_KEY, None)
            .await
            .map_err(backend_err)?;
        Ok(head)
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await.map_err(backend_err)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value).await.map_err(backend_err)
    }
}

#[async_trait]
impl ResultBus for RedisStore {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.publish::<_, _, ()>(topic, payload)
            .await
            .map_err(backend_err)
    }

    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<String>, StoreError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to open pub/sub: {e}")))?;
        pubsub.subscribe(topic).await.map_err(backend_err)?;

        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let topic = topic.to_string();

        // Drive the pub/sub connection from a dedicated task, forwarding
        // payloads until the subscriber drops its receiver.
        tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            while let Some(message) = stream.next().await {
                let payload: String = match message.get_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::warn!(
                            topic = %topic,
                            error = %e,
                            "Discarding undecodable pub/sub message"
                        );
                        continue;
                    }
                };
                if tx.send(payload).await.is_err() {
                    break;
                }
            }
            tracing::debug!(topic = %topic, "Pub/sub forwarder exited");
        });

        Ok(rx)
    }
}
