//! Result-channel listener.
//!
//! Mirrors each terminal outcome into the denormalized
//! `task:{id}:result` / `task:{id}:error` keys so synchronous waiters
//! can answer with a single key read. The canonical status record
//! written by the dispatcher remains the source of truth; a message
//! missed here loses an optimization, not an answer.

use std::sync::Arc;

use foreman_core::TaskOutcome;
use foreman_store::{keys, ResultBus, Store};
use tokio_util::sync::CancellationToken;

use crate::repo::TaskStatusRepo;

/// Background service consuming the `task_results` topic.
pub struct ResultListener;

impl ResultListener {
    /// Subscribe and process messages until cancelled or the channel
    /// closes.
    pub async fn run(store: Arc<dyn Store>, cancel: CancellationToken) {
        let mut receiver = match store.subscribe(keys::TASK_RESULTS_TOPIC).await {
            Ok(receiver) => receiver,
            Err(e) => {
                tracing::error!(error = %e, "Result listener failed to subscribe");
                return;
            }
        };
        tracing::info!("Result listener started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Result listener stopping");
                    break;
                }
                message = receiver.recv() => {
                    match message {
                        Some(payload) => Self::handle(store.as_ref(), &payload).await,
                        None => {
                            tracing::info!("Result channel closed, listener exiting");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Write one outcome's denormalized key. Malformed messages and
    /// store failures are logged and skipped.
    async fn handle(store: &dyn Store, payload: &str) {
        let outcome: TaskOutcome = match serde_json::from_str(payload) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed result message");
                return;
            }
        };

        let write = match (&outcome.data, &outcome.error) {
            (_, Some(error)) => TaskStatusRepo::set_error(store, &outcome.task_id, error).await,
            (Some(data), None) => TaskStatusRepo::set_result(store, &outcome.task_id, data).await,
            (None, None) => {
                tracing::warn!(
                    task_id = %outcome.task_id,
                    "Result message carries neither data nor error"
                );
                return;
            }
        };

        if let Err(e) = write {
            tracing::error!(
                task_id = %outcome.task_id,
                error = %e,
                "Failed to write denormalized outcome"
            );
        }
    }
}
