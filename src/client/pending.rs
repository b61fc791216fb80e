//! Pending-request table with one re-armable timer per request.
//!
//! Each entry owns a oneshot sender and the abort handle of its timer
//! task. [`PendingRequests::touch`] cancels that timer and arms a new one,
//! so the deadline slides with every progress frame instead of stacking a
//! second timer on top of the first. A generation counter guards against a
//! timer that fired concurrently with its own cancellation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Mutex, oneshot};
use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::error::CorrelatorError;

/// Settlement of a pending request.
pub type Reply = Result<Value, CorrelatorError>;

#[derive(Debug)]
struct PendingRequest {
    command: String,
    reply: oneshot::Sender<Reply>,
    timer: AbortHandle,
    generation: u64,
    sent_at: Instant,
    last_activity: Instant,
    hint: String,
}

/// Requests awaiting a reply, keyed by correlation id.
#[derive(Debug, Clone, Default)]
pub struct PendingRequests {
    inner: Arc<Mutex<HashMap<String, PendingRequest>>>,
}

impl PendingRequests {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `id` with a timer of `timeout`.
    ///
    /// The returned receiver settles exactly once: with the reply, with
    /// [`CorrelatorError::RequestTimeout`] (carrying `hint`), or with
    /// [`CorrelatorError::ConnectionClosed`].
    pub async fn register(
        &self,
        id: &str,
        command: &str,
        timeout: Duration,
        hint: String,
    ) -> oneshot::Receiver<Reply> {
        let (reply, rx) = oneshot::channel();
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        if let Some(previous) = inner.remove(id) {
            previous.timer.abort();
        }
        inner.insert(
            id.to_string(),
            PendingRequest {
                command: command.to_string(),
                reply,
                timer: self.arm(id, 0, timeout),
                generation: 0,
                sent_at: now,
                last_activity: now,
                hint,
            },
        );
        rx
    }

    /// Replaces `id`'s deadline with a fresh `window` of inactivity.
    ///
    /// Returns `false` if `id` is not pending.
    pub async fn touch(&self, id: &str, window: Duration) -> bool {
        let mut inner = self.inner.lock().await;
        let Some(request) = inner.get_mut(id) else {
            return false;
        };
        request.timer.abort();
        request.generation = request.generation.wrapping_add(1);
        request.timer = self.arm(id, request.generation, window);
        request.last_activity = Instant::now();
        true
    }

    /// Settles and removes `id`. Returns `false` for unknown ids.
    pub async fn resolve(&self, id: &str, reply: Reply) -> bool {
        let Some(request) = self.inner.lock().await.remove(id) else {
            return false;
        };
        request.timer.abort();
        tracing::debug!(
            request_id = id,
            command = %request.command,
            elapsed_ms = request.sent_at.elapsed().as_millis(),
            ok = reply.is_ok(),
            "request settled"
        );
        let _ = request.reply.send(reply);
        true
    }

    /// Rejects every pending request with `ConnectionClosed` and clears
    /// the table. Returns how many were rejected.
    pub async fn reject_all(&self) -> usize {
        let drained: Vec<_> = self.inner.lock().await.drain().collect();
        let count = drained.len();
        for (id, request) in drained {
            request.timer.abort();
            tracing::debug!(request_id = %id, command = %request.command, "rejecting: connection closed");
            let _ = request.reply.send(Err(CorrelatorError::ConnectionClosed));
        }
        count
    }

    /// Whether `id` is pending.
    pub async fn contains(&self, id: &str) -> bool {
        self.inner.lock().await.contains_key(id)
    }

    /// Number of pending requests.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Whether no request is pending.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    fn arm(&self, id: &str, generation: u64, after: Duration) -> AbortHandle {
        let table = self.clone();
        let id = id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            table.expire(&id, generation, after).await;
        })
        .abort_handle()
    }

    async fn expire(&self, id: &str, generation: u64, after: Duration) {
        let mut inner = self.inner.lock().await;
        if inner.get(id).is_none_or(|r| r.generation != generation) {
            return;
        }
        let Some(request) = inner.remove(id) else {
            return;
        };
        drop(inner);
        tracing::error!(
            request_id = id,
            command = %request.command,
            idle_ms = request.last_activity.elapsed().as_millis(),
            "request timed out"
        );
        let _ = request.reply.send(Err(CorrelatorError::RequestTimeout {
            id: id.to_string(),
            after,
            hint: request.hint,
        }));
    }
}
