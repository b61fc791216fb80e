//! Relay service: serialized access to the channel registry.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::{
    ChannelRegistry, ChannelSnapshot, ConnectionHandle, ConnectionId, Delivery, JoinOutcome,
    Membership, ResetOutcome,
};
use crate::error::RelayError;
use crate::protocol::{ForwardEnvelope, ForwardKind, JoinEnvelope};

/// Counters reported by `GET /health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    /// Live channels.
    pub channels: usize,
    /// Accepted connections, joined or not.
    pub connections: usize,
}

/// Orchestration layer over [`ChannelRegistry`].
///
/// Every registry operation runs under one async mutex, so join, forward,
/// reset, disconnect and the liveness sweep never interleave. Each method
/// is lock → mutate → log → return.
#[derive(Debug, Clone, Default)]
pub struct RelayService {
    registry: Arc<Mutex<ChannelRegistry>>,
}

impl RelayService {
    /// Creates a service over an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection and sends the welcome notice.
    pub async fn accept(&self, handle: ConnectionHandle) -> ConnectionId {
        let conn = self.registry.lock().await.accept(handle);
        tracing::debug!(conn_id = %conn, "connection accepted");
        conn
    }

    /// Joins `conn` to the channel named in `request`.
    ///
    /// # Errors
    ///
    /// See [`ChannelRegistry::join`].
    pub async fn join(
        &self,
        conn: ConnectionId,
        request: &JoinEnvelope,
    ) -> Result<JoinOutcome, RelayError> {
        let outcome = self.registry.lock().await.join(conn, request);
        match &outcome {
            Ok(JoinOutcome::Joined {
                peer_present,
                version_mismatch,
            }) => {
                tracing::info!(
                    conn_id = %conn,
                    channel = request.channel.as_deref().unwrap_or_default(),
                    role = request.role.as_deref().unwrap_or_default(),
                    version = request.version.as_deref().unwrap_or("unknown"),
                    peer_present,
                    "joined channel"
                );
                if *version_mismatch {
                    tracing::warn!(
                        channel = request.channel.as_deref().unwrap_or_default(),
                        "peer versions differ"
                    );
                }
            }
            Ok(JoinOutcome::AlreadyJoined) => {
                tracing::debug!(conn_id = %conn, "repeated join for held slot");
            }
            Err(err) => {
                tracing::warn!(conn_id = %conn, error = %err, "join rejected");
            }
        }
        outcome
    }

    /// Forwards a `message` or `progress_update` to the peer.
    ///
    /// # Errors
    ///
    /// See [`ChannelRegistry::forward`].
    pub async fn forward(
        &self,
        conn: ConnectionId,
        kind: ForwardKind,
        envelope: ForwardEnvelope,
    ) -> Result<Delivery, RelayError> {
        let channel = envelope.channel.clone().unwrap_or_default();
        let delivery = self.registry.lock().await.forward(conn, kind, envelope)?;
        match delivery {
            Delivery::Delivered { to } => {
                tracing::debug!(conn_id = %conn, %channel, %to, ?kind, "forwarded");
            }
            Delivery::Dropped => {
                tracing::debug!(conn_id = %conn, %channel, ?kind, "no peer; dropped");
            }
        }
        Ok(delivery)
    }

    /// Resets a channel on behalf of a connection or the control plane.
    ///
    /// # Errors
    ///
    /// See [`ChannelRegistry::reset`].
    pub async fn reset(
        &self,
        requester: Option<ConnectionId>,
        channel: Option<&str>,
    ) -> Result<ResetOutcome, RelayError> {
        let outcome = self.registry.lock().await.reset(requester, channel)?;
        if outcome.existed {
            tracing::info!(
                channel = %outcome.channel,
                closed = outcome.closed,
                by_peer = requester.is_some(),
                "channel reset"
            );
        } else {
            tracing::debug!(channel = %outcome.channel, "reset of unknown channel");
        }
        Ok(outcome)
    }

    /// Forgets a connection that closed.
    pub async fn disconnect(&self, conn: ConnectionId) -> Option<Membership> {
        let left = self.registry.lock().await.disconnect(conn);
        if let Some(membership) = &left {
            tracing::info!(
                conn_id = %conn,
                channel = %membership.channel,
                role = %membership.role,
                "left channel"
            );
        }
        left
    }

    /// Records a pong from `conn`.
    pub async fn mark_alive(&self, conn: ConnectionId) {
        self.registry.lock().await.mark_alive(conn);
    }

    /// Runs one liveness sweep, returning the connections it terminated.
    pub async fn sweep(&self) -> Vec<ConnectionId> {
        let dead = self.registry.lock().await.sweep();
        for conn in &dead {
            tracing::info!(conn_id = %conn, "terminating unresponsive connection");
        }
        dead
    }

    /// Spawns the periodic liveness sweep.
    ///
    /// The first sweep runs one full `interval` after startup.
    pub fn spawn_heartbeat(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                service.sweep().await;
            }
        })
    }

    /// Occupancy of every channel.
    pub async fn snapshot(&self) -> BTreeMap<String, ChannelSnapshot> {
        self.registry.lock().await.snapshot()
    }

    /// Channel and connection counts.
    pub async fn stats(&self) -> RelayStats {
        let registry = self.registry.lock().await;
        RelayStats {
            channels: registry.channel_count(),
            connections: registry.connection_count(),
        }
    }

    /// Slot held by `conn`, if any.
    pub async fn membership(&self, conn: ConnectionId) -> Option<Membership> {
        self.registry.lock().await.membership(conn).cloned()
    }
}
