//! Channel registry: slot ownership, forwarding, reset and liveness.
//!
//! [`ChannelRegistry`] is an arena of channels plus two tables keyed by
//! [`ConnectionId`]: every accepted connection (with its liveness mark)
//! and the reverse index from a connection to the slot it holds. Every
//! close path goes through [`ChannelRegistry::disconnect`], which purges
//! both tables.
//!
//! The registry is plain data with `&mut self` operations; callers
//! serialize access (see [`crate::service::RelayService`]). Side effects
//! are limited to queueing [`Outbound`](super::Outbound) actions on
//! connection handles, so the whole state machine is testable without
//! sockets.

use std::collections::{BTreeMap, HashMap};

use serde_json::json;

use super::channel::{Channel, ChannelMember, ChannelSnapshot};
use super::{ConnectionHandle, ConnectionId};
use crate::error::RelayError;
use crate::protocol::{
    BroadcastEnvelope, Envelope, ForwardEnvelope, ForwardKind, JoinEnvelope, Role, VersionSkew,
};

/// Slot held by a connection (one entry of the reverse index).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    /// Channel name.
    pub channel: String,
    /// Role within the channel.
    pub role: Role,
}

/// Result of a successful join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The slot was assigned. `peer_present` tells whether the opposite
    /// slot is occupied.
    Joined {
        /// Whether a live peer holds the opposite role.
        peer_present: bool,
        /// Whether a `VERSION_MISMATCH` advisory was sent.
        version_mismatch: bool,
    },
    /// The connection already held this exact slot.
    AlreadyJoined,
}

/// What happened to a forwarded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued for the occupant of the opposite role.
    Delivered {
        /// Role that received it.
        to: Role,
    },
    /// No live counterpart; the frame was discarded.
    Dropped,
}

/// Result of a reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetOutcome {
    /// Channel that was targeted.
    pub channel: String,
    /// Whether the channel existed.
    pub existed: bool,
    /// Number of occupant connections that were closed.
    pub closed: usize,
}

#[derive(Debug)]
struct LiveConnection {
    handle: ConnectionHandle,
    alive: bool,
}

/// Owner of all channels and connection bookkeeping.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: HashMap<String, Channel>,
    index: HashMap<ConnectionId, Membership>,
    connections: HashMap<ConnectionId, LiveConnection>,
}

impl ChannelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly upgraded connection and greets it.
    pub fn accept(&mut self, handle: ConnectionHandle) -> ConnectionId {
        let id = handle.id();
        handle.send(Envelope::welcome());
        self.connections.insert(
            id,
            LiveConnection {
                handle,
                alive: true,
            },
        );
        id
    }

    /// Places `conn` in the slot requested by `request`.
    ///
    /// On success the joiner receives a text notice and an id-correlated
    /// result; if a peer is present both sides receive `PEER_JOINED`, and
    /// if their versions differ both receive `VERSION_MISMATCH`.
    ///
    /// # Errors
    ///
    /// - [`RelayError::InvalidRole`] if the role is absent or unknown.
    /// - [`RelayError::MissingChannel`] if the channel name is empty.
    /// - [`RelayError::RoleOccupied`] if another live connection holds
    ///   the slot. The occupant is left untouched.
    /// - [`RelayError::Internal`] if `conn` was never accepted.
    pub fn join(
        &mut self,
        conn: ConnectionId,
        request: &JoinEnvelope,
    ) -> Result<JoinOutcome, RelayError> {
        let role: Role = request.role.as_deref().unwrap_or_default().parse()?;
        let name = channel_name(request.channel.as_deref())
            .ok_or(RelayError::MissingChannel)?
            .to_string();
        let handle = self
            .connections
            .get(&conn)
            .map(|c| c.handle.clone())
            .ok_or_else(|| RelayError::Internal(format!("connection {conn} is not registered")))?;
        let ack_id = request.correlation_id();

        let requested = Membership {
            channel: name.clone(),
            role,
        };
        if self.index.get(&conn) == Some(&requested) {
            acknowledge_join(&handle, &name, ack_id);
            return Ok(JoinOutcome::AlreadyJoined);
        }

        let stale = match self.channels.get(&name).and_then(|c| c.slot(role)) {
            Some(occupant) if occupant.handle.is_open() => {
                return Err(RelayError::RoleOccupied {
                    channel: name,
                    role,
                });
            }
            Some(occupant) => Some(occupant.conn),
            None => None,
        };
        if let Some(stale) = stale {
            tracing::debug!(channel = %name, %role, conn_id = %stale, "evicting closed occupant");
            self.disconnect(stale);
        }

        // A connection holds at most one slot; give up the old one first.
        self.leave(conn);

        let member = ChannelMember::new(
            handle.clone(),
            role,
            request.version.clone(),
            request.name.clone(),
        );
        let newcomer = member.info();
        let channel = self
            .channels
            .entry(name.clone())
            .or_insert_with(|| Channel::new(name.clone()));
        channel.occupy(member);
        let peer = channel
            .slot(role.opposite())
            .filter(|p| p.handle.is_open())
            .map(|p| (p.handle.clone(), p.info()));
        self.index.insert(conn, requested);

        acknowledge_join(&handle, &name, ack_id);

        let Some((peer_handle, peer_info)) = peer else {
            return Ok(JoinOutcome::Joined {
                peer_present: false,
                version_mismatch: false,
            });
        };

        peer_handle.send(Envelope::peer_joined(&name, newcomer.clone()));
        handle.send(Envelope::peer_joined(&name, peer_info.clone()));

        let (client_version, executor_version) = match role {
            Role::Client => (newcomer.version.as_deref(), peer_info.version.as_deref()),
            Role::Executor => (peer_info.version.as_deref(), newcomer.version.as_deref()),
        };
        let skew = VersionSkew::detect(client_version, executor_version);
        if let Some(skew) = &skew {
            handle.send(Envelope::version_mismatch(&name, skew.clone(), role));
            peer_handle.send(Envelope::version_mismatch(
                &name,
                skew.clone(),
                role.opposite(),
            ));
        }

        Ok(JoinOutcome::Joined {
            peer_present: true,
            version_mismatch: skew.is_some(),
        })
    }

    /// Delivers a `message` / `progress_update` from `conn` to the
    /// occupant of the opposite role in the same channel.
    ///
    /// Frames with no live counterpart are dropped: the relay has no
    /// store-and-forward.
    ///
    /// # Errors
    ///
    /// - [`RelayError::MissingChannel`] if the envelope names no channel.
    /// - [`RelayError::NotJoined`] if `conn` is not a member of it.
    pub fn forward(
        &self,
        conn: ConnectionId,
        kind: ForwardKind,
        envelope: ForwardEnvelope,
    ) -> Result<Delivery, RelayError> {
        let name =
            channel_name(envelope.channel.as_deref()).ok_or(RelayError::MissingChannel)?;
        let membership = self
            .index
            .get(&conn)
            .filter(|m| m.channel == name)
            .ok_or_else(|| RelayError::NotJoined(name.to_string()))?;
        let counterpart = self
            .channels
            .get(name)
            .and_then(|c| c.slot(membership.role.opposite()))
            .filter(|p| p.handle.is_open());

        let Some(counterpart) = counterpart else {
            return Ok(Delivery::Dropped);
        };
        let to = counterpart.role;
        let delivered = counterpart.handle.send(Envelope::Broadcast(BroadcastEnvelope {
            channel: name.to_string(),
            sender: membership.role,
            kind,
            id: envelope.id,
            message: envelope.message,
        }));
        Ok(if delivered {
            Delivery::Delivered { to }
        } else {
            Delivery::Dropped
        })
    }

    /// Tears down a channel, closing every occupant except `requester`.
    ///
    /// The channel is `explicit` when given, otherwise the requester's own.
    /// Resetting a channel that does not exist succeeds as a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MissingChannel`] if no channel was named and
    /// the requester holds no slot.
    pub fn reset(
        &mut self,
        requester: Option<ConnectionId>,
        explicit: Option<&str>,
    ) -> Result<ResetOutcome, RelayError> {
        let name = match channel_name(explicit) {
            Some(name) => name.to_string(),
            None => requester
                .and_then(|conn| self.index.get(&conn))
                .map(|m| m.channel.clone())
                .ok_or(RelayError::MissingChannel)?,
        };

        let Some(channel) = self.channels.remove(&name) else {
            return Ok(ResetOutcome {
                channel: name,
                existed: false,
                closed: 0,
            });
        };

        let mut closed = 0;
        for member in channel.into_members() {
            self.index.remove(&member.conn);
            if Some(member.conn) == requester {
                continue;
            }
            member.handle.send(Envelope::channel_reset(&name));
            member.handle.close(format!("channel {name} was reset"));
            closed += 1;
        }

        Ok(ResetOutcome {
            channel: name,
            existed: true,
            closed,
        })
    }

    /// Forgets `conn` entirely, vacating its slot and notifying the peer.
    ///
    /// Returns the slot it held, if any. Unknown connections are a no-op.
    pub fn disconnect(&mut self, conn: ConnectionId) -> Option<Membership> {
        self.connections.remove(&conn);
        self.leave(conn)
    }

    /// Marks `conn` as having answered the last ping.
    pub fn mark_alive(&mut self, conn: ConnectionId) {
        if let Some(live) = self.connections.get_mut(&conn) {
            live.alive = true;
        }
    }

    /// Runs one liveness sweep.
    ///
    /// Connections that did not answer the previous ping are terminated
    /// and disconnected; the rest are unmarked and pinged again. Returns
    /// the ids of terminated connections.
    pub fn sweep(&mut self) -> Vec<ConnectionId> {
        let mut dead = Vec::new();
        for (id, live) in &mut self.connections {
            if live.alive {
                live.alive = false;
                live.handle.ping();
            } else {
                live.handle.terminate();
                dead.push(*id);
            }
        }
        for id in &dead {
            self.disconnect(*id);
        }
        dead
    }

    /// Slot held by `conn`, if any.
    #[must_use]
    pub fn membership(&self, conn: ConnectionId) -> Option<&Membership> {
        self.index.get(&conn)
    }

    /// Looks up a channel by name.
    #[must_use]
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    /// Number of live channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of accepted connections, joined or not.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Occupancy of every channel, ordered by name.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, ChannelSnapshot> {
        self.channels
            .iter()
            .map(|(name, channel)| (name.clone(), channel.snapshot()))
            .collect()
    }

    /// Vacates `conn`'s slot without forgetting the connection itself.
    fn leave(&mut self, conn: ConnectionId) -> Option<Membership> {
        let membership = self.index.remove(&conn)?;
        let Some(channel) = self.channels.get_mut(&membership.channel) else {
            return Some(membership);
        };

        let holds_slot = channel
            .slot(membership.role)
            .is_some_and(|m| m.conn == conn);
        let departed = if holds_slot {
            channel.vacate(membership.role)
        } else {
            None
        };
        if let Some(departed) = departed {
            if let Some(peer) = channel
                .slot(membership.role.opposite())
                .filter(|p| p.handle.is_open())
            {
                peer.handle
                    .send(Envelope::peer_left(&membership.channel, departed.info()));
            }
        }
        if channel.is_empty() {
            self.channels.remove(&membership.channel);
        }
        Some(membership)
    }
}

/// Trimmed channel name, or `None` when blank.
fn channel_name(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|c| !c.is_empty())
}

/// Sends both join acknowledgements: the text notice and, when the join
/// carried an id, the id-correlated result.
fn acknowledge_join(handle: &ConnectionHandle, channel: &str, id: Option<&str>) {
    handle.send(Envelope::system_text(
        Some(channel),
        format!("Joined channel: {channel}"),
    ));
    if let Some(id) = id {
        handle.send(Envelope::system_result(
            Some(channel),
            id,
            json!(format!("Connected to channel: {channel}")),
        ));
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::domain::Outbound;
    use crate::protocol::{NoticeCode, SystemMessage};

    struct Peer {
        id: ConnectionId,
        rx: UnboundedReceiver<Outbound>,
    }

    impl Peer {
        fn drain(&mut self) -> Vec<Outbound> {
            let mut out = Vec::new();
            while let Ok(item) = self.rx.try_recv() {
                out.push(item);
            }
            out
        }

        fn envelopes(&mut self) -> Vec<Envelope> {
            self.drain()
                .into_iter()
                .filter_map(|o| match o {
                    Outbound::Frame(env) => Some(env),
                    _ => None,
                })
                .collect()
        }

        fn notices(&mut self) -> Vec<NoticeCode> {
            self.envelopes()
                .into_iter()
                .filter_map(|e| match e {
                    Envelope::System(s) => s.code,
                    _ => None,
                })
                .collect()
        }
    }

    fn connect(registry: &mut ChannelRegistry) -> Peer {
        let (handle, rx) = ConnectionHandle::new();
        let id = registry.accept(handle);
        let mut peer = Peer { id, rx };
        let _ = peer.drain();
        peer
    }

    fn join_req(channel: &str, role: &str, version: Option<&str>) -> JoinEnvelope {
        JoinEnvelope {
            id: Some(format!("join-{role}")),
            channel: Some(channel.to_string()),
            role: Some(role.to_string()),
            version: version.map(str::to_string),
            name: Some(format!("{role}-name")),
            message: None,
        }
    }

    fn forward_req(channel: &str, message: serde_json::Value) -> ForwardEnvelope {
        ForwardEnvelope {
            id: None,
            channel: Some(channel.to_string()),
            message,
        }
    }

    #[test]
    fn accept_sends_welcome() {
        let mut registry = ChannelRegistry::new();
        let (handle, mut rx) = ConnectionHandle::new();
        registry.accept(handle);
        let Ok(Outbound::Frame(Envelope::System(welcome))) = rx.try_recv() else {
            panic!("expected welcome notice");
        };
        assert!(welcome.code.is_none());
        assert_eq!(registry.connection_count(), 1);
    }

    #[test]
    fn join_acknowledges_with_text_and_correlated_result() {
        let mut registry = ChannelRegistry::new();
        let mut a = connect(&mut registry);

        let result = registry.join(a.id, &join_req("design-1", "client", Some("1.2.0")));
        assert_eq!(
            result.ok(),
            Some(JoinOutcome::Joined {
                peer_present: false,
                version_mismatch: false
            })
        );

        let envs = a.envelopes();
        assert_eq!(envs.len(), 2);
        let Some(Envelope::System(text)) = envs.first() else {
            panic!("expected text ack");
        };
        assert_eq!(
            text.message,
            SystemMessage::Text("Joined channel: design-1".to_string())
        );
        let Some(result) = envs.get(1) else {
            panic!("expected result ack");
        };
        assert_eq!(result.correlation_id(), Some("join-client"));
    }

    #[test]
    fn invalid_role_is_rejected_before_channel() {
        let mut registry = ChannelRegistry::new();
        let a = connect(&mut registry);
        let mut req = join_req("", "observer", None);
        let result = registry.join(a.id, &req);
        assert!(matches!(result, Err(RelayError::InvalidRole(_))));

        req.role = Some("client".to_string());
        let result = registry.join(a.id, &req);
        assert!(matches!(result, Err(RelayError::MissingChannel)));
        assert_eq!(registry.channel_count(), 0);
    }

    #[test]
    fn matching_versions_exchange_peer_joined_only() {
        let mut registry = ChannelRegistry::new();
        let mut a = connect(&mut registry);
        let mut b = connect(&mut registry);

        let _ = registry.join(a.id, &join_req("design-1", "client", Some("1.2.0")));
        let _ = a.drain();
        let result = registry.join(b.id, &join_req("design-1", "executor", Some("1.2.0")));
        assert_eq!(
            result.ok(),
            Some(JoinOutcome::Joined {
                peer_present: true,
                version_mismatch: false
            })
        );

        assert_eq!(a.notices(), vec![NoticeCode::PeerJoined]);
        assert_eq!(b.notices(), vec![NoticeCode::PeerJoined]);
    }

    #[test]
    fn version_mismatch_is_sent_to_both_sides() {
        let mut registry = ChannelRegistry::new();
        let mut a = connect(&mut registry);
        let mut b = connect(&mut registry);

        let _ = registry.join(a.id, &join_req("design-1", "client", Some("1.2.0")));
        let _ = a.drain();
        let _ = registry.join(b.id, &join_req("design-1", "executor", Some("1.1.0")));

        for peer in [&mut a, &mut b] {
            let mismatch = peer.envelopes().into_iter().find_map(|e| match e {
                Envelope::System(s) if s.code == Some(NoticeCode::VersionMismatch) => {
                    s.version_mismatch
                }
                _ => None,
            });
            let Some(skew) = mismatch else {
                panic!("expected VERSION_MISMATCH");
            };
            assert_eq!(skew.expected, "1.2.0");
            assert_eq!(skew.outdated, Role::Executor);
        }
    }

    #[test]
    fn second_connection_cannot_take_occupied_role() {
        let mut registry = ChannelRegistry::new();
        let mut a = connect(&mut registry);
        let c = connect(&mut registry);

        let _ = registry.join(a.id, &join_req("design-1", "client", None));
        let _ = a.drain();

        let result = registry.join(c.id, &join_req("design-1", "client", None));
        let Err(err) = result else {
            panic!("expected RoleOccupied");
        };
        assert!(matches!(err, RelayError::RoleOccupied { role: Role::Client, .. }));

        assert!(a.drain().is_empty());
        assert!(registry.membership(c.id).is_none());
        let Some(channel) = registry.channel("design-1") else {
            panic!("channel should exist");
        };
        assert_eq!(channel.slot(Role::Client).map(|m| m.conn), Some(a.id));
    }

    #[test]
    fn rejoining_same_slot_is_idempotent() {
        let mut registry = ChannelRegistry::new();
        let mut a = connect(&mut registry);
        let mut b = connect(&mut registry);

        let _ = registry.join(a.id, &join_req("design-1", "client", None));
        let _ = registry.join(b.id, &join_req("design-1", "executor", None));
        let _ = a.drain();
        let _ = b.drain();

        let result = registry.join(a.id, &join_req("design-1", "client", None));
        assert_eq!(result.ok(), Some(JoinOutcome::AlreadyJoined));
        assert!(b.drain().is_empty());
        assert!(a.notices().is_empty());
    }

    #[test]
    fn closed_occupant_does_not_block_slot() {
        let mut registry = ChannelRegistry::new();
        let a = connect(&mut registry);
        let b = connect(&mut registry);
        let _ = registry.join(a.id, &join_req("design-1", "client", None));
        let a_id = a.id;
        drop(a);

        let result = registry.join(b.id, &join_req("design-1", "client", None));
        assert!(result.is_ok());
        assert!(registry.membership(a_id).is_none());
    }

    #[test]
    fn joining_elsewhere_vacates_previous_slot() {
        let mut registry = ChannelRegistry::new();
        let a = connect(&mut registry);
        let mut b = connect(&mut registry);
        let _ = registry.join(a.id, &join_req("one", "client", None));
        let _ = registry.join(b.id, &join_req("one", "executor", None));
        let _ = b.drain();

        let _ = registry.join(a.id, &join_req("two", "client", None));
        assert_eq!(b.notices(), vec![NoticeCode::PeerLeft]);
        assert_eq!(
            registry.membership(a.id).map(|m| m.channel.as_str()),
            Some("two")
        );
    }

    #[test]
    fn forward_is_unicast_to_opposite_role_in_same_channel() {
        let mut registry = ChannelRegistry::new();
        let mut a = connect(&mut registry);
        let mut b = connect(&mut registry);
        let mut other = connect(&mut registry);
        let _ = registry.join(a.id, &join_req("x", "client", None));
        let _ = registry.join(b.id, &join_req("x", "executor", None));
        let _ = registry.join(other.id, &join_req("y", "executor", None));
        let _ = (a.drain(), b.drain(), other.drain());

        let payload = json!({"id": "cmd-7", "command": "get_node_info"});
        let delivery = registry.forward(a.id, ForwardKind::Message, forward_req("x", payload.clone()));
        assert_eq!(delivery.ok(), Some(Delivery::Delivered { to: Role::Executor }));

        let envs = b.envelopes();
        let Some(Envelope::Broadcast(broadcast)) = envs.first() else {
            panic!("expected broadcast");
        };
        assert_eq!(broadcast.sender, Role::Client);
        assert_eq!(broadcast.message, payload);
        assert!(a.drain().is_empty());
        assert!(other.drain().is_empty());
    }

    #[test]
    fn forward_without_counterpart_is_dropped() {
        let mut registry = ChannelRegistry::new();
        let a = connect(&mut registry);
        let _ = registry.join(a.id, &join_req("x", "client", None));
        let delivery = registry.forward(a.id, ForwardKind::ProgressUpdate, forward_req("x", json!({})));
        assert_eq!(delivery.ok(), Some(Delivery::Dropped));
    }

    #[test]
    fn forward_requires_membership_of_named_channel() {
        let mut registry = ChannelRegistry::new();
        let a = connect(&mut registry);
        let _ = registry.join(a.id, &join_req("x", "client", None));

        let result = registry.forward(a.id, ForwardKind::Message, forward_req("y", json!({})));
        assert!(matches!(result, Err(RelayError::NotJoined(ref c)) if c == "y"));

        let result = registry.forward(
            a.id,
            ForwardKind::Message,
            ForwardEnvelope::default(),
        );
        assert!(matches!(result, Err(RelayError::MissingChannel)));
    }

    #[test]
    fn channel_names_are_trimmed_for_forward_too() {
        let mut registry = ChannelRegistry::new();
        let mut a = connect(&mut registry);
        let mut b = connect(&mut registry);
        let _ = registry.join(a.id, &join_req(" x ", "client", None));
        let _ = registry.join(b.id, &join_req("x", "executor", None));
        let _ = (a.drain(), b.drain());

        let delivery = registry.forward(a.id, ForwardKind::Message, forward_req(" x ", json!({})));
        assert_eq!(delivery.ok(), Some(Delivery::Delivered { to: Role::Executor }));

        let blank = registry.forward(a.id, ForwardKind::Message, forward_req("  ", json!({})));
        assert!(matches!(blank, Err(RelayError::MissingChannel)));
    }

    #[test]
    fn disconnect_notifies_peer_and_removes_empty_channel() {
        let mut registry = ChannelRegistry::new();
        let a = connect(&mut registry);
        let mut b = connect(&mut registry);
        let _ = registry.join(a.id, &join_req("x", "client", Some("1.0.0")));
        let _ = registry.join(b.id, &join_req("x", "executor", None));
        let _ = b.drain();

        let left = registry.disconnect(a.id);
        assert_eq!(left.map(|m| m.role), Some(Role::Client));
        let envs = b.envelopes();
        let Some(Envelope::System(notice)) = envs.first() else {
            panic!("expected PEER_LEFT");
        };
        assert_eq!(notice.code, Some(NoticeCode::PeerLeft));
        let Some(peer) = &notice.peer else {
            panic!("PEER_LEFT describes the departed peer");
        };
        assert_eq!(peer.role, Role::Client);
        assert_eq!(peer.version.as_deref(), Some("1.0.0"));
        assert_eq!(registry.channel_count(), 1);

        registry.disconnect(b.id);
        assert_eq!(registry.channel_count(), 0);
        assert_eq!(registry.connection_count(), 0);
        assert!(registry.disconnect(b.id).is_none());
    }

    #[test]
    fn reset_closes_others_and_acknowledges_requester() {
        let mut registry = ChannelRegistry::new();
        let mut a = connect(&mut registry);
        let mut b = connect(&mut registry);
        let _ = registry.join(a.id, &join_req("x", "client", None));
        let _ = registry.join(b.id, &join_req("x", "executor", None));
        let _ = (a.drain(), b.drain());

        let outcome = registry.reset(Some(a.id), None);
        assert_eq!(
            outcome.ok(),
            Some(ResetOutcome {
                channel: "x".to_string(),
                existed: true,
                closed: 1
            })
        );

        let b_out = b.drain();
        assert!(matches!(b_out.last(), Some(Outbound::Close(_))));
        assert!(a.drain().is_empty());
        assert_eq!(registry.channel_count(), 0);
        assert!(registry.membership(a.id).is_none());
        assert!(registry.membership(b.id).is_none());
    }

    #[test]
    fn reset_of_unknown_channel_is_a_no_op() {
        let mut registry = ChannelRegistry::new();
        let outcome = registry.reset(None, Some("ghost"));
        assert_eq!(
            outcome.ok(),
            Some(ResetOutcome {
                channel: "ghost".to_string(),
                existed: false,
                closed: 0
            })
        );
        assert!(matches!(
            registry.reset(None, None),
            Err(RelayError::MissingChannel)
        ));
    }

    #[test]
    fn sweep_pings_then_terminates_silent_connections() {
        let mut registry = ChannelRegistry::new();
        let mut a = connect(&mut registry);
        let mut b = connect(&mut registry);
        let _ = registry.join(a.id, &join_req("x", "client", None));
        let _ = (a.drain(), b.drain());

        assert!(registry.sweep().is_empty());
        assert_eq!(a.drain(), vec![Outbound::Ping]);
        assert_eq!(b.drain(), vec![Outbound::Ping]);

        registry.mark_alive(b.id);
        let dead = registry.sweep();
        assert_eq!(dead, vec![a.id]);
        assert_eq!(a.drain(), vec![Outbound::Terminate]);
        assert_eq!(b.drain(), vec![Outbound::Ping]);
        assert_eq!(registry.channel_count(), 0);
        assert_eq!(registry.connection_count(), 1);
    }

    #[test]
    fn snapshot_lists_channels_by_name() {
        let mut registry = ChannelRegistry::new();
        let a = connect(&mut registry);
        let b = connect(&mut registry);
        let _ = registry.join(a.id, &join_req("b-channel", "client", Some("1.0.0")));
        let _ = registry.join(b.id, &join_req("a-channel", "executor", None));

        let snapshot = registry.snapshot();
        let names: Vec<_> = snapshot.keys().cloned().collect();
        assert_eq!(names, vec!["a-channel".to_string(), "b-channel".to_string()]);
        let Some(b_channel) = snapshot.get("b-channel") else {
            panic!("b-channel missing");
        };
        assert!(b_channel.client.connected);
        assert!(!b_channel.executor.connected);
    }
}
