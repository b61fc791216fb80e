//! Channel record: the two role slots of a named rendezvous point.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{ConnectionHandle, ConnectionId};
use crate::protocol::{PeerInfo, Role};

/// Occupant of one slot of a [`Channel`].
///
/// Owned exclusively by the channel holding it. Created on a successful
/// join and dropped on disconnect or reset.
#[derive(Debug, Clone)]
pub struct ChannelMember {
    /// Connection occupying the slot.
    pub conn: ConnectionId,
    /// Outbound queue of that connection.
    pub handle: ConnectionHandle,
    /// Slot held.
    pub role: Role,
    /// Version reported at join time.
    pub version: Option<String>,
    /// Display name reported at join time.
    pub display_name: Option<String>,
    /// When the slot was taken.
    pub joined_at: DateTime<Utc>,
}

impl ChannelMember {
    /// Creates a member joining now.
    #[must_use]
    pub fn new(
        handle: ConnectionHandle,
        role: Role,
        version: Option<String>,
        display_name: Option<String>,
    ) -> Self {
        Self {
            conn: handle.id(),
            handle,
            role,
            version,
            display_name,
            joined_at: Utc::now(),
        }
    }

    /// Wire description of this member for peer notices.
    #[must_use]
    pub fn info(&self) -> PeerInfo {
        PeerInfo {
            role: self.role,
            version: self.version.clone(),
            name: self.display_name.clone(),
            joined_at: self.joined_at,
        }
    }
}

/// Named rendezvous point with at most one member per role.
///
/// Created lazily on the first join and removed by the registry as soon
/// as both slots are empty.
#[derive(Debug, Clone)]
pub struct Channel {
    /// Channel name (registry key).
    pub name: String,
    client: Option<ChannelMember>,
    executor: Option<ChannelMember>,
}

impl Channel {
    /// Creates an empty channel.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            client: None,
            executor: None,
        }
    }

    /// Occupant of `role`'s slot.
    #[must_use]
    pub const fn slot(&self, role: Role) -> Option<&ChannelMember> {
        match role {
            Role::Client => self.client.as_ref(),
            Role::Executor => self.executor.as_ref(),
        }
    }

    /// Places `member` in its role's slot, returning any previous occupant.
    pub fn occupy(&mut self, member: ChannelMember) -> Option<ChannelMember> {
        let slot = match member.role {
            Role::Client => &mut self.client,
            Role::Executor => &mut self.executor,
        };
        slot.replace(member)
    }

    /// Empties `role`'s slot.
    pub fn vacate(&mut self, role: Role) -> Option<ChannelMember> {
        match role {
            Role::Client => self.client.take(),
            Role::Executor => self.executor.take(),
        }
    }

    /// Returns `true` when neither slot is occupied.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.client.is_none() && self.executor.is_none()
    }

    /// Consumes the channel, yielding its occupants.
    pub fn into_members(self) -> impl Iterator<Item = ChannelMember> {
        self.client.into_iter().chain(self.executor)
    }

    /// Snapshot of both slots for the control plane.
    #[must_use]
    pub fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            client: SlotSnapshot::from(self.slot(Role::Client)),
            executor: SlotSnapshot::from(self.slot(Role::Executor)),
        }
    }
}

/// Occupancy of a single slot as reported by `GET /channels`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SlotSnapshot {
    /// Whether a live connection holds the slot.
    pub connected: bool,
    /// Reported version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Reported display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Join time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<DateTime<Utc>>,
}

impl From<Option<&ChannelMember>> for SlotSnapshot {
    fn from(member: Option<&ChannelMember>) -> Self {
        member.map_or_else(Self::default, |m| Self {
            connected: m.handle.is_open(),
            version: m.version.clone(),
            name: m.display_name.clone(),
            joined_at: Some(m.joined_at),
        })
    }
}

/// Occupancy of both slots of a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChannelSnapshot {
    /// Client slot.
    pub client: SlotSnapshot,
    /// Executor slot.
    pub executor: SlotSnapshot,
}
