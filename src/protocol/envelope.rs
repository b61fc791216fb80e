//! Envelope types: the discriminated JSON frames exchanged over the socket.
//!
//! Inbound to the relay: `join`, `reset`, `message`, `progress_update`.
//! Outbound from the relay: `broadcast`, `system`, `error`.
//!
//! `message.id` is the correlation key. The relay never rewrites it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::{ErrorCode, NoticeCode, Role, VersionSkew};
use crate::error::RelayError;

/// Top-level envelope, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// Occupy a slot in a channel.
    Join(JoinEnvelope),
    /// Tear down a channel and evict its occupants.
    Reset(ResetEnvelope),
    /// Command or reply traffic for the peer.
    Message(ForwardEnvelope),
    /// Progress report for a long-running command.
    ProgressUpdate(ForwardEnvelope),
    /// Relay → peer delivery of a `message` or `progress_update`.
    Broadcast(BroadcastEnvelope),
    /// Relay notices and correlated results.
    System(SystemEnvelope),
    /// Relay-originated protocol error.
    Error(ErrorEnvelope),
}

/// Command payload nested under `message` for command traffic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandMessage {
    /// Correlation id, echoed back unchanged in the reply.
    pub id: String,
    /// Command name understood by the executor.
    pub command: String,
    /// Command arguments; carries a redundant `commandId` copy of `id`.
    #[serde(default)]
    pub params: Value,
}

/// Body of a `join` envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinEnvelope {
    /// Correlation id for the join acknowledgement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Channel to join.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Requested role, validated by the relay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Version of the joining software.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Display name of the joining party.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The join command itself, as built by the correlator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<CommandMessage>,
}

impl JoinEnvelope {
    /// The id to acknowledge: the envelope's own, else the nested command's.
    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or_else(|| self.message.as_ref().map(|m| m.id.as_str()))
    }
}

/// Body of a `reset` envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResetEnvelope {
    /// Correlation id for the reset acknowledgement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Channel to reset; defaults to the sender's own channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

/// Body of `message` and `progress_update` envelopes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForwardEnvelope {
    /// Optional top-level correlation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Channel the sender belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Opaque payload delivered to the peer.
    #[serde(default)]
    pub message: Value,
}

/// Which inbound envelope type a broadcast was produced from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForwardKind {
    /// Forwarded from a `message` envelope.
    #[default]
    Message,
    /// Forwarded from a `progress_update` envelope.
    ProgressUpdate,
}

/// Body of a `broadcast` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastEnvelope {
    /// Channel the payload travelled through.
    pub channel: String,
    /// Role of the sender.
    pub sender: Role,
    /// Original envelope type.
    #[serde(default)]
    pub kind: ForwardKind,
    /// Top-level id of the original envelope, if it had one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The original `message` payload, untouched.
    #[serde(default)]
    pub message: Value,
}

/// Description of a channel occupant, carried by peer notices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PeerInfo {
    /// Slot the peer occupies.
    pub role: Role,
    /// Version the peer reported at join time.
    #[serde(default)]
    pub version: Option<String>,
    /// Display name the peer reported at join time.
    #[serde(default)]
    pub name: Option<String>,
    /// When the peer joined.
    pub joined_at: DateTime<Utc>,
}

/// Correlated result inside a `system` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Id of the request being answered.
    pub id: String,
    /// Result value.
    pub result: Value,
}

/// Payload of a `system` envelope: plain text or a correlated result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SystemMessage {
    /// Human-readable notice.
    Text(String),
    /// Result correlated by id.
    Result(CommandResult),
    /// Anything else; tolerated on input.
    Other(Value),
}

/// Body of a `system` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemEnvelope {
    /// Channel the notice concerns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Notice code; absent for plain acknowledgements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<NoticeCode>,
    /// Notice text or correlated result.
    pub message: SystemMessage,
    /// Peer described by `PEER_JOINED` / `PEER_LEFT`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer: Option<PeerInfo>,
    /// Details of a `VERSION_MISMATCH`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_mismatch: Option<VersionSkew>,
}

/// Body of an `error` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Id of the offending request, when it could be correlated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Machine-readable code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Channel involved, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl Envelope {
    /// Parses a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MalformedEnvelope`] if the frame is not JSON
    /// or does not match any envelope shape.
    pub fn parse(text: &str) -> Result<Self, RelayError> {
        serde_json::from_str(text).map_err(|e| RelayError::MalformedEnvelope(e.to_string()))
    }

    /// Wire name of the envelope type.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Join(_) => "join",
            Self::Reset(_) => "reset",
            Self::Message(_) => "message",
            Self::ProgressUpdate(_) => "progress_update",
            Self::Broadcast(_) => "broadcast",
            Self::System(_) => "system",
            Self::Error(_) => "error",
        }
    }

    /// Correlation id the sender attached, if any.
    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            Self::Join(join) => join.correlation_id(),
            Self::Reset(reset) => reset.id.as_deref(),
            Self::Message(fwd) | Self::ProgressUpdate(fwd) => fwd
                .id
                .as_deref()
                .or_else(|| fwd.message.get("id").and_then(Value::as_str)),
            Self::Broadcast(b) => b.id.as_deref(),
            Self::System(s) => match &s.message {
                SystemMessage::Result(r) => Some(r.id.as_str()),
                _ => None,
            },
            Self::Error(e) => e.id.as_deref(),
        }
    }

    /// Channel the envelope names, if any.
    #[must_use]
    pub fn channel(&self) -> Option<&str> {
        match self {
            Self::Join(join) => join.channel.as_deref(),
            Self::Reset(reset) => reset.channel.as_deref(),
            Self::Message(fwd) | Self::ProgressUpdate(fwd) => fwd.channel.as_deref(),
            Self::Broadcast(b) => Some(b.channel.as_str()),
            Self::System(s) => s.channel.as_deref(),
            Self::Error(e) => e.channel.as_deref(),
        }
    }

    /// Sent to every connection right after the upgrade.
    #[must_use]
    pub fn welcome() -> Self {
        Self::system_text(None, "Please join a channel to start chatting")
    }

    /// Plain-text `system` notice.
    #[must_use]
    pub fn system_text(channel: Option<&str>, text: impl Into<String>) -> Self {
        Self::System(SystemEnvelope {
            channel: channel.map(str::to_string),
            code: None,
            message: SystemMessage::Text(text.into()),
            peer: None,
            version_mismatch: None,
        })
    }

    /// Id-correlated `system` result.
    #[must_use]
    pub fn system_result(channel: Option<&str>, id: &str, result: Value) -> Self {
        Self::System(SystemEnvelope {
            channel: channel.map(str::to_string),
            code: None,
            message: SystemMessage::Result(CommandResult {
                id: id.to_string(),
                result,
            }),
            peer: None,
            version_mismatch: None,
        })
    }

    /// `PEER_JOINED` notice describing `peer`.
    #[must_use]
    pub fn peer_joined(channel: &str, peer: PeerInfo) -> Self {
        let text = format!("{} joined channel {channel}", peer_label(&peer));
        Self::notice(channel, NoticeCode::PeerJoined, text, Some(peer), None)
    }

    /// `PEER_LEFT` notice describing the departed `peer`.
    #[must_use]
    pub fn peer_left(channel: &str, peer: PeerInfo) -> Self {
        let text = format!("{} left channel {channel}", peer_label(&peer));
        Self::notice(channel, NoticeCode::PeerLeft, text, Some(peer), None)
    }

    /// `VERSION_MISMATCH` advisory addressed to `recipient`.
    #[must_use]
    pub fn version_mismatch(channel: &str, skew: VersionSkew, recipient: Role) -> Self {
        let text = skew.advisory_for(recipient);
        Self::notice(channel, NoticeCode::VersionMismatch, text, None, Some(skew))
    }

    /// `CHANNEL_RESET` notice sent to evicted occupants.
    #[must_use]
    pub fn channel_reset(channel: &str) -> Self {
        let text = format!("Channel {channel} was reset; rejoin to continue");
        Self::notice(channel, NoticeCode::ChannelReset, text, None, None)
    }

    /// `error` envelope for a relay-side failure.
    #[must_use]
    pub fn error(id: Option<&str>, channel: Option<&str>, err: &RelayError) -> Self {
        Self::Error(ErrorEnvelope {
            id: id.map(str::to_string),
            code: err.error_code(),
            message: err.to_string(),
            channel: channel.map(str::to_string),
        })
    }

    fn notice(
        channel: &str,
        code: NoticeCode,
        text: String,
        peer: Option<PeerInfo>,
        version_mismatch: Option<VersionSkew>,
    ) -> Self {
        Self::System(SystemEnvelope {
            channel: Some(channel.to_string()),
            code: Some(code),
            message: SystemMessage::Text(text),
            peer,
            version_mismatch,
        })
    }
}

fn peer_label(peer: &PeerInfo) -> String {
    let mut label = peer.role.describe().to_string();
    if let Some(name) = &peer.name {
        label.push_str(&format!(" ({name})"));
    }
    if let Some(version) = &peer.version {
        label.push_str(&format!(" v{version}"));
    }
    label
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_join_from_correlator() {
        let text = r#"{
            "id": "j-1",
            "type": "join",
            "channel": "design-1",
            "role": "mcp",
            "version": "1.2.0",
            "name": "workspace",
            "message": {"id": "j-1", "command": "join", "params": {"channel": "design-1", "commandId": "j-1"}}
        }"#;
        let Ok(Envelope::Join(join)) = Envelope::parse(text) else {
            panic!("expected join");
        };
        assert_eq!(join.channel.as_deref(), Some("design-1"));
        assert_eq!(join.role.as_deref(), Some("mcp"));
        assert_eq!(join.correlation_id(), Some("j-1"));
    }

    #[test]
    fn join_id_falls_back_to_nested_message() {
        let join = JoinEnvelope {
            message: Some(CommandMessage {
                id: "inner".to_string(),
                command: "join".to_string(),
                params: Value::Null,
            }),
            ..JoinEnvelope::default()
        };
        assert_eq!(join.correlation_id(), Some("inner"));
    }

    #[test]
    fn malformed_frame_is_rejected() {
        let result = Envelope::parse("{not json");
        assert!(matches!(result, Err(RelayError::MalformedEnvelope(_))));

        let result = Envelope::parse(r#"{"type":"teleport"}"#);
        assert!(matches!(result, Err(RelayError::MalformedEnvelope(_))));
    }

    #[test]
    fn message_correlation_id_reads_nested_id() {
        let env = Envelope::parse(
            r#"{"type":"message","channel":"c","message":{"id":"cmd-7","result":{"ok":true}}}"#,
        );
        let Ok(env) = env else {
            panic!("expected message");
        };
        assert_eq!(env.kind(), "message");
        assert_eq!(env.correlation_id(), Some("cmd-7"));
        assert_eq!(env.channel(), Some("c"));
    }

    #[test]
    fn system_text_and_result_are_distinguished() {
        let text = serde_json::to_value(Envelope::system_text(Some("c"), "Joined channel: c"))
            .unwrap_or_default();
        assert_eq!(text["type"], "system");
        assert_eq!(text["message"], "Joined channel: c");

        let result = Envelope::system_result(Some("c"), "j-1", json!("Connected to channel: c"));
        let Ok(round) = Envelope::parse(&serde_json::to_string(&result).unwrap_or_default())
        else {
            panic!("expected system");
        };
        assert_eq!(round.correlation_id(), Some("j-1"));
    }

    #[test]
    fn broadcast_kind_defaults_to_message() {
        let env = Envelope::parse(
            r#"{"type":"broadcast","channel":"c","sender":"plugin","message":{"id":"x"}}"#,
        );
        let Ok(Envelope::Broadcast(b)) = env else {
            panic!("expected broadcast");
        };
        assert_eq!(b.kind, ForwardKind::Message);
        assert_eq!(b.sender, Role::Executor);
    }

    #[test]
    fn error_envelope_carries_code() {
        let err = RelayError::MissingChannel;
        let value = serde_json::to_value(Envelope::error(Some("r-1"), None, &err))
            .unwrap_or_default();
        assert_eq!(value["type"], "error");
        assert_eq!(value["code"], "MissingChannel");
        assert_eq!(value["id"], "r-1");
        assert!(value.get("channel").is_none());
    }

    #[test]
    fn peer_notice_describes_peer() {
        let peer = PeerInfo {
            role: Role::Executor,
            version: Some("1.2.0".to_string()),
            name: Some("Figma".to_string()),
            joined_at: Utc::now(),
        };
        let Envelope::System(notice) = Envelope::peer_joined("c", peer) else {
            panic!("expected system notice");
        };
        assert_eq!(notice.code, Some(NoticeCode::PeerJoined));
        let SystemMessage::Text(text) = notice.message else {
            panic!("expected text");
        };
        assert!(text.contains("An executor plugin (Figma) v1.2.0"));
    }
}
