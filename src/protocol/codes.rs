//! Machine-readable codes carried by `error` and `system` envelopes.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Code attached to every relay-originated `error` envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ErrorCode {
    /// The `role` of a join was neither `client` nor `executor`.
    #[serde(alias = "INVALID_ROLE")]
    InvalidRole,
    /// A channel name was required but absent or empty.
    #[serde(alias = "MISSING_CHANNEL")]
    MissingChannel,
    /// The requested slot is held by another connection.
    #[serde(alias = "ROLE_OCCUPIED")]
    RoleOccupied,
    /// The sender is not a member of the channel it addressed.
    #[serde(alias = "NOT_JOINED")]
    NotJoined,
    /// The frame was not a valid envelope.
    MalformedEnvelope,
    /// The envelope type is only ever sent by the relay.
    UnsupportedEnvelope,
    /// Unexpected relay-side failure.
    Internal,
}

impl ErrorCode {
    /// Wire spelling of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRole => "InvalidRole",
            Self::MissingChannel => "MissingChannel",
            Self::RoleOccupied => "RoleOccupied",
            Self::NotJoined => "NotJoined",
            Self::MalformedEnvelope => "MalformedEnvelope",
            Self::UnsupportedEnvelope => "UnsupportedEnvelope",
            Self::Internal => "Internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Code attached to advisory `system` notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoticeCode {
    /// A peer occupies (or just took) the opposite slot.
    PeerJoined,
    /// The peer in the opposite slot went away.
    PeerLeft,
    /// Both sides reported different versions.
    VersionMismatch,
    /// The channel was torn down by a reset.
    ChannelReset,
}
