//! Wire protocol shared by the relay and the correlator.
//!
//! All frames are JSON text frames discriminated by `type`. See
//! [`Envelope`] for the full set.

pub mod codes;
pub mod envelope;
pub mod role;
pub mod version;

pub use codes::{ErrorCode, NoticeCode};
pub use envelope::{
    BroadcastEnvelope, CommandMessage, CommandResult, Envelope, ErrorEnvelope, ForwardEnvelope,
    ForwardKind, JoinEnvelope, PeerInfo, ResetEnvelope, SystemEnvelope, SystemMessage,
};
pub use role::Role;
pub use version::{VersionSkew, compare_versions};

/// Version this build reports when joining a channel.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");
