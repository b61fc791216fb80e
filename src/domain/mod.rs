//! Domain layer: connections, channels, and the channel registry.
//!
//! Nothing in here touches a socket. Connections are represented by their
//! outbound queues ([`ConnectionHandle`]) and the registry decides which
//! queue each frame lands in.

pub mod channel;
pub mod channel_registry;
pub mod connection;
pub mod connection_id;

pub use channel::{Channel, ChannelMember, ChannelSnapshot, SlotSnapshot};
pub use channel_registry::{ChannelRegistry, Delivery, JoinOutcome, Membership, ResetOutcome};
pub use connection::{ConnectionHandle, Outbound};
pub use connection_id::ConnectionId;
