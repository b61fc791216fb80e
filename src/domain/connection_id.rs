//! Stable per-connection identifier.
//!
//! Assigned at accept time. The registry is keyed by it instead of by
//! socket identity, so every close path can purge state explicitly.

use std::fmt;

/// Unique identifier for an accepted WebSocket connection.
///
/// A random UUID v4, generated once per upgrade and never reused. Keys
/// the relay's connection table and its reverse channel index, and shows
/// up as `conn_id` in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    /// Allocates a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}
