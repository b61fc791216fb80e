//! Control-plane DTOs for channel inspection and forced reset.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{ChannelSnapshot, ResetOutcome};

/// Response for `GET /channels`.
///
/// ```json
/// {
///   "channels": {
///     "design-1": {
///       "client":   { "connected": true, "version": "0.1.0", "name": "workspace", "joined_at": "..." },
///       "executor": { "connected": false }
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ChannelsResponse {
    /// Occupancy per channel, ordered by name.
    pub channels: BTreeMap<String, ChannelSnapshot>,
}

/// Response for `DELETE /channels/{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResetResponse {
    /// Channel that was targeted.
    pub channel: String,
    /// `true` if the channel existed and was torn down. Resetting an
    /// unknown channel still succeeds with `false`.
    pub reset: bool,
    /// Number of occupants that were disconnected.
    pub closed: usize,
}

impl From<ResetOutcome> for ResetResponse {
    fn from(outcome: ResetOutcome) -> Self {
        Self {
            channel: outcome.channel,
            reset: outcome.existed,
            closed: outcome.closed,
        }
    }
}
