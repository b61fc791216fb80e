//! System endpoint DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"healthy"` while the process serves requests.
    pub status: String,
    /// Relay build version.
    pub version: String,
    /// Live channels.
    pub channels: usize,
    /// Open WebSocket connections.
    pub connections: usize,
    /// RFC 3339 server time.
    pub timestamp: String,
}
