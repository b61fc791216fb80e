//! Error types for the relay, the correlator, and configuration.
//!
//! [`RelayError`] is the central relay-side error. Each variant maps to a
//! wire [`ErrorCode`] (sent inside `error` envelopes) and to an HTTP status
//! code for the control plane. [`CorrelatorError`] is what callers of the
//! client-side correlator see.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::protocol::{ErrorCode, Role};

/// Structured JSON error response body.
///
/// All control-plane error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": "MissingChannel",
///     "message": "channel name is required"
///   }
/// }
/// ```
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with wire code and human-readable message.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Wire error code.
    pub code: ErrorCode,
    /// Human-readable error message.
    pub message: String,
}

/// Relay-side protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The join named a role other than `client` / `executor`.
    #[error("invalid role {0:?}: expected \"client\" or \"executor\"")]
    InvalidRole(String),

    /// A channel name was required but absent or empty.
    #[error("channel name is required")]
    MissingChannel,

    /// The slot is held by another live connection.
    #[error("{} is already connected to channel {channel:?}", .role.describe())]
    RoleOccupied {
        /// Channel that was requested.
        channel: String,
        /// Role whose slot is taken.
        role: Role,
    },

    /// The sender has not joined the channel it addressed.
    #[error("you must join channel {0:?} first")]
    NotJoined(String),

    /// The frame could not be parsed as an envelope.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The envelope type is relay-to-peer only.
    #[error("envelope type {0:?} cannot be sent to the relay")]
    UnsupportedEnvelope(String),

    /// Internal relay error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Returns the wire code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidRole(_) => ErrorCode::InvalidRole,
            Self::MissingChannel => ErrorCode::MissingChannel,
            Self::RoleOccupied { .. } => ErrorCode::RoleOccupied,
            Self::NotJoined(_) => ErrorCode::NotJoined,
            Self::MalformedEnvelope(_) => ErrorCode::MalformedEnvelope,
            Self::UnsupportedEnvelope(_) => ErrorCode::UnsupportedEnvelope,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRole(_)
            | Self::MissingChannel
            | Self::MalformedEnvelope(_)
            | Self::UnsupportedEnvelope(_) => StatusCode::BAD_REQUEST,
            Self::RoleOccupied { .. } => StatusCode::CONFLICT,
            Self::NotJoined(_) => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

/// Failures surfaced by the client-side correlator.
///
/// `NotConnected`, `NoChannelJoined`, `RequestTimeout` and
/// `ConnectionClosed` are synthesised locally; `Relay` and `Command`
/// carry errors reported by the relay or the executor.
#[derive(Debug, thiserror::Error)]
pub enum CorrelatorError {
    /// The transport is not open. A connection attempt has been triggered.
    #[error("not connected to the relay at {url}; attempting to connect")]
    NotConnected {
        /// Relay URL the correlator is configured for.
        url: String,
    },

    /// A non-join command was sent before any channel was joined.
    #[error(
        "no channel joined; join the channel shown in the executor plugin before sending commands"
    )]
    NoChannelJoined,

    /// No reply or progress arrived within the deadline.
    #[error("request {id} timed out after {after:?} of inactivity: {hint}")]
    RequestTimeout {
        /// Correlation id of the request.
        id: String,
        /// Inactivity window that elapsed.
        after: Duration,
        /// Diagnostic hint naming the relay URL and channel.
        hint: String,
    },

    /// The transport closed while the request was pending.
    #[error("connection to the relay closed")]
    ConnectionClosed,

    /// The relay rejected the request.
    #[error("relay rejected request ({code}): {message}")]
    Relay {
        /// Wire error code.
        code: ErrorCode,
        /// Relay-supplied message.
        message: String,
    },

    /// The executor replied with an error.
    #[error("command failed: {0}")]
    Command(String),

    /// Command params were neither an object nor null.
    #[error("command params must be a JSON object")]
    InvalidParams,

    /// The relay base URL could not be used to build a request URL.
    #[error("invalid relay url: {0}")]
    InvalidUrl(String),

    /// WebSocket transport failure.
    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// Control-plane HTTP failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CorrelatorError {
    /// Returns `true` if the relay refused the requested slot.
    #[must_use]
    pub const fn is_role_occupied(&self) -> bool {
        matches!(
            self,
            Self::Relay {
                code: ErrorCode::RoleOccupied,
                ..
            }
        )
    }
}

/// Invalid configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Host/port did not form a socket address.
    #[error("invalid listen address {addr:?}: {source}")]
    InvalidListenAddr {
        /// The rejected `host:port` string.
        addr: String,
        /// Parse failure.
        source: std::net::AddrParseError,
    },
}
