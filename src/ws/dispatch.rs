//! Type-keyed dispatch of inbound envelopes.

use serde_json::json;

use crate::domain::ConnectionId;
use crate::error::RelayError;
use crate::protocol::{Envelope, ForwardKind};
use crate::service::RelayService;

/// Handles one text frame from `conn`.
///
/// Returns the direct reply for the sender, if any: an `error` envelope
/// when the frame was rejected, or the acknowledgement of a `reset`.
/// Everything else the sender receives is queued by the registry.
pub async fn dispatch(relay: &RelayService, conn: ConnectionId, text: &str) -> Option<Envelope> {
    let envelope = match Envelope::parse(text) {
        Ok(envelope) => envelope,
        Err(err) => {
            tracing::debug!(conn_id = %conn, error = %err, "unparseable frame");
            return Some(Envelope::error(None, None, &err));
        }
    };

    let id = envelope.correlation_id().map(str::to_string);
    let channel = envelope.channel().map(str::to_string);

    let result = match envelope {
        Envelope::Join(join) => relay.join(conn, &join).await.map(|_| None),
        Envelope::Reset(reset) => {
            relay
                .reset(Some(conn), reset.channel.as_deref())
                .await
                .map(|outcome| {
                    let summary = json!({
                        "reset": outcome.existed,
                        "channel": outcome.channel,
                        "closed": outcome.closed,
                    });
                    Some(match reset.id.as_deref() {
                        Some(id) => Envelope::system_result(Some(&outcome.channel), id, summary),
                        None => Envelope::system_text(
                            Some(&outcome.channel),
                            format!("Channel {} reset", outcome.channel),
                        ),
                    })
                })
        }
        Envelope::Message(fwd) => relay
            .forward(conn, ForwardKind::Message, fwd)
            .await
            .map(|_| None),
        Envelope::ProgressUpdate(fwd) => relay
            .forward(conn, ForwardKind::ProgressUpdate, fwd)
            .await
            .map(|_| None),
        other @ (Envelope::Broadcast(_) | Envelope::System(_) | Envelope::Error(_)) => {
            Err(RelayError::UnsupportedEnvelope(other.kind().to_string()))
        }
    };

    result.unwrap_or_else(|err| Some(Envelope::error(id.as_deref(), channel.as_deref(), &err)))
}
