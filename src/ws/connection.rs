//! Per-connection read/write loop.
//!
//! One task per socket. It reads frames from the peer and hands text
//! frames to [`dispatch`]; it also drains the connection's outbound queue,
//! which is the only way the registry reaches the socket.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};

use super::dispatch::dispatch;
use crate::domain::{ConnectionHandle, Outbound};
use crate::protocol::Envelope;
use crate::service::RelayService;

/// Runs the read/write loop for a single upgraded socket.
///
/// Always ends with a registry disconnect, whichever side closed first.
pub async fn run_connection(socket: WebSocket, relay: Arc<RelayService>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (handle, mut outbound) = ConnectionHandle::new();
    let conn = relay.accept(handle).await;

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        // Written directly so it precedes anything the
                        // operation queued for this connection.
                        let reply = dispatch(&relay, conn, text.as_str()).await;
                        if let Some(reply) = reply
                            && send_envelope(&mut ws_tx, &reply).await.is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => relay.mark_alive(conn).await,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!(conn_id = %conn, error = %err, "socket error");
                        break;
                    }
                    _ => {}
                }
            }
            action = outbound.recv() => {
                let Some(action) = action else { break };
                match action {
                    Outbound::Frame(envelope) => {
                        if send_envelope(&mut ws_tx, &envelope).await.is_err() {
                            break;
                        }
                    }
                    Outbound::Ping => {
                        if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                            break;
                        }
                    }
                    Outbound::Close(reason) => {
                        let frame = CloseFrame {
                            code: close_code::NORMAL,
                            reason: reason.into(),
                        };
                        let _ = ws_tx.send(Message::Close(Some(frame))).await;
                        break;
                    }
                    Outbound::Terminate => break,
                }
            }
        }
    }

    // Stop accepting queued actions before the registry forgets us.
    outbound.close();
    relay.disconnect(conn).await;
    tracing::debug!(conn_id = %conn, "ws connection closed");
}

async fn send_envelope(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    envelope: &Envelope,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(envelope).unwrap_or_default();
    ws_tx.send(Message::text(json)).await
}
