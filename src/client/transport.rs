//! WebSocket transport supervisor for the correlator.
//!
//! Connects with `tokio-tungstenite`, pumps frames in both directions, and
//! reconnects after [`ClientConfig::reconnect_delay`](crate::config::ClientConfig)
//! when the socket drops. After a `RoleOccupied` rejection it parks until
//! [`Correlator::join`] asks for a connection again; requests made before
//! it parked do not count.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::correlator::Correlator;
use crate::error::CorrelatorError;
use crate::protocol::Envelope;

type RelaySocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Runs the connect / pump / reconnect loop until shutdown.
pub async fn run(correlator: Correlator) {
    let url = correlator.config().ws_url();
    let delay = correlator.config().reconnect_delay;
    let mut shutdown = correlator.subscribe_shutdown();
    let mut requests = correlator.subscribe_connect_requests();

    while !correlator.is_shutting_down() {
        tracing::info!(%url, "connecting to relay");
        match connect(&url).await {
            Ok(socket) => {
                tracing::info!(%url, "connected to relay");
                let outbound = correlator.attach().await;
                pump(socket, outbound, &correlator, &mut shutdown).await;
                tracing::info!(%url, "disconnected from relay");
            }
            Err(err) => tracing::warn!(%url, error = %err, "relay connection failed"),
        }

        let reconnect = correlator.detach().await;
        if correlator.is_shutting_down() {
            break;
        }
        if reconnect {
            tracing::info!(delay_ms = delay.as_millis(), "reconnecting after delay");
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {}
            }
        } else {
            tracing::info!("not reconnecting: channel role was rejected; join again to retry");
            // Requests seen so far predate the rejection.
            requests.borrow_and_update();
            while correlator.is_rejected().await && !correlator.is_shutting_down() {
                tokio::select! {
                    changed = requests.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                    _ = shutdown.changed() => {}
                }
            }
        }
    }
    tracing::debug!("transport stopped");
}

async fn connect(url: &str) -> Result<RelaySocket, CorrelatorError> {
    let (socket, _response) = connect_async(url).await?;
    Ok(socket)
}

async fn pump(
    socket: RelaySocket,
    mut outbound: mpsc::UnboundedReceiver<Envelope>,
    correlator: &Correlator,
    shutdown: &mut watch::Receiver<bool>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    loop {
        tokio::select! {
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => correlator.handle_incoming(text.as_str()).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(err)) => {
                    tracing::error!(error = %err, "socket error");
                    break;
                }
                Some(Ok(_)) => {}
            },
            envelope = outbound.recv() => {
                let Some(envelope) = envelope else { break };
                let json = match serde_json::to_string(&envelope) {
                    Ok(json) => json,
                    Err(err) => {
                        tracing::error!(error = %err, "failed to encode envelope");
                        continue;
                    }
                };
                tracing::debug!(kind = envelope.kind(), "sending frame");
                if ws_tx.send(Message::text(json)).await.is_err() {
                    break;
                }
            }
            _ = shutdown.changed() => {
                let _ = ws_tx.close().await;
                break;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind failed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("no local addr");
        };
        drop(listener);

        let result = connect(&format!("ws://{addr}")).await;
        assert!(matches!(result, Err(CorrelatorError::Transport(_))));
    }
}
