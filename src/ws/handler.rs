//! Axum WebSocket upgrade handlers.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};

use super::connection::run_connection;
use crate::app_state::AppState;

/// Body returned for any HTTP request that is neither an upgrade nor a
/// control-plane route.
pub const LIVENESS_TEXT: &str = "WebSocket server running";

/// `GET /ws`: Upgrade HTTP connection to WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let relay = Arc::clone(&state.relay);
    ws.on_upgrade(move |socket| run_connection(socket, relay))
}

/// Fallback for every unrouted request.
///
/// Peers may upgrade on any path, so an upgrade request is accepted here
/// too. `OPTIONS` gets an empty preflight response (the CORS layer adds
/// the headers). Everything else receives the plain-text liveness string.
pub async fn upgrade_or_liveness(State(state): State<AppState>, request: Request) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }
    let (mut parts, _body) = request.into_parts();
    match WebSocketUpgrade::from_request_parts(&mut parts, &state).await {
        Ok(ws) => {
            let relay = Arc::clone(&state.relay);
            ws.on_upgrade(move |socket| run_connection(socket, relay))
                .into_response()
        }
        Err(_) => (StatusCode::OK, LIVENESS_TEXT).into_response(),
    }
}
