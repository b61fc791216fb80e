//! Channel handlers: snapshot and forced reset.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get};
use axum::{Json, Router};

use crate::api::dto::{ChannelsResponse, ResetResponse};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, RelayError};

/// `GET /channels`: Occupancy of every channel.
#[utoipa::path(
    get,
    path = "/channels",
    tag = "Channels",
    summary = "List channels",
    description = "Returns, per channel, whether the client and executor slots are connected together with each occupant's reported version, display name and join time.",
    responses(
        (status = 200, description = "Channel snapshot", body = ChannelsResponse),
    )
)]
pub async fn list_channels(State(state): State<AppState>) -> impl IntoResponse {
    let channels = state.relay.snapshot().await;
    (StatusCode::OK, Json(ChannelsResponse { channels }))
}

/// `DELETE /channels/{name}`: Force-reset a channel.
///
/// # Errors
///
/// Returns [`RelayError::MissingChannel`] if the name is blank.
#[utoipa::path(
    delete,
    path = "/channels/{name}",
    tag = "Channels",
    summary = "Reset a channel",
    description = "Closes every occupant of the channel with a CHANNEL_RESET notice and deletes it. Resetting an unknown channel succeeds with `reset: false`.",
    params(
        ("name" = String, Path, description = "Channel name"),
    ),
    responses(
        (status = 200, description = "Channel reset (or did not exist)", body = ResetResponse),
        (status = 400, description = "Blank channel name", body = ErrorResponse),
    )
)]
pub async fn reset_channel(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, RelayError> {
    let outcome = state.relay.reset(None, Some(&name)).await?;
    Ok((StatusCode::OK, Json(ResetResponse::from(outcome))))
}

/// Channel routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/channels", get(list_channels))
        .route("/channels/{name}", delete(reset_channel))
}
