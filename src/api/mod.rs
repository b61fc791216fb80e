//! HTTP control plane and router composition.
//!
//! The control plane shares its port with the WebSocket endpoint:
//!
//! | Method    | Path               | Purpose                          |
//! |-----------|--------------------|----------------------------------|
//! | `GET`     | `/channels`        | occupancy snapshot               |
//! | `DELETE`  | `/channels/{name}` | forced reset                     |
//! | `GET`     | `/health`          | health and counters              |
//! | `GET`     | `/ws`              | WebSocket upgrade                |
//! | `OPTIONS` | any                | CORS preflight                   |
//! | any       | anything else      | upgrade, or plain liveness text  |

pub mod dto;
pub mod handlers;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::ws::handler::{upgrade_or_liveness, ws_handler};

/// OpenAPI document for the control plane.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "rendezvous-relay", description = "Channel inspection and operator recovery"),
    paths(
        handlers::channels::list_channels,
        handlers::channels::reset_channel,
        handlers::system::health_handler,
    ),
    components(schemas(
        dto::ChannelsResponse,
        dto::ResetResponse,
        dto::HealthResponse,
        crate::domain::ChannelSnapshot,
        crate::domain::SlotSnapshot,
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
    )),
    tags(
        (name = "Channels", description = "Channel occupancy and reset"),
        (name = "System", description = "Health"),
    )
)]
pub struct ApiDoc;

/// Builds the REST routes (no state, no layers).
pub fn build_router() -> Router<AppState> {
    let router = handlers::routes();

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}

/// Builds the complete application: control plane, WebSocket upgrade,
/// liveness fallback, tracing and permissive CORS.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(build_router())
        .route("/ws", get(ws_handler))
        .fallback(upgrade_or_liveness)
        .method_not_allowed_fallback(upgrade_or_liveness)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
