//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::RelayService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Relay service owning the channel registry.
    pub relay: Arc<RelayService>,
}

impl AppState {
    /// Wraps an existing relay service.
    #[must_use]
    pub const fn new(relay: Arc<RelayService>) -> Self {
        Self { relay }
    }
}
