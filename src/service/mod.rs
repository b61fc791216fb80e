//! Service layer: orchestration over the domain registry.
//!
//! [`RelayService`] owns the [`crate::domain::ChannelRegistry`] behind a
//! mutex, logs every state change, and drives the liveness sweep.

pub mod relay_service;

pub use relay_service::{RelayService, RelayStats};
