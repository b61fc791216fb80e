//! WebSocket layer: upgrade, per-connection loop, envelope dispatch.
//!
//! Peers connect at `/ws` or any other unrouted path. Each socket gets its
//! own task running [`connection::run_connection`].

pub mod connection;
pub mod dispatch;
pub mod handler;
