//! # rendezvous-relay
//!
//! WebSocket rendezvous relay and correlated command client.
//!
//! The relay pairs exactly one `client` and one `executor` per named
//! channel and forwards JSON command traffic between them. It has no
//! knowledge of command semantics and no store-and-forward: a frame with
//! no live counterpart is dropped. The client side ([`client::Correlator`])
//! turns that fire-and-forget channel into request/reply calls with
//! id correlation and progress-aware timeouts.
//!
//! ## Architecture
//!
//! ```text
//! Peers (WebSocket)            Operators (HTTP)
//!     │                            │
//!     ├── WS Handler (ws/)         ├── Control plane (api/)
//!     │                            │
//!     └──────────┬─────────────────┘
//!                │
//!     RelayService (service/)  ── liveness sweep
//!                │
//!     ChannelRegistry (domain/)
//!
//! Correlator (client/) ── tokio-tungstenite ──► relay
//! ```

pub mod api;
pub mod app_state;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod protocol;
pub mod service;
pub mod ws;
