//! Client side: the command correlator and its transports.
//!
//! ```text
//! caller ── send() ──► Correlator ──► outbound queue ──► transport ──► relay
//!    ▲                    │  ▲                                          │
//!    └── oneshot reply ◄──┘  └──────── handle_incoming() ◄──────────────┘
//! ```
//!
//! [`AdminClient`] talks to the relay's HTTP control plane instead.

pub mod admin;
pub mod correlator;
pub mod pending;
pub mod transport;

pub use admin::AdminClient;
pub use correlator::{Correlator, JOIN_COMMAND};
pub use pending::{PendingRequests, Reply};
