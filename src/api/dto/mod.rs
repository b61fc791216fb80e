//! Data Transfer Objects for control-plane responses.

pub mod channel_dto;
pub mod system_dto;

pub use channel_dto::*;
pub use system_dto::*;
