//! The two participant kinds of a channel.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::RelayError;

/// Which side of a channel a connection occupies.
///
/// Every channel has exactly one slot per role. The legacy wire names
/// `mcp` and `plugin` are accepted as aliases on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The automation client that issues commands.
    #[serde(alias = "mcp")]
    Client,
    /// The sandboxed plugin that executes commands.
    #[serde(alias = "plugin")]
    Executor,
}

impl Role {
    /// Returns the role on the other side of the channel.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Client => Self::Executor,
            Self::Executor => Self::Client,
        }
    }

    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Executor => "executor",
        }
    }

    /// Human-readable description used in notices and error messages.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Client => "An automation client",
            Self::Executor => "An executor plugin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" | "mcp" => Ok(Self::Client),
            "executor" | "plugin" => Ok(Self::Executor),
            other => Err(RelayError::InvalidRole(other.to_string())),
        }
    }
}
