//! Relay and correlator configuration.
//!
//! Follows 12-factor style: settings come from environment variables (or
//! a `.env` file via `dotenvy`), and command-line flags override them.
//!
//! | Variable                        | Default   |
//! |---------------------------------|-----------|
//! | `RELAY_HOST`                    | `0.0.0.0` |
//! | `RELAY_PORT`                    | `3055`    |
//! | `RELAY_HEARTBEAT_INTERVAL_SECS` | `15`      |

use std::net::SocketAddr;
use std::time::Duration;

use clap::Args;

use crate::error::ConfigError;
use crate::protocol::{PROTOCOL_VERSION, Role};

/// Port both sides agree on when nothing else is configured.
pub const DEFAULT_PORT: u16 = 3055;

/// Command-line overrides for the relay server.
#[derive(Debug, Clone, Default, Args)]
pub struct RelayArgs {
    /// Interface to bind (overrides `RELAY_HOST`).
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides `RELAY_PORT`).
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Seconds between liveness sweeps (overrides `RELAY_HEARTBEAT_INTERVAL_SECS`).
    #[arg(long)]
    pub heartbeat_secs: Option<u64>,
}

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::load`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Socket address to bind the HTTP/WebSocket server to.
    pub listen_addr: SocketAddr,

    /// Seconds between liveness sweeps.
    pub heartbeat_interval_secs: u64,
}

impl RelayConfig {
    /// Loads configuration from the environment, then applies `args`.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidListenAddr`] if the resulting host and
    /// port do not form a valid [`SocketAddr`].
    pub fn load(args: &RelayArgs) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let host = args
            .host
            .clone()
            .or_else(|| std::env::var("RELAY_HOST").ok())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        let port = args
            .port
            .unwrap_or_else(|| parse_env("RELAY_PORT", DEFAULT_PORT));
        let heartbeat_interval_secs = args
            .heartbeat_secs
            .unwrap_or_else(|| parse_env("RELAY_HEARTBEAT_INTERVAL_SECS", 15))
            .max(1);

        let addr = format!("{host}:{port}");
        let listen_addr = addr
            .parse()
            .map_err(|source| ConfigError::InvalidListenAddr { addr, source })?;

        Ok(Self {
            listen_addr,
            heartbeat_interval_secs,
        })
    }

    /// Interval between liveness sweeps.
    #[must_use]
    pub const fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
}

/// Command-line connection flags for the correlator.
#[derive(Debug, Clone, Args)]
pub struct ClientArgs {
    /// Relay host. `localhost` connects over `ws://host:port`; any other
    /// host is assumed to sit behind TLS at `wss://host`.
    #[arg(long, default_value = "localhost")]
    pub server: String,

    /// Relay port (used for local hosts only).
    #[arg(long, env = "RELAY_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Channel to join.
    #[arg(long)]
    pub channel: Option<String>,
}

/// Correlator configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay host.
    pub server: String,
    /// Relay port.
    pub port: u16,
    /// Channel to join on startup, if any.
    pub channel: Option<String>,
    /// Role announced on join.
    pub role: Role,
    /// Version announced on join.
    pub version: String,
    /// Display name announced on join.
    pub name: Option<String>,
    /// Default per-request timeout.
    pub request_timeout: Duration,
    /// Inactivity window re-armed by each progress frame.
    pub progress_window: Duration,
    /// Delay before reconnecting after the transport closes.
    pub reconnect_delay: Duration,
    /// How long `join` waits for a fresh connection to open.
    pub connect_wait: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: "localhost".to_string(),
            port: DEFAULT_PORT,
            channel: None,
            role: Role::Client,
            version: PROTOCOL_VERSION.to_string(),
            name: working_dir_name(),
            request_timeout: Duration::from_secs(30),
            progress_window: Duration::from_secs(60),
            reconnect_delay: Duration::from_secs(2),
            connect_wait: Duration::from_secs(1),
        }
    }
}

impl ClientConfig {
    /// Builds a configuration from command-line flags.
    #[must_use]
    pub fn from_args(args: &ClientArgs) -> Self {
        Self {
            server: args.server.clone(),
            port: args.port,
            channel: args.channel.clone(),
            ..Self::default()
        }
    }

    /// Returns `true` when the relay runs on this machine.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(
            self.server.as_str(),
            "localhost" | "127.0.0.1" | "::1" | "[::1]"
        )
    }

    /// WebSocket URL of the relay.
    #[must_use]
    pub fn ws_url(&self) -> String {
        let host = self.url_host();
        if self.is_local() {
            format!("ws://{host}:{}", self.port)
        } else {
            format!("wss://{host}")
        }
    }

    /// Base URL of the relay's HTTP control plane.
    #[must_use]
    pub fn http_url(&self) -> String {
        let host = self.url_host();
        if self.is_local() {
            format!("http://{host}:{}", self.port)
        } else {
            format!("https://{host}")
        }
    }

    /// Host as it appears in a URL; IPv6 literals are bracketed.
    fn url_host(&self) -> String {
        if self.server.contains(':') && !self.server.starts_with('[') {
            format!("[{}]", self.server)
        } else {
            self.server.clone()
        }
    }
}

/// Basename of the current working directory.
fn working_dir_name() -> Option<String> {
    let cwd = std::env::current_dir().ok()?;
    cwd.file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_defaults() {
        let args = RelayArgs {
            host: Some("127.0.0.1".to_string()),
            port: Some(4000),
            heartbeat_secs: Some(5),
        };
        let Ok(config) = RelayConfig::load(&args) else {
            panic!("valid config");
        };
        assert_eq!(config.listen_addr.port(), 4000);
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(5));
    }

    #[test]
    fn bad_host_is_rejected() {
        let args = RelayArgs {
            host: Some("not a host".to_string()),
            port: Some(4000),
            heartbeat_secs: None,
        };
        assert!(matches!(
            RelayConfig::load(&args),
            Err(ConfigError::InvalidListenAddr { .. })
        ));
    }

    #[test]
    fn local_server_uses_plain_ws_with_port() {
        let config = ClientConfig {
            port: 4100,
            ..ClientConfig::default()
        };
        assert_eq!(config.ws_url(), "ws://localhost:4100");
        assert_eq!(config.http_url(), "http://localhost:4100");
    }

    #[test]
    fn ipv6_loopback_is_bracketed() {
        for server in ["::1", "[::1]"] {
            let config = ClientConfig {
                server: server.to_string(),
                port: 4100,
                ..ClientConfig::default()
            };
            assert_eq!(config.ws_url(), "ws://[::1]:4100");
            assert_eq!(config.http_url(), "http://[::1]:4100");
        }
    }

    #[test]
    fn remote_server_uses_tls_without_port() {
        let config = ClientConfig {
            server: "relay.example.com".to_string(),
            ..ClientConfig::default()
        };
        assert_eq!(config.ws_url(), "wss://relay.example.com");
        assert_eq!(config.http_url(), "https://relay.example.com");
    }

    #[test]
    fn client_defaults_match_protocol() {
        let config = ClientConfig::default();
        assert_eq!(config.role, Role::Client);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.progress_window, Duration::from_secs(60));
        assert_eq!(config.reconnect_delay, Duration::from_secs(2));
    }
}
