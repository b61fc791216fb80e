//! relay-client: command-line front end for the correlator.
//!
//! ```text
//! relay-client --channel design-1 send get_node_info --params '{"nodeId":"1:2"}'
//! relay-client channels
//! relay-client reset design-1
//! ```
//!
//! Results go to stdout as JSON; logs go to stderr.

use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use rendezvous_relay::client::{AdminClient, Correlator, JOIN_COMMAND};
use rendezvous_relay::config::{ClientArgs, ClientConfig};

/// Send correlated commands through a rendezvous relay.
#[derive(Debug, Parser)]
#[command(name = "relay-client", version, about)]
struct Cli {
    #[command(flatten)]
    connection: ClientArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Join the channel and send one command to the executor.
    Send {
        /// Command name understood by the executor.
        command: String,
        /// Command params as a JSON object.
        #[arg(long, default_value = "{}")]
        params: String,
        /// Inactivity timeout in milliseconds.
        #[arg(long, default_value_t = 30_000)]
        timeout_ms: u64,
    },
    /// Print the relay's channel snapshot.
    Channels,
    /// Force-reset a channel on the relay.
    Reset {
        /// Channel to reset.
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_args(&cli.connection);

    let output = match cli.command {
        Command::Channels => {
            let admin = AdminClient::from_config(&config)?;
            serde_json::to_value(admin.channels().await?)?
        }
        Command::Reset { name } => {
            let admin = AdminClient::from_config(&config)?;
            serde_json::to_value(admin.reset(&name).await?)?
        }
        Command::Send {
            command,
            params,
            timeout_ms,
        } => {
            let params: Value =
                serde_json::from_str(&params).context("--params must be valid JSON")?;
            send(config, &command, params, Duration::from_millis(timeout_ms)).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn send(
    config: ClientConfig,
    command: &str,
    params: Value,
    timeout: Duration,
) -> anyhow::Result<Value> {
    let channel = config.channel.clone();
    let correlator = Correlator::new(config);
    let transport = correlator.spawn_transport();

    let result = exchange(&correlator, channel, command, params, timeout).await;

    correlator.shutdown();
    let _ = transport.await;
    result
}

async fn exchange(
    correlator: &Correlator,
    channel: Option<String>,
    command: &str,
    params: Value,
    timeout: Duration,
) -> anyhow::Result<Value> {
    if command == JOIN_COMMAND {
        let channel = params
            .get("channel")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or(channel)
            .context("join needs a channel (--channel or params.channel)")?;
        correlator.join(&channel).await?;
        return Ok(Value::String(format!("Joined channel {channel}")));
    }
    let channel = channel.context("--channel is required to send commands")?;
    correlator.join(&channel).await?;
    Ok(correlator.send_with_timeout(command, params, timeout).await?)
}
