//! rendezvous-relay server entry point.
//!
//! Starts the Axum server carrying the WebSocket relay and the HTTP
//! control plane, plus the liveness sweep.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use rendezvous_relay::api;
use rendezvous_relay::app_state::AppState;
use rendezvous_relay::config::{RelayArgs, RelayConfig};
use rendezvous_relay::service::RelayService;

/// WebSocket rendezvous relay pairing one client and one executor per channel.
#[derive(Debug, Parser)]
#[command(name = "rendezvous-relay", version, about)]
struct Cli {
    #[command(flatten)]
    relay: RelayArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Load configuration
    let config = RelayConfig::load(&cli.relay)?;
    tracing::info!(
        addr = %config.listen_addr,
        heartbeat_secs = config.heartbeat_interval_secs,
        "starting rendezvous-relay"
    );

    // Build service layer
    let relay = Arc::new(RelayService::new());
    let heartbeat = relay.spawn_heartbeat(config.heartbeat_interval());

    // Build router
    let app = api::build_app(AppState::new(relay));

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    heartbeat.abort();
    tracing::info!("relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
