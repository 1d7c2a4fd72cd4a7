#![forbid(unsafe_code)]

use anyhow::Result;
use cdrs::config::{Args, ServerConfig};
use cdrs::credentials::CredentialStore;
use cdrs::datagram::run_datagram_loop;
use cdrs::metrics::{start_metrics_server, HealthState};
use cdrs::registry::Registry;
use cdrs::run;
use cdrs::ServerState;
use clap::Parser;
use std::sync::Arc;
use tokio::net::{TcpListener, UdpSocket};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config: ServerConfig = args.clone().into();

    // Validate configuration before starting
    if let Err(e) = config.validate() {
        anyhow::bail!("configuration error: {}", e);
    }

    let credentials = if let Some(ref path) = args.credentials {
        CredentialStore::load(path)?
    } else {
        CredentialStore::builtin()
    };

    let state = Arc::new(ServerState {
        registry: Registry::new(config.max_sessions),
        credentials,
        config: config.clone(),
    });

    // Only bind failures are fatal; everything past this point
    // recovers locally.
    let listener = TcpListener::bind(config.listen).await?;
    info!("stream listener bound to {}", config.listen);
    let udp = Arc::new(UdpSocket::bind(config.datagram).await?);
    info!("datagram socket bound to {}", config.datagram);

    let health_state = HealthState::new();

    tokio::spawn({
        let health_state = health_state.clone();
        async move {
            if let Err(e) = start_metrics_server(config.metrics_addr, health_state).await {
                warn!("metrics server error: {}", e);
            }
        }
    });

    tokio::spawn({
        let state = state.clone();
        async move {
            if let Err(e) = run_datagram_loop(udp, state).await {
                tracing::error!("datagram loop error: {}", e);
            }
        }
    });

    tokio::select! {
        result = run(listener, state) => {
            if let Err(e) = result {
                tracing::error!("server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
        }
    }

    Ok(())
}
