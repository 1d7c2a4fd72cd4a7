use crate::config::ServerConfig;
use crate::connection::handle_connection;
use crate::credentials::CredentialStore;
use crate::error::CdrsError;
use crate::registry::Registry;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Shared state for the relay server.
pub struct ServerState {
    /// Session table for every accepted stream connection.
    pub registry: Registry,
    /// Read-only credential store consulted by the auth handler.
    pub credentials: CredentialStore,
    /// Runtime server configuration.
    pub config: ServerConfig,
}

/// # Errors
///
/// Returns an error if the accept loop encounters an I/O failure.
pub async fn run(listener: TcpListener, state: Arc<ServerState>) -> Result<(), CdrsError> {
    let (shutdown_tx, _) = tokio::sync::watch::channel(());
    run_with_shutdown(listener, state, shutdown_tx).await
}

/// Run the server accept loop with an externally-controlled shutdown
/// signal. The loop also owns the time-gated staleness sweep, so
/// reachability gets pruned even with no connection activity.
///
/// When the `shutdown_tx` sender is dropped, the accept loop stops
/// accepting new connections and waits for in-flight connections to
/// finish.
///
/// # Errors
///
/// Returns an error if the accept loop encounters an I/O failure.
pub async fn run_with_shutdown(
    listener: TcpListener,
    state: Arc<ServerState>,
    shutdown_tx: tokio::sync::watch::Sender<()>,
) -> Result<(), CdrsError> {
    let local_addr = listener.local_addr().map_err(CdrsError::Io)?;
    info!("server listening on {}", local_addr);
    let mut shutdown_rx = shutdown_tx.subscribe();
    let task_tracker = Arc::new(tokio::sync::Notify::new());
    let mut active_tasks: usize = 0;

    let stale_window = Duration::from_secs(state.config.stale_after);
    let mut sweep = tokio::time::interval(Duration::from_secs(state.config.sweep_interval));
    sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        if state.registry.len() >= state.config.max_sessions {
                            // Closed with no protocol exchange.
                            warn!("max sessions reached, rejecting {}", addr);
                            drop(stream);
                            continue;
                        }
                        let state = Arc::clone(&state);
                        let tracker = task_tracker.clone();
                        active_tasks += 1;
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, addr, state).await {
                                tracing::debug!("connection from {} closed: {}", addr, e);
                            }
                            tracker.notify_one();
                        });
                    }
                    Err(e) => {
                        error!("failed to accept connection: {}", e);
                    }
                }
            }
            _ = sweep.tick() => {
                let cleared = state.registry.mark_stale(stale_window);
                if cleared > 0 {
                    info!("sweep: {} endpoints went stale", cleared);
                }
                debug!(
                    sessions = state.registry.len(),
                    reachable = state.registry.reachable_endpoints().len(),
                    "sweep status"
                );
            }
            _ = shutdown_rx.changed() => {
                info!("shutdown signal received, draining {} connections", active_tasks);
                break;
            }
        }
    }

    // Wait for in-flight connections to finish (with timeout)
    let drain_timeout = Duration::from_secs(30);
    let deadline = tokio::time::Instant::now() + drain_timeout;
    while active_tasks > 0 {
        if tokio::time::timeout_at(deadline, task_tracker.notified())
            .await
            .is_err()
        {
            warn!(
                "drain timeout reached with {} connections still active",
                active_tasks
            );
            break;
        }
        active_tasks = active_tasks.saturating_sub(1);
    }

    info!("server shut down gracefully");
    Ok(())
}
