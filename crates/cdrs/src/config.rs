use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// CLI arguments for the relay server.
#[derive(Parser, Debug, Clone)]
#[command(name = "cdrs")]
#[command(about = "CDR relay server")]
#[command(version)]
pub struct Args {
    /// Socket address for the TCP stream listener.
    #[arg(long, default_value = "0.0.0.0:9000", env = "CDRS_LISTEN")]
    pub listen: SocketAddr,
    /// Socket address for the UDP heartbeat/admin socket.
    #[arg(long, default_value = "0.0.0.0:9001", env = "CDRS_DATAGRAM")]
    pub datagram: SocketAddr,
    /// Socket address for the metrics endpoint.
    #[arg(long, default_value = "127.0.0.1:9090", env = "CDRS_METRICS")]
    pub metrics_addr: SocketAddr,
    /// Maximum concurrent sessions.
    #[arg(long, default_value = "40", env = "CDRS_MAX_SESSIONS")]
    pub max_sessions: usize,
    /// Seconds without a heartbeat before an endpoint is marked
    /// unreachable.
    #[arg(long, default_value = "60", env = "CDRS_STALE_AFTER")]
    pub stale_after: u64,
    /// Seconds between staleness sweeps.
    #[arg(long, default_value = "10", env = "CDRS_SWEEP_INTERVAL")]
    pub sweep_interval: u64,
    /// Per-session delivery queue depth for forwarded messages.
    #[arg(long, default_value = "256", env = "CDRS_QUEUE_DEPTH")]
    pub queue_depth: usize,
    /// Path to the credentials file (CAMPUS:DEPT:PASS per line).
    #[arg(long, env = "CDRS_CREDENTIALS")]
    pub credentials: Option<PathBuf>,
}

/// Runtime configuration derived from [`Args`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the TCP stream listener.
    pub listen: SocketAddr,
    /// Socket address for the UDP heartbeat/admin socket.
    pub datagram: SocketAddr,
    /// Socket address for the metrics endpoint.
    pub metrics_addr: SocketAddr,
    /// Maximum concurrent sessions.
    pub max_sessions: usize,
    /// Seconds without a heartbeat before an endpoint is marked
    /// unreachable.
    pub stale_after: u64,
    /// Seconds between staleness sweeps.
    pub sweep_interval: u64,
    /// Per-session delivery queue depth for forwarded messages.
    pub queue_depth: usize,
}

impl ServerConfig {
    /// Validates the configuration values are within acceptable bounds.
    /// Returns Ok(()) if valid, Err with description otherwise.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_sessions == 0 {
            return Err("max_sessions must be greater than 0".to_string());
        }
        if self.max_sessions > 100_000 {
            return Err("max_sessions exceeds reasonable limit (100,000)".to_string());
        }

        if self.stale_after == 0 {
            return Err("stale_after must be greater than 0".to_string());
        }
        if self.stale_after > 86_400 {
            return Err("stale_after exceeds reasonable limit (86400 seconds / 1 day)".to_string());
        }

        if self.sweep_interval == 0 {
            return Err("sweep_interval must be greater than 0".to_string());
        }
        if self.sweep_interval > self.stale_after {
            return Err("sweep_interval cannot exceed stale_after".to_string());
        }

        if self.queue_depth == 0 {
            return Err("queue_depth must be greater than 0".to_string());
        }
        if self.queue_depth > 65_536 {
            return Err("queue_depth exceeds reasonable limit (65536)".to_string());
        }
        Ok(())
    }
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            listen: args.listen,
            datagram: args.datagram,
            metrics_addr: args.metrics_addr,
            max_sessions: args.max_sessions,
            stale_after: args.stale_after,
            sweep_interval: args.sweep_interval,
            queue_depth: args.queue_depth,
        }
    }
}
