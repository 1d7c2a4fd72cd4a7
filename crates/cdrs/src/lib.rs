//! CDR relay server — named-endpoint rendezvous over TCP/UDP.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod auth;
/// CLI argument parsing and server configuration.
pub mod config;
mod connection;
/// Read-only credential store.
pub mod credentials;
/// UDP heartbeat and admin control channel.
pub mod datagram;
/// Error types for relay server operations.
pub mod error;
/// Prometheus metrics collection and HTTP endpoint.
pub mod metrics;
/// Session table keyed by opaque session id, with name lookup.
pub mod registry;
mod route;
/// Accept loop and shared server state.
pub mod server;

pub use server::{run, run_with_shutdown, ServerState};
