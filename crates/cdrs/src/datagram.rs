use crate::error::CdrsError;
use crate::metrics::counters;
use crate::registry::Registry;
use crate::server::ServerState;
use cdr_common::types::reply;
use cdr_common::wire::{AdminCommand, Datagram, Heartbeat, WireError};
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{debug, info};

/// Read buffer size for inbound datagrams.
const READ_BUF: usize = 2048;

/// Drives the UDP socket: heartbeats from endpoints and admin
/// commands from operators, dispatched by message prefix. Admin
/// replies go back to the datagram's source address; heartbeats are
/// never acknowledged.
///
/// The admin channel is unauthenticated, and a heartbeat's declared
/// campus/dept is not bound to any stream session or checked against
/// the sender address — only the IP comes from the transport. Both
/// are inherited protocol properties.
///
/// # Errors
///
/// Returns an error only if the socket itself fails; malformed
/// traffic is dropped or answered locally.
pub async fn run_datagram_loop(
    socket: Arc<UdpSocket>,
    state: Arc<ServerState>,
) -> Result<(), CdrsError> {
    let mut buf = vec![0u8; READ_BUF];

    loop {
        let (n, from) = socket.recv_from(&mut buf).await?;
        let text = String::from_utf8_lossy(&buf[..n]).into_owned();

        match Datagram::parse(&text) {
            Ok(Datagram::Heartbeat(hb)) => apply_heartbeat(&state.registry, &hb, from),
            Ok(Datagram::Admin(cmd)) => {
                handle_admin(&socket, &state.registry, &cmd, from).await;
            }
            Err(WireError::MalformedHeartbeat) => {
                // Heartbeats have no acknowledgment protocol.
                debug!("malformed heartbeat from {}, dropped", from);
                counters::heartbeats_total("malformed");
            }
            Err(WireError::UnknownAdmin) => {
                counters::admin_commands_total("unknown");
                send_reply(&socket, reply::ADMIN_ERR_UNKNOWN, from).await;
            }
            Err(e) => {
                debug!("unrecognized datagram from {}: {e}", from);
            }
        }
    }
}

/// Records a heartbeat against the authenticated session holding the
/// declared name. The reachable endpoint combines the sender's IP
/// with the port declared in the message body.
fn apply_heartbeat(registry: &Registry, hb: &Heartbeat, from: SocketAddr) {
    let endpoint = SocketAddr::new(from.ip(), hb.udp_port);
    if registry.record_heartbeat(&hb.name, endpoint) {
        debug!(name = %hb.name, "heartbeat from {}", endpoint);
        counters::heartbeats_total("ok");
    } else {
        debug!(name = %hb.name, "heartbeat for unknown session, dropped");
        counters::heartbeats_total("unknown");
    }
}

/// Applies one admin command and replies to its sender.
async fn handle_admin(
    socket: &UdpSocket,
    registry: &Registry,
    cmd: &AdminCommand,
    from: SocketAddr,
) {
    match cmd {
        AdminCommand::List => {
            counters::admin_commands_total("list");
            send_reply(socket, &list_reply(registry), from).await;
        }
        AdminCommand::Broadcast(msg) if msg.is_empty() => {
            counters::admin_commands_total("broadcast_empty");
            send_reply(socket, reply::ADMIN_ERR_EMPTY, from).await;
        }
        AdminCommand::Broadcast(msg) => {
            counters::admin_commands_total("broadcast");
            let endpoints = registry.reachable_endpoints();
            for endpoint in &endpoints {
                if let Err(e) = socket.send_to(msg.as_bytes(), endpoint).await {
                    debug!("broadcast to {} failed: {e}", endpoint);
                }
            }
            info!("broadcast sent to {} endpoints", endpoints.len());
            // Acknowledged regardless of how many recipients existed.
            send_reply(socket, reply::ADMIN_OK_SENT, from).await;
        }
    }
}

/// One line per authenticated session, or the sentinel when none.
fn list_reply(registry: &Registry) -> String {
    let snapshot = registry.snapshot();
    if snapshot.is_empty() {
        return reply::NO_AUTHENTICATED_CLIENTS.to_string();
    }
    let mut out = String::new();
    for info in snapshot {
        let _ = writeln!(
            out,
            "{} last={} udp={}",
            info.name,
            info.last_secs,
            u8::from(info.reachable)
        );
    }
    out
}

async fn send_reply(socket: &UdpSocket, text: &str, to: SocketAddr) {
    if let Err(e) = socket.send_to(text.as_bytes(), to).await {
        debug!("reply to {} failed: {e}", to);
    }
}
