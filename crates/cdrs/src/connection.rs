use crate::auth::authenticate;
use crate::error::CdrsError;
use crate::metrics::gauges;
use crate::registry::SessionId;
use crate::route::route_message;
use crate::server::ServerState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// Read buffer size per connection. The protocol carries no framing;
/// one read's worth of bytes is treated as one logical message, so
/// sends that coalesce or split are a known limitation inherited
/// from the wire format.
const READ_BUF: usize = 2048;

/// Drives one accepted stream connection from registration to
/// teardown. The session's registry slot is freed on any exit path.
pub async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<ServerState>,
) -> Result<(), CdrsError> {
    let (deliver_tx, deliver_rx) = mpsc::channel::<Vec<u8>>(state.config.queue_depth);

    let Some(id) = state.registry.insert(deliver_tx) else {
        tracing::warn!("session table full, rejecting {}", peer_addr);
        return Err(CdrsError::CapacityExceeded);
    };
    tracing::info!(session = ?id, "new connection from {}", peer_addr);
    gauges::inc_sessions_active();

    let (rd, wr) = stream.into_split();
    let result = run_session_loop(rd, wr, deliver_rx, &state, id).await;

    state.registry.remove(id);
    gauges::dec_sessions_active();
    tracing::info!(session = ?id, "session closed");
    result
}

/// Select loop over the peer's reads and the session's delivery
/// queue. Inbound bytes are dispatched to the auth handler until the
/// session authenticates, then to the routing handler. A zero-length
/// read or any transport error tears the session down.
async fn run_session_loop(
    mut rd: OwnedReadHalf,
    mut wr: OwnedWriteHalf,
    mut deliver_rx: mpsc::Receiver<Vec<u8>>,
    state: &ServerState,
    id: SessionId,
) -> Result<(), CdrsError> {
    let mut buf = vec![0u8; READ_BUF];

    loop {
        tokio::select! {
            result = rd.read(&mut buf) => {
                match result {
                    Ok(0) => return Ok(()),
                    Ok(n) => {
                        let text = String::from_utf8_lossy(&buf[..n]).into_owned();
                        let reply = if state.registry.is_authenticated(id) {
                            route_message(&state.registry, &text)
                        } else {
                            Some(authenticate(&state.registry, &state.credentials, id, &text))
                        };
                        if let Some(reply) = reply {
                            wr.write_all(reply.as_bytes())
                                .await
                                .map_err(|_| CdrsError::ConnectionClosed)?;
                        }
                    }
                    Err(e) => return Err(CdrsError::Io(e)),
                }
            }
            Some(data) = deliver_rx.recv() => {
                wr.write_all(&data)
                    .await
                    .map_err(|_| CdrsError::ConnectionClosed)?;
            }
        }
    }
}
