use crate::metrics::counters;
use crate::registry::Registry;
use cdr_common::types::reply;
use cdr_common::wire::RouteRequest;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

/// Applies one route message from an authenticated session. Returns
/// the error reply to send back, or `None` when the message was
/// handed to the destination (delivery gets no confirmation).
///
/// Forwarding is non-blocking: the body goes into the destination's
/// bounded delivery queue and is dropped if the queue is full or the
/// destination is tearing down. A slow receiver never stalls the
/// sender's task.
pub fn route_message(registry: &Registry, input: &str) -> Option<&'static str> {
    let request = match RouteRequest::parse(input) {
        Ok(request) => request,
        Err(e) => {
            debug!("route decode failed: {e}");
            counters::messages_dropped_total("bad_message");
            return Some(reply::BAD_MSG);
        }
    };

    let Some(dest) = registry.sender_for_name(&request.target) else {
        debug!(target = %request.target, "route to unconnected name");
        counters::messages_dropped_total("not_connected");
        return Some(reply::NOT_CONNECTED);
    };

    match dest.try_send(request.body.into_bytes()) {
        Ok(()) => {
            counters::messages_routed_total();
            None
        }
        Err(TrySendError::Full(_)) => {
            counters::messages_dropped_total("queue_full");
            None
        }
        Err(TrySendError::Closed(_)) => {
            // Destination is tearing down; its slot goes away on its
            // own read/write error, invisible to the sender.
            counters::messages_dropped_total("closed");
            None
        }
    }
}
