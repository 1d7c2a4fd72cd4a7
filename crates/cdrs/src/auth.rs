use crate::credentials::CredentialStore;
use crate::metrics::counters;
use crate::registry::{Registry, SessionId};
use cdr_common::types::reply;
use cdr_common::wire::AuthRequest;
use tracing::{debug, info};

/// Applies one auth message from an unauthenticated session and
/// returns the reply line to send back.
///
/// Decode failure and credential rejection leave the session
/// unauthenticated; retries are unlimited. On success the identity is
/// bound and the session's liveness fields are reset.
pub fn authenticate(
    registry: &Registry,
    credentials: &CredentialStore,
    id: SessionId,
    input: &str,
) -> &'static str {
    let request = match AuthRequest::parse(input) {
        Ok(request) => request,
        Err(e) => {
            debug!(session = ?id, "auth decode failed: {e}");
            counters::auth_total("bad_message");
            return reply::BAD_AUTH;
        }
    };

    if !credentials.verify(&request.name, &request.pass) {
        info!(session = ?id, name = %request.name, "wrong credential");
        counters::auth_total("wrong_pass");
        return reply::WRONG_PASS;
    }

    info!(session = ?id, name = %request.name, "authenticated");
    counters::auth_total("ok");
    registry.authenticate(id, request.name);
    reply::AUTH_OK
}
