//! Core type definitions and reply text for the CDR protocol.

use std::fmt;

/// A canonicalized (campus, department) pair identifying an endpoint.
///
/// Both parts are upper-cased on construction so lookups are
/// case-insensitive at the wire boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicalName {
    /// Campus part, canonical upper case.
    pub campus: String,
    /// Department part, canonical upper case.
    pub dept: String,
}

impl LogicalName {
    /// Builds a logical name, canonicalizing both parts.
    #[must_use]
    pub fn new(campus: &str, dept: &str) -> Self {
        Self {
            campus: campus.to_ascii_uppercase(),
            dept: dept.to_ascii_uppercase(),
        }
    }
}

impl fmt::Display for LogicalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.campus, self.dept)
    }
}

/// Reply lines sent by the relay. Each ends with a newline, matching
/// the line-oriented text protocol.
pub mod reply {
    /// Stream reply: authentication accepted.
    pub const AUTH_OK: &str = "AUTH_OK\n";
    /// Stream reply: credential rejected.
    pub const WRONG_PASS: &str = "WRONG_PASS\n";
    /// Stream reply: auth message failed to decode.
    pub const BAD_AUTH: &str = "SERVER_ERR: bad auth\n";
    /// Stream reply: route message failed to decode.
    pub const BAD_MSG: &str = "SERVER_ERR: bad msg\n";
    /// Stream reply: no authenticated session has the target name.
    pub const NOT_CONNECTED: &str = "SERVER_ERR: not connected\n";
    /// Datagram reply: LIST found no authenticated sessions.
    pub const NO_AUTHENTICATED_CLIENTS: &str = "NO_AUTHENTICATED_CLIENTS\n";
    /// Datagram reply: broadcast dispatched.
    pub const ADMIN_OK_SENT: &str = "ADMIN_OK: sent\n";
    /// Datagram reply: broadcast message was empty.
    pub const ADMIN_ERR_EMPTY: &str = "ADMIN_ERR: empty\n";
    /// Datagram reply: unrecognized admin command.
    pub const ADMIN_ERR_UNKNOWN: &str = "ADMIN_ERR: unknown\n";
}
