//! CDR wire message parsing and formatting.
//!
//! All four message kinds are plain text with no length prefix or
//! terminator; the transport delivers one logical message per read.
//! Each kind has exactly one grammar parser returning either a typed
//! message or a typed decode failure.

use crate::types::LogicalName;
use thiserror::Error;

/// Prefix that marks a datagram as an admin command.
pub const ADMIN_PREFIX: &str = "ADMIN:";
/// Prefix that marks a datagram as a heartbeat.
pub const HEARTBEAT_PREFIX: &str = "HEARTBEAT;";

/// Errors that can occur while decoding a wire message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// The auth message is missing one of CAMPUS, DEPT or PASS.
    #[error("bad auth message")]
    BadAuth,
    /// The route message is missing the `-` or `:` separator.
    #[error("bad route message")]
    BadRoute,
    /// The heartbeat is missing a field or its port is not a
    /// positive integer.
    #[error("malformed heartbeat")]
    MalformedHeartbeat,
    /// The text after `ADMIN:` is not a known command.
    #[error("unknown admin command")]
    UnknownAdmin,
    /// The datagram starts with neither `ADMIN:` nor `HEARTBEAT;`.
    #[error("unrecognized datagram")]
    UnknownDatagram,
}

/// Strips trailing CR/LF so newline-terminated sends parse the same
/// as bare ones.
fn trim_line(input: &str) -> &str {
    input.trim_end_matches(['\r', '\n'])
}

/// Splits a `;`-joined message into `KEY:value` pairs and returns the
/// value for `key`, if present. Pair order does not matter.
fn keyed_field<'a>(input: &'a str, key: &str) -> Option<&'a str> {
    input.split(';').find_map(|token| {
        let (k, v) = token.split_once(':')?;
        (k == key).then_some(v)
    })
}

/// Pre-auth credential presentation sent on the stream transport.
///
/// Wire form: `CAMPUS:<c>;DEPT:<d>;PASS:<p>`, fields in any order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    /// Claimed logical name, canonicalized.
    pub name: LogicalName,
    /// Presented secret, verbatim (secrets are case-sensitive).
    pub pass: String,
}

impl AuthRequest {
    /// Decodes an auth message.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::BadAuth`] if any of the three fields is
    /// absent or empty.
    pub fn parse(input: &str) -> Result<Self, WireError> {
        let input = trim_line(input);
        let campus = keyed_field(input, "CAMPUS").unwrap_or("");
        let dept = keyed_field(input, "DEPT").unwrap_or("");
        let pass = keyed_field(input, "PASS").unwrap_or("");
        if campus.is_empty() || dept.is_empty() || pass.is_empty() {
            return Err(WireError::BadAuth);
        }
        Ok(Self {
            name: LogicalName::new(campus, dept),
            pass: pass.to_string(),
        })
    }

    /// Formats an auth message for transmission.
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "CAMPUS:{};DEPT:{};PASS:{}",
            self.name.campus, self.name.dept, self.pass
        )
    }
}

/// Post-auth routing request sent on the stream transport.
///
/// Wire form: `<campus>-<dept>:<body>`, split at the first `-` and
/// the first `:` after it; the body is everything that follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequest {
    /// Destination logical name, canonicalized.
    pub target: LogicalName,
    /// Message body, forwarded verbatim.
    pub body: String,
}

impl RouteRequest {
    /// Decodes a route message.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::BadRoute`] if either separator is absent
    /// or any part is empty.
    pub fn parse(input: &str) -> Result<Self, WireError> {
        let input = trim_line(input);
        let (campus, rest) = input.split_once('-').ok_or(WireError::BadRoute)?;
        let (dept, body) = rest.split_once(':').ok_or(WireError::BadRoute)?;
        if campus.is_empty() || dept.is_empty() || body.is_empty() {
            return Err(WireError::BadRoute);
        }
        Ok(Self {
            target: LogicalName::new(campus, dept),
            body: body.to_string(),
        })
    }

    /// Formats a route message for transmission.
    #[must_use]
    pub fn encode(&self) -> String {
        format!("{}-{}:{}", self.target.campus, self.target.dept, self.body)
    }
}

/// Liveness report sent on the datagram transport.
///
/// Wire form: `HEARTBEAT;CAMPUS:<c>;DEPT:<d>;UDPPORT:<n>`. The port
/// comes from the message; the peer's IP comes from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heartbeat {
    /// Declared logical name, canonicalized.
    pub name: LogicalName,
    /// Declared reachable UDP port.
    pub udp_port: u16,
}

impl Heartbeat {
    fn parse(input: &str) -> Result<Self, WireError> {
        let campus = keyed_field(input, "CAMPUS").unwrap_or("");
        let dept = keyed_field(input, "DEPT").unwrap_or("");
        let port = keyed_field(input, "UDPPORT").unwrap_or("");
        let udp_port: u16 = port.parse().map_err(|_| WireError::MalformedHeartbeat)?;
        if campus.is_empty() || dept.is_empty() || udp_port == 0 {
            return Err(WireError::MalformedHeartbeat);
        }
        Ok(Self {
            name: LogicalName::new(campus, dept),
            udp_port,
        })
    }

    /// Formats a heartbeat for transmission.
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "HEARTBEAT;CAMPUS:{};DEPT:{};UDPPORT:{}",
            self.name.campus, self.name.dept, self.udp_port
        )
    }
}

/// Operator command sent on the datagram transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    /// `ADMIN:LIST` — enumerate authenticated sessions.
    List,
    /// `ADMIN:BROADCAST:<msg>` — push a message to every reachable
    /// endpoint. The message may decode empty; the handler rejects it.
    Broadcast(String),
}

impl AdminCommand {
    fn parse(input: &str) -> Result<Self, WireError> {
        match input.strip_prefix("BROADCAST:") {
            Some(msg) => Ok(Self::Broadcast(msg.to_string())),
            None if input == "LIST" => Ok(Self::List),
            None => Err(WireError::UnknownAdmin),
        }
    }

    /// Formats an admin command for transmission.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::List => "ADMIN:LIST".to_string(),
            Self::Broadcast(msg) => format!("ADMIN:BROADCAST:{msg}"),
        }
    }
}

/// A decoded datagram, discriminated by its leading prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datagram {
    /// A liveness report from an endpoint.
    Heartbeat(Heartbeat),
    /// A control command from an operator.
    Admin(AdminCommand),
}

impl Datagram {
    /// Decodes a datagram, discriminating on the `ADMIN:` and
    /// `HEARTBEAT;` prefixes.
    ///
    /// # Errors
    ///
    /// Returns the decode failure for the matched kind, or
    /// [`WireError::UnknownDatagram`] if neither prefix matches.
    pub fn parse(input: &str) -> Result<Self, WireError> {
        let input = trim_line(input);
        if let Some(cmd) = input.strip_prefix(ADMIN_PREFIX) {
            return AdminCommand::parse(cmd).map(Self::Admin);
        }
        if input.starts_with(HEARTBEAT_PREFIX) {
            return Heartbeat::parse(input).map(Self::Heartbeat);
        }
        Err(WireError::UnknownDatagram)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_parses_canonical_form() {
        let req = AuthRequest::parse("CAMPUS:lahore;DEPT:cs;PASS:secretX").unwrap();
        assert_eq!(req.name, LogicalName::new("LAHORE", "CS"));
        assert_eq!(req.pass, "secretX");
    }

    #[test]
    fn auth_fields_are_order_independent() {
        let req = AuthRequest::parse("PASS:p;CAMPUS:a;DEPT:b").unwrap();
        assert_eq!(req.name, LogicalName::new("A", "B"));
        assert_eq!(req.pass, "p");
    }

    #[test]
    fn auth_pass_is_not_canonicalized() {
        let req = AuthRequest::parse("CAMPUS:a;DEPT:b;PASS:MixedCase").unwrap();
        assert_eq!(req.pass, "MixedCase");
    }

    #[test]
    fn auth_missing_any_field_fails() {
        for msg in [
            "DEPT:cs;PASS:p",
            "CAMPUS:a;PASS:p",
            "CAMPUS:a;DEPT:b",
            "CAMPUS:;DEPT:b;PASS:p",
            "",
            "garbage",
        ] {
            assert_eq!(AuthRequest::parse(msg), Err(WireError::BadAuth), "{msg:?}");
        }
    }

    #[test]
    fn auth_tolerates_trailing_newline() {
        assert!(AuthRequest::parse("CAMPUS:a;DEPT:b;PASS:p\n").is_ok());
        assert!(AuthRequest::parse("CAMPUS:a;DEPT:b;PASS:p\r\n").is_ok());
    }

    #[test]
    fn auth_round_trips() {
        let req = AuthRequest {
            name: LogicalName::new("KARACHI", "CS"),
            pass: "KHI_CS_123".into(),
        };
        assert_eq!(AuthRequest::parse(&req.encode()).unwrap(), req);
    }

    #[test]
    fn route_splits_at_first_separators() {
        let req = RouteRequest::parse("lahore-cs:hello there").unwrap();
        assert_eq!(req.target, LogicalName::new("LAHORE", "CS"));
        assert_eq!(req.body, "hello there");
    }

    #[test]
    fn route_body_may_contain_separators() {
        let req = RouteRequest::parse("A-B:x:y-z").unwrap();
        assert_eq!(req.body, "x:y-z");
    }

    #[test]
    fn route_missing_separator_fails() {
        for msg in ["no separators", "campus-deptonly", "campus:body", "-:", ""] {
            assert_eq!(RouteRequest::parse(msg), Err(WireError::BadRoute), "{msg:?}");
        }
    }

    #[test]
    fn heartbeat_parses_declared_port() {
        let hb = match Datagram::parse("HEARTBEAT;CAMPUS:lahore;DEPT:cs;UDPPORT:4321").unwrap() {
            Datagram::Heartbeat(hb) => hb,
            other => panic!("expected heartbeat, got {other:?}"),
        };
        assert_eq!(hb.name, LogicalName::new("LAHORE", "CS"));
        assert_eq!(hb.udp_port, 4321);
    }

    #[test]
    fn heartbeat_rejects_missing_or_bad_port() {
        for msg in [
            "HEARTBEAT;CAMPUS:a;DEPT:b",
            "HEARTBEAT;CAMPUS:a;DEPT:b;UDPPORT:0",
            "HEARTBEAT;CAMPUS:a;DEPT:b;UDPPORT:-5",
            "HEARTBEAT;CAMPUS:a;DEPT:b;UDPPORT:70000",
            "HEARTBEAT;CAMPUS:a;DEPT:b;UDPPORT:abc",
            "HEARTBEAT;DEPT:b;UDPPORT:9",
            "HEARTBEAT;CAMPUS:a;UDPPORT:9",
        ] {
            assert_eq!(
                Datagram::parse(msg),
                Err(WireError::MalformedHeartbeat),
                "{msg:?}"
            );
        }
    }

    #[test]
    fn admin_list_parses() {
        assert_eq!(
            Datagram::parse("ADMIN:LIST").unwrap(),
            Datagram::Admin(AdminCommand::List)
        );
    }

    #[test]
    fn admin_broadcast_keeps_message_verbatim() {
        assert_eq!(
            Datagram::parse("ADMIN:BROADCAST:evacuate Block C").unwrap(),
            Datagram::Admin(AdminCommand::Broadcast("evacuate Block C".into()))
        );
    }

    #[test]
    fn admin_broadcast_may_decode_empty() {
        assert_eq!(
            Datagram::parse("ADMIN:BROADCAST:").unwrap(),
            Datagram::Admin(AdminCommand::Broadcast(String::new()))
        );
    }

    #[test]
    fn admin_unknown_suffix_fails() {
        for msg in ["ADMIN:KICK:x", "ADMIN:", "ADMIN:list", "ADMIN:BROADCAST"] {
            assert_eq!(Datagram::parse(msg), Err(WireError::UnknownAdmin), "{msg:?}");
        }
    }

    #[test]
    fn unprefixed_datagram_is_unknown() {
        assert_eq!(
            Datagram::parse("hello world"),
            Err(WireError::UnknownDatagram)
        );
    }

    #[test]
    fn heartbeat_round_trips() {
        let hb = Heartbeat {
            name: LogicalName::new("MULTAN", "ADMISSIONS"),
            udp_port: 9444,
        };
        assert_eq!(
            Datagram::parse(&hb.encode()).unwrap(),
            Datagram::Heartbeat(hb)
        );
    }
}
