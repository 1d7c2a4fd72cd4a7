use cdr_common::LogicalName;
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Opaque handle for one accepted stream connection. Issued from a
/// monotonic counter and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

/// Server-side state for one accepted stream connection.
///
/// `datagram` and `last_heartbeat` are meaningful only while the
/// session is authenticated; both are cleared on (re)authentication.
#[derive(Debug)]
struct Session {
    /// Delivery queue feeding the connection's writer task.
    tx: mpsc::Sender<Vec<u8>>,
    /// Present only once authenticated.
    identity: Option<LogicalName>,
    /// Last reported datagram endpoint; `None` once pruned stale.
    datagram: Option<SocketAddr>,
    /// Set on every accepted heartbeat, kept across staleness sweeps.
    last_heartbeat: Option<Instant>,
}

/// One row of a `LIST` snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Authenticated logical name.
    pub name: LogicalName,
    /// Seconds since the last heartbeat, or -1 if none was ever seen.
    pub last_secs: i64,
    /// Whether the datagram endpoint is currently considered live.
    pub reachable: bool,
}

/// Bounded session table keyed by [`SessionId`], with name lookup
/// over authenticated sessions.
///
/// Multiple sessions may authenticate under the same logical name;
/// name lookups return a single match in unspecified map order. This
/// ambiguity is inherited behavior, kept deliberately.
#[derive(Debug)]
pub struct Registry {
    sessions: DashMap<SessionId, Session>,
    next_id: AtomicU64,
    capacity: usize,
}

impl Registry {
    /// Creates an empty registry holding at most `capacity` sessions.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            next_id: AtomicU64::new(0),
            capacity,
        }
    }

    /// Registers a new unauthenticated session, or `None` when the
    /// table is full. Only the accept loop inserts, so the length
    /// check does not race with other insertions.
    #[must_use]
    pub fn insert(&self, tx: mpsc::Sender<Vec<u8>>) -> Option<SessionId> {
        if self.sessions.len() >= self.capacity {
            return None;
        }
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.sessions.insert(
            id,
            Session {
                tx,
                identity: None,
                datagram: None,
                last_heartbeat: None,
            },
        );
        Some(id)
    }

    /// Removes a session, freeing its slot.
    pub fn remove(&self, id: SessionId) {
        self.sessions.remove(&id);
    }

    /// Whether the session currently holds an authenticated identity.
    #[must_use]
    pub fn is_authenticated(&self, id: SessionId) -> bool {
        self.sessions
            .get(&id)
            .is_some_and(|s| s.identity.is_some())
    }

    /// Binds an identity to a session and resets its liveness fields.
    /// Returns `false` if the session no longer exists.
    pub fn authenticate(&self, id: SessionId, name: LogicalName) -> bool {
        match self.sessions.get_mut(&id) {
            Some(mut session) => {
                session.identity = Some(name);
                session.datagram = None;
                session.last_heartbeat = None;
                true
            }
            None => false,
        }
    }

    /// Returns the delivery queue of a single authenticated session
    /// holding `name`, in unspecified order when several match.
    #[must_use]
    pub fn sender_for_name(&self, name: &LogicalName) -> Option<mpsc::Sender<Vec<u8>>> {
        self.sessions.iter().find_map(|entry| {
            (entry.identity.as_ref() == Some(name)).then(|| entry.tx.clone())
        })
    }

    /// Records a heartbeat for the authenticated session holding
    /// `name`. Returns `false` if no such session exists.
    pub fn record_heartbeat(&self, name: &LogicalName, endpoint: SocketAddr) -> bool {
        for mut entry in self.sessions.iter_mut() {
            if entry.identity.as_ref() == Some(name) {
                entry.datagram = Some(endpoint);
                entry.last_heartbeat = Some(Instant::now());
                return true;
            }
        }
        false
    }

    /// Clears the datagram endpoint of every session whose last
    /// heartbeat is older than `window`. The sessions themselves
    /// survive. Returns the number of endpoints cleared.
    pub fn mark_stale(&self, window: Duration) -> usize {
        let mut cleared = 0;
        for mut entry in self.sessions.iter_mut() {
            let stale = entry.datagram.is_some()
                && entry
                    .last_heartbeat
                    .is_some_and(|at| at.elapsed() > window);
            if stale {
                entry.datagram = None;
                cleared += 1;
            }
        }
        cleared
    }

    /// Snapshot of every authenticated session's liveness, for LIST.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SessionInfo> {
        self.sessions
            .iter()
            .filter_map(|entry| {
                let name = entry.identity.clone()?;
                Some(SessionInfo {
                    name,
                    last_secs: entry
                        .last_heartbeat
                        .map_or(-1, |at| i64::try_from(at.elapsed().as_secs()).unwrap_or(i64::MAX)),
                    reachable: entry.datagram.is_some(),
                })
            })
            .collect()
    }

    /// Datagram endpoints of every currently reachable session.
    #[must_use]
    pub fn reachable_endpoints(&self) -> Vec<SocketAddr> {
        self.sessions
            .iter()
            .filter_map(|entry| entry.datagram)
            .collect()
    }

    /// Number of live sessions, authenticated or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no sessions exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Configured session capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
