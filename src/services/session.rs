//! Session registry — the set of live connections.
//!
//! ARCHITECTURE
//! ============
//! Each live socket is a `Session` keyed by its caller-supplied client id and
//! stamped with a per-connection `conn` token. The id names the user; the
//! token names one socket. A client that reconnects under the same id gets a
//! new token, so a task still winding down on the old socket cannot touch,
//! reply through, or deregister the new session.
//! The registry owns the only strong handle to a session's outbound queue:
//! when a session is deregistered the queue's sender is dropped, the
//! connection task observes its receiver closing, and it exits. That is how
//! eviction by the reaper or by a failed broadcast reaches the socket.
//!
//! DESIGN
//! ======
//! - Register never replaces a live session. The transport layer must remove
//!   the old one first.
//! - Deregister is idempotent and returns the removed session so exactly one
//!   caller observes the removal (and announces the new user count). It only
//!   removes the entry when both id and token match.
//! - `snapshot` clones `Recipient`s under a read lock and releases it, so
//!   fan-out never holds the lock while sending. A failed send evicts the
//!   exact connection it was sent to.
//!
//! The registry has no knowledge of the board log or broadcasting; the
//! connect/disconnect choreography lives in `services::broadcast`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::message::{ErrorCode, Outbound};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("client id already connected: {0}")]
    DuplicateSession(String),
}

impl ErrorCode for SessionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateSession(_) => "E_DUPLICATE_SESSION",
        }
    }
}

/// Why a send to a session's outbound queue failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// The connection task is gone.
    #[error("outbound queue closed")]
    Closed,
    /// The peer is not draining its queue.
    #[error("outbound queue full")]
    Full,
}

/// Opaque transport handle: the sending half of a session's bounded
/// outbound queue. The connection task drains the other half onto the socket.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Outbound>,
}

impl SessionHandle {
    #[must_use]
    pub fn new(tx: mpsc::Sender<Outbound>) -> Self {
        Self { tx }
    }

    /// Enqueue one serialized message without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] when the queue is closed or full. Either way the
    /// session is considered dead.
    pub fn deliver(&self, text: &Outbound) -> Result<(), SendError> {
        self.tx.try_send(text.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::Full,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }
}

/// One live connection and its metadata.
#[derive(Debug, Clone)]
pub struct Session {
    pub client_id: String,
    /// Per-connection token; differs across reconnects under the same id.
    pub conn: Uuid,
    pub handle: SessionHandle,
    pub address: Option<String>,
    /// Wall clock at connect, for reporting.
    pub connected_wall: SystemTime,
    /// Monotonic clock at connect.
    pub connected_at: Instant,
    /// Monotonic clock at last successful send or receive.
    pub last_activity: Instant,
}

impl Session {
    /// Reporting view: Unix-second timestamps plus derived duration.
    #[must_use]
    pub fn info(&self) -> SessionInfo {
        let connected_at = unix_secs(self.connected_wall);
        let active_for = self.last_activity.saturating_duration_since(self.connected_at);
        SessionInfo {
            client_id: self.client_id.clone(),
            connected_at,
            last_activity: connected_at + active_for.as_secs_f64(),
            ip_address: self.address.clone(),
            session_duration: active_for.as_secs_f64(),
        }
    }

    /// Time since the session was last active.
    #[must_use]
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    fn recipient(&self) -> Recipient {
        Recipient { client_id: self.client_id.clone(), conn: self.conn, handle: self.handle.clone() }
    }
}

/// A session as seen by a sender.
#[derive(Debug, Clone)]
pub struct Recipient {
    pub client_id: String,
    pub conn: Uuid,
    pub handle: SessionHandle,
}

/// Serializable per-session statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
    pub client_id: String,
    pub connected_at: f64,
    pub last_activity: f64,
    pub ip_address: Option<String>,
    pub session_duration: f64,
}

fn unix_secs(at: SystemTime) -> f64 {
    at.duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}

// =============================================================================
// REGISTRY
// =============================================================================

#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a live session under the connection token `conn`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::DuplicateSession`] if `client_id` is already live.
    pub async fn register(
        &self,
        client_id: &str,
        conn: Uuid,
        handle: SessionHandle,
        address: Option<String>,
    ) -> Result<SessionInfo, SessionError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(client_id) {
            return Err(SessionError::DuplicateSession(client_id.to_owned()));
        }
        let now = Instant::now();
        let session = Session {
            client_id: client_id.to_owned(),
            conn,
            handle,
            address,
            connected_wall: SystemTime::now(),
            connected_at: now,
            last_activity: now,
        };
        let info = session.info();
        sessions.insert(client_id.to_owned(), session);
        Ok(info)
    }

    /// Remove the session registered as `client_id` on connection `conn`.
    /// Unknown ids and stale tokens are a no-op and return `None`.
    pub async fn deregister(&self, client_id: &str, conn: Uuid) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        if sessions.get(client_id)?.conn != conn {
            return None;
        }
        sessions.remove(client_id)
    }

    /// Mark a session active now. Returns whether `conn` is still the live
    /// connection for `client_id`.
    pub async fn touch(&self, client_id: &str, conn: Uuid) -> bool {
        self.touch_at(client_id, conn, Instant::now()).await
    }

    pub(crate) async fn touch_at(&self, client_id: &str, conn: Uuid, now: Instant) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(client_id) {
            Some(session) if session.conn == conn => {
                session.last_activity = now;
                true
            }
            _ => false,
        }
    }

    /// Mark several sessions active under one lock acquisition.
    pub async fn touch_many(&self, recipients: &[Recipient]) {
        if recipients.is_empty() {
            return;
        }
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        for r in recipients {
            if let Some(session) = sessions.get_mut(&r.client_id).filter(|s| s.conn == r.conn) {
                session.last_activity = now;
            }
        }
    }

    /// Point-in-time view, safe to iterate while the registry keeps changing.
    pub async fn snapshot(&self) -> Vec<Recipient> {
        let sessions = self.sessions.read().await;
        sessions.values().map(Session::recipient).collect()
    }

    /// The live connection for `client_id`, if any.
    pub async fn recipient(&self, client_id: &str) -> Option<Recipient> {
        let sessions = self.sessions.read().await;
        sessions.get(client_id).map(Session::recipient)
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    #[cfg(test)]
    pub async fn contains(&self, client_id: &str) -> bool {
        self.sessions.read().await.contains_key(client_id)
    }

    /// Statistics for every live session, ordered by connect time.
    pub async fn connection_info(&self) -> Vec<SessionInfo> {
        let sessions = self.sessions.read().await;
        let mut live: Vec<&Session> = sessions.values().collect();
        live.sort_by_key(|s| s.connected_at);
        live.into_iter().map(Session::info).collect()
    }

    /// `(id, conn)` of sessions idle for longer than `timeout` as of `now`.
    pub async fn idle_since(&self, now: Instant, timeout: Duration) -> Vec<(String, Uuid)> {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .filter(|s| s.idle_for(now) > timeout)
            .map(|s| (s.client_id.clone(), s.conn))
            .collect()
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
