//! Broadcast service — fan-out plus the connect/disconnect choreography.
//!
//! DESIGN
//! ======
//! Fan-out always iterates a registry snapshot taken up front and sends with
//! `try_send` into each session's bounded queue, so no lock is held while
//! delivering and a slow peer never stalls the sender. A failed send is not
//! retried: the peer is deregistered as dead and the survivors get a fresh
//! `user_count`. Those follow-up announcements can themselves find dead
//! peers, so eviction runs as a loop rather than recursing.
//!
//! ORDERING
//! ========
//! Persistent actions are applied to the board log and the recipient
//! snapshot is taken inside the same board-log critical section. Connect
//! registers the session and enqueues its `board_state` inside that same
//! critical section. An action is therefore either in the joiner's snapshot
//! (and the joiner was not yet a recipient) or broadcast to the joiner after
//! its snapshot, never both and never neither.
//!
//! Every removal names the connection token it observed. A session that
//! reconnected under the same id in the meantime is a different connection
//! and is left alone.

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::message::{ErrorCode, Message, Outbound};
use crate::services::session::{Recipient, Session, SessionError, SessionHandle, SessionInfo};
use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

/// Why a session left. Only affects logging; every cause takes the same
/// deregistration path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectCause {
    /// Peer closed the socket.
    Graceful,
    /// Socket read or write failed.
    Transport,
    /// Outbound queue closed or full during a send.
    SendFailed,
    /// Idle beyond the inactivity threshold.
    Reaped,
}

impl DisconnectCause {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Graceful => "graceful",
            Self::Transport => "transport_error",
            Self::SendFailed => "send_failed",
            Self::Reaped => "reaped",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("message processing failed")]
    Encode(#[source] serde_json::Error),
}

impl ErrorCode for DispatchError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Encode(_) => "E_INTERNAL",
        }
    }
}

// =============================================================================
// CONNECT / DISCONNECT
// =============================================================================

/// Register a new session, hand it the board snapshot as its first message,
/// and announce the new user count.
///
/// # Errors
///
/// Returns [`SessionError::DuplicateSession`] if `client_id` is already live.
pub async fn connect(
    state: &AppState,
    client_id: &str,
    conn: Uuid,
    handle: SessionHandle,
    address: Option<String>,
) -> Result<SessionInfo, SessionError> {
    let (info, snapshot_sent) = {
        let log = state.board.lock().await;
        let info = state
            .sessions
            .register(client_id, conn, handle.clone(), address)
            .await?;
        let snapshot = Message::board_state(log.snapshot());
        let sent = match snapshot.encode() {
            Ok(text) => handle.deliver(&text).is_ok(),
            Err(e) => {
                error!(%client_id, error = %e, "failed to encode board snapshot");
                false
            }
        };
        debug!(%client_id, actions = log.len(), sent, "board snapshot queued");
        (info, sent)
    };

    if !snapshot_sent {
        disconnect(state, client_id, conn, DisconnectCause::SendFailed).await;
        return Ok(info);
    }

    let total = state.sessions.count().await;
    info!(%client_id, address = info.ip_address.as_deref().unwrap_or("unknown"), total, "client connected");
    broadcast_user_count(state).await;
    Ok(info)
}

/// Deregister connection `conn` of `client_id` and announce the new user
/// count. Idempotent: returns `false` if that connection was already gone,
/// including when the id has since reconnected on a new token.
pub async fn disconnect(state: &AppState, client_id: &str, conn: Uuid, cause: DisconnectCause) -> bool {
    let Some(session) = state.sessions.deregister(client_id, conn).await else {
        return false;
    };
    log_disconnect(state, &session, cause).await;
    broadcast_user_count(state).await;
    true
}

async fn log_disconnect(state: &AppState, session: &Session, cause: DisconnectCause) {
    let total = state.sessions.count().await;
    let duration_secs = session.connected_at.elapsed().as_secs_f64();
    match cause {
        DisconnectCause::Graceful | DisconnectCause::Reaped => {
            info!(client_id = %session.client_id, cause = cause.as_str(), duration_secs, total, "client disconnected");
        }
        DisconnectCause::Transport | DisconnectCause::SendFailed => {
            warn!(client_id = %session.client_id, cause = cause.as_str(), duration_secs, total, "client dropped");
        }
    }
}

// =============================================================================
// FAN-OUT
// =============================================================================

/// Send `message` to every live session except `exclude`. Returns the
/// number of sessions that accepted it.
pub async fn broadcast(state: &AppState, message: &Message, exclude: Option<&str>) -> usize {
    let text = match message.encode() {
        Ok(t) => t,
        Err(e) => {
            error!(kind = message.kind(), error = %e, "broadcast: failed to encode message");
            return 0;
        }
    };
    let recipients = state.sessions.snapshot().await;
    fan_out(state, &text, recipients, exclude).await
}

/// Send `message` to exactly one connection. Nothing is sent unless `conn`
/// is still the live connection for `client_id`. A failed send deregisters it.
pub async fn send_to(state: &AppState, message: &Message, client_id: &str, conn: Uuid) -> bool {
    let handle = match state.sessions.recipient(client_id).await {
        Some(r) if r.conn == conn => r.handle,
        _ => {
            debug!(%client_id, kind = message.kind(), "send_to: no such session");
            return false;
        }
    };
    let text = match message.encode() {
        Ok(t) => t,
        Err(e) => {
            error!(%client_id, kind = message.kind(), error = %e, "send_to: failed to encode message");
            return false;
        }
    };
    match handle.deliver(&text) {
        Ok(()) => {
            state.sessions.touch(client_id, conn).await;
            true
        }
        Err(e) => {
            warn!(%client_id, error = %e, "send_to: delivery failed");
            disconnect(state, client_id, conn, DisconnectCause::SendFailed).await;
            false
        }
    }
}

/// Announce the current live session count to everyone.
pub async fn broadcast_user_count(state: &AppState) -> usize {
    let count = state.sessions.count().await;
    broadcast(state, &Message::user_count(count), None).await
}

/// Route one validated client message: persistent kinds go through the
/// board log, everything is fanned out to every session but the sender.
///
/// # Errors
///
/// Returns [`DispatchError`] if the message cannot be serialized. The board
/// log is untouched in that case.
pub async fn dispatch(state: &AppState, message: &Message, sender: &str) -> Result<usize, DispatchError> {
    let text = message.encode().map_err(DispatchError::Encode)?;
    let recipients = if message.is_persistent() {
        let mut log = state.board.lock().await;
        log.apply(message);
        state.sessions.snapshot().await
    } else {
        state.sessions.snapshot().await
    };
    Ok(fan_out(state, &text, recipients, Some(sender)).await)
}

async fn fan_out(
    state: &AppState,
    text: &Outbound,
    recipients: Vec<Recipient>,
    exclude: Option<&str>,
) -> usize {
    let (delivered, failed) = deliver_all(state, text, recipients, exclude).await;
    if !failed.is_empty() {
        evict_failed(state, failed).await;
    }
    delivered
}

/// Deliver to each recipient, touching the ones that accepted. Returns the
/// delivered count and the recipients that failed.
async fn deliver_all(
    state: &AppState,
    text: &Outbound,
    recipients: Vec<Recipient>,
    exclude: Option<&str>,
) -> (usize, Vec<Recipient>) {
    let mut delivered = Vec::with_capacity(recipients.len());
    let mut failed = Vec::new();
    for recipient in recipients {
        if exclude == Some(recipient.client_id.as_str()) {
            continue;
        }
        match recipient.handle.deliver(text) {
            Ok(()) => delivered.push(recipient),
            Err(e) => {
                warn!(client_id = %recipient.client_id, error = %e, "broadcast: send failed");
                failed.push(recipient);
            }
        }
    }
    state.sessions.touch_many(&delivered).await;
    (delivered.len(), failed)
}

/// Deregister dead peers and tell the survivors, repeating while the
/// announcement itself uncovers more dead peers.
async fn evict_failed(state: &AppState, mut failed: Vec<Recipient>) {
    while !failed.is_empty() {
        let mut removed = 0usize;
        for r in &failed {
            if let Some(session) = state.sessions.deregister(&r.client_id, r.conn).await {
                log_disconnect(state, &session, DisconnectCause::SendFailed).await;
                removed += 1;
            }
        }
        if removed == 0 {
            break;
        }

        let count = state.sessions.count().await;
        let text = match Message::user_count(count).encode() {
            Ok(t) => t,
            Err(e) => {
                error!(error = %e, "failed to encode user count");
                break;
            }
        };
        let recipients = state.sessions.snapshot().await;
        let (_, next) = deliver_all(state, &text, recipients, None).await;
        failed = next;
    }
}

#[cfg(test)]
#[path = "broadcast_test.rs"]
mod tests;
