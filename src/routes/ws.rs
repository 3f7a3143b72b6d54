//! WebSocket handler — one task per connection.
//!
//! DESIGN
//! ======
//! On upgrade the session is registered with the board snapshot as its first
//! queued message, then the task enters a `select!` loop:
//! - Incoming client frames → admission → validation → dispatch
//! - Outbound queue (board_state, peers' actions, user_count, errors) → socket
//!
//! Every outbound message, including replies to this client, goes through the
//! session's queue, so the socket has a single writer and per-session order is
//! queue order.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → register, enqueue `board_state`, broadcast `user_count`
//! 2. Client frames → `process_inbound_text`
//! 3. Close or transport error → deregister, broadcast `user_count`
//! 4. Eviction elsewhere (reaper, failed send) drops the queue's sender; the
//!    loop sees its receiver close and shuts the socket

use std::net::SocketAddr;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::message::{ErrorCode, Message, Outbound, SERVER_CLIENT_ID};
use crate::services::broadcast::{self, DisconnectCause};
use crate::services::session::SessionHandle;
use crate::state::AppState;
use crate::validate::ValidationError;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    if client_id.trim().is_empty() || client_id == SERVER_CLIENT_ID {
        return (StatusCode::BAD_REQUEST, "invalid client id").into_response();
    }
    let address = super::client_address(&headers, Some(peer));
    ws.on_upgrade(move |socket| run_ws(socket, state, client_id, address))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(socket: WebSocket, state: AppState, client_id: String, address: Option<String>) {
    let conn = Uuid::new_v4();
    let span = info_span!("ws", %client_id, %conn);
    run_connection(socket, state, client_id, conn, address).instrument(span).await;
}

async fn run_connection(
    mut socket: WebSocket,
    state: AppState,
    client_id: String,
    conn: Uuid,
    address: Option<String>,
) {
    let (tx, mut rx) = mpsc::channel::<Outbound>(state.config.outbound_queue_capacity);

    if let Err(e) = broadcast::connect(&state, &client_id, conn, SessionHandle::new(tx), address).await {
        warn!(error = %e, "ws: rejecting connection");
        if let Ok(text) = Message::error_from(&e).encode() {
            let _ = socket.send(WsMessage::Text(text)).await;
        }
        let _ = socket.send(WsMessage::Close(None)).await;
        return;
    }

    let cause = loop {
        tokio::select! {
            inbound = socket.recv() => {
                match inbound {
                    None | Some(Ok(WsMessage::Close(_))) => break Some(DisconnectCause::Graceful),
                    Some(Err(e)) => {
                        debug!(error = %e, "ws: receive failed");
                        break Some(DisconnectCause::Transport);
                    }
                    Some(Ok(WsMessage::Text(text))) => {
                        if !process_inbound_text(&state, &client_id, conn, text.as_str()).await {
                            break None;
                        }
                    }
                    Some(Ok(WsMessage::Binary(_))) => {
                        let err = ValidationError::MalformedJson("binary frames are not supported".into());
                        broadcast::send_to(&state, &Message::error_from(&err), &client_id, conn).await;
                    }
                    Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => {
                        state.sessions.touch(&client_id, conn).await;
                    }
                }
            }
            outbound = rx.recv() => {
                let Some(text) = outbound else {
                    // Deregistered elsewhere; the sender is gone.
                    let _ = socket.send(WsMessage::Close(None)).await;
                    break None;
                };
                if let Err(e) = socket.send(WsMessage::Text(text)).await {
                    debug!(error = %e, "ws: send failed");
                    break Some(DisconnectCause::Transport);
                }
            }
        }
    };

    match cause {
        Some(cause) => {
            broadcast::disconnect(&state, &client_id, conn, cause).await;
        }
        None => info!("ws: session evicted; connection closed"),
    }
}

// =============================================================================
// INBOUND
// =============================================================================

/// Handle one inbound text frame. Errors are queued back to the sender and
/// never close the connection. Returns `false` once connection `conn` is no
/// longer the registered session for `client_id`.
pub(crate) async fn process_inbound_text(state: &AppState, client_id: &str, conn: Uuid, raw: &str) -> bool {
    if !state.sessions.touch(client_id, conn).await {
        return false;
    }

    if let Err(e) = state.ws_limiter.check(client_id) {
        warn!(error = %e, "ws: inbound frame rejected by admission control");
        broadcast::send_to(state, &Message::error_from(&e), client_id, conn).await;
        return true;
    }

    let message = match state.validator.validate(raw, client_id) {
        Ok(message) => message,
        Err(e) => {
            warn!(code = e.error_code(), error = %e, "ws: invalid inbound message");
            broadcast::send_to(state, &Message::error_from(&e), client_id, conn).await;
            return true;
        }
    };

    if message.is_persistent() {
        debug!(kind = message.kind(), "ws: recv action");
    }
    if let Err(e) = broadcast::dispatch(state, &message, client_id).await {
        error!(kind = message.kind(), error = ?e, "ws: dispatch failed");
        broadcast::send_to(state, &Message::error_from(&e), client_id, conn).await;
    }
    true
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
