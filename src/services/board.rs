//! Board service — the canonical log of persisted actions.
//!
//! DESIGN
//! ======
//! The board is an ordered log of `draw` and `text` messages since the last
//! `clear`. `clear` empties it in place under the lock, so a concurrent
//! snapshot sees either the full pre-clear log or an empty one, never a
//! partial truncation. Cursor and server-originated messages never reach it.
//!
//! The log is capped. When full, the oldest action is evicted so memory stays
//! bounded under sustained drawing without a clear; a late joiner then sees
//! the most recent `max_actions` strokes.
//!
//! LOCKING
//! =======
//! `lock` exposes the guard so the dispatcher can apply an action and take
//! its recipient snapshot in one critical section, and so registration can
//! enqueue a new session's snapshot in one. Lock order is board log before
//! session registry, everywhere.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::message::{Body, Message};

// =============================================================================
// ACTIONS
// =============================================================================

/// The log contents. Only reachable through [`BoardLog::lock`].
#[derive(Debug, Default)]
pub struct BoardActions {
    actions: VecDeque<Message>,
    /// `0` means unbounded.
    max_actions: usize,
}

impl BoardActions {
    /// Apply one validated message. Draw/text append, clear truncates,
    /// anything else is ignored.
    pub fn apply(&mut self, message: &Message) {
        match &message.body {
            Body::Draw(_) | Body::Text(_) => {
                if self.max_actions > 0 && self.actions.len() >= self.max_actions {
                    self.actions.pop_front();
                    warn!(max_actions = self.max_actions, "board log full; evicted oldest action");
                }
                self.actions.push_back(message.clone());
                debug!(kind = message.kind(), client_id = %message.client_id, len = self.actions.len(), "board action appended");
            }
            Body::Clear => {
                if self.is_empty() {
                    debug!(client_id = %message.client_id, "clear on empty board");
                    return;
                }
                let dropped = self.actions.len();
                self.actions.clear();
                info!(client_id = %message.client_id, dropped, "board cleared");
            }
            Body::Cursor(_) | Body::UserCount(_) | Body::BoardState(_) | Body::Error(_) => {}
        }
    }

    /// Owned copy of the log in arrival order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Message> {
        self.actions.iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

// =============================================================================
// BOARD LOG
// =============================================================================

/// Shared handle to the board log. Clone is cheap.
#[derive(Clone)]
pub struct BoardLog {
    inner: Arc<Mutex<BoardActions>>,
}

impl BoardLog {
    #[must_use]
    pub fn new(max_actions: usize) -> Self {
        Self { inner: Arc::new(Mutex::new(BoardActions { actions: VecDeque::new(), max_actions })) }
    }

    /// Acquire the log for a compound operation.
    pub async fn lock(&self) -> MutexGuard<'_, BoardActions> {
        self.inner.lock().await
    }

    /// Number of actions currently on the board.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
impl BoardLog {
    pub async fn apply(&self, message: &Message) {
        self.inner.lock().await.apply(message);
    }

    pub async fn snapshot(&self) -> Vec<Message> {
        self.inner.lock().await.snapshot()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[cfg(test)]
#[path = "board_test.rs"]
mod tests;
