//! In-memory admission control.
//!
//! DESIGN
//! ======
//! Sliding-window ledgers backed by `HashMap<String, VecDeque<Instant>>`,
//! keyed by an arbitrary identifier (client id for socket frames, client IP
//! for AI assist). Each check prunes the identifier's ledger, then admits and
//! records `now` only while the window holds fewer than `max_requests`
//! entries. A denied check records nothing.
//!
//! TRADE-OFFS
//! ==========
//! One mutex guards every ledger, so the prune/compare/append sequence for an
//! identifier is atomic and the last free slot cannot be handed out twice.
//! Checks are a few pointer moves, so contention across identifiers is not a
//! concern at this scale. Empty ledgers are dropped by `cleanup`, which uses a
//! 2x window horizon so an identifier hovering at the window edge is not
//! evicted and recreated on every sweep.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;
use crate::message::ErrorCode;

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rate limit exceeded (max {limit} requests/{window_secs}s)")]
pub struct RateLimitError {
    pub limit: usize,
    pub window_secs: u64,
}

impl ErrorCode for RateLimitError {
    fn error_code(&self) -> &'static str {
        "E_RATE_LIMITED"
    }

    fn retryable(&self) -> bool {
        true
    }

    fn retry_after_secs(&self) -> Option<u64> {
        Some(self.window_secs.max(1))
    }
}

// =============================================================================
// RATE LIMITER
// =============================================================================

#[derive(Clone)]
pub struct RateLimiter {
    ledgers: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self { ledgers: Arc::new(Mutex::new(HashMap::new())), config }
    }

    #[must_use]
    pub fn max_requests(&self) -> usize {
        self.config.max_requests
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.config.window
    }

    /// Admit and record one request for `identifier`, or report why not.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError`] when the window is already full.
    pub fn check(&self, identifier: &str) -> Result<(), RateLimitError> {
        self.check_at(identifier, Instant::now())
    }

    /// Internal: check + record with explicit timestamp (for testing).
    fn check_at(&self, identifier: &str, now: Instant) -> Result<(), RateLimitError> {
        let mut ledgers = self.ledgers.lock().unwrap_or_else(PoisonError::into_inner);
        let cfg = self.config;

        let ledger = ledgers.entry(identifier.to_owned()).or_default();
        prune_window(ledger, now, cfg.window);
        if ledger.len() >= cfg.max_requests {
            return Err(RateLimitError { limit: cfg.max_requests, window_secs: cfg.window.as_secs() });
        }

        ledger.push_back(now);
        Ok(())
    }

    /// Drop identifiers with no activity inside twice the window.
    /// Returns the number of identifiers removed.
    pub fn cleanup(&self) -> usize {
        self.cleanup_at(Instant::now())
    }

    fn cleanup_at(&self, now: Instant) -> usize {
        let mut ledgers = self.ledgers.lock().unwrap_or_else(PoisonError::into_inner);
        let horizon = self.config.window.saturating_mul(2);
        let before = ledgers.len();
        ledgers.retain(|_, ledger| {
            prune_window(ledger, now, horizon);
            !ledger.is_empty()
        });
        before - ledgers.len()
    }

    /// Number of identifiers currently holding a ledger.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.ledgers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Drop timestamps at or beyond `window` age. An entry exactly one window old
/// no longer counts against the identifier.
fn prune_window(deque: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = deque.front() {
        if now.saturating_duration_since(front) >= window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
