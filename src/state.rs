//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor and
//! cloned into every connection task. Each field is a cheap handle onto
//! shared state: the session registry, the board log, the two admission
//! ledgers, and the optional vision client.
//!
//! Lock order: board log before session registry. Nothing acquires them in
//! the other order.

use std::sync::Arc;

use crate::config::Config;
use crate::llm::LlmVision;
use crate::rate_limit::RateLimiter;
use crate::services::board::BoardLog;
use crate::services::session::SessionRegistry;
use crate::validate::Validator;

/// Shared application state. Clone is cheap (all inner state is `Arc`-wrapped).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: SessionRegistry,
    pub board: BoardLog,
    pub validator: Validator,
    /// Inbound WebSocket frames, keyed by client id.
    pub ws_limiter: RateLimiter,
    /// AI assist requests, keyed by client IP.
    pub ai_limiter: RateLimiter,
    /// Vision client. `None` disables AI assist.
    pub llm: Option<Arc<dyn LlmVision>>,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config, llm: Option<Arc<dyn LlmVision>>) -> Self {
        Self {
            sessions: SessionRegistry::new(),
            board: BoardLog::new(config.board_log_max_actions),
            validator: Validator::new(config.max_stroke_points),
            ws_limiter: RateLimiter::new(config.ws_rate_limit),
            ai_limiter: RateLimiter::new(config.ai_rate_limit),
            config: Arc::new(config),
            llm,
        }
    }

    /// Borrow the vision client, if configured.
    #[must_use]
    pub fn llm(&self) -> Option<&dyn LlmVision> {
        self.llm.as_deref()
    }
}


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
