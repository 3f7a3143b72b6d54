//! Inactivity reaper — evicts idle sessions on a fixed interval.
//!
//! DESIGN
//! ======
//! A background task wakes every `reaper_interval`, collects the connections of
//! sessions idle beyond `session_idle_timeout`, and runs each through the
//! normal disconnect path so peers see a `user_count` update exactly as if
//! the socket had failed. The same tick prunes the admission ledgers.
//!
//! The sweep only reads a snapshot of idle connections and then deregisters them one
//! at a time, so connection tasks are never blocked for the whole sweep. A
//! session that becomes active between collection and eviction is still
//! evicted; it was idle for the full threshold when observed.

use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::services::broadcast::{self, DisconnectCause};
use crate::state::AppState;

/// Evict every session idle longer than `timeout`. Returns the number evicted.
pub async fn sweep(state: &AppState, timeout: Duration) -> usize {
    sweep_at(state, Instant::now(), timeout).await
}

pub(crate) async fn sweep_at(state: &AppState, now: Instant, timeout: Duration) -> usize {
    let idle = state.sessions.idle_since(now, timeout).await;
    let mut evicted = 0;
    for (client_id, conn) in idle {
        info!(%client_id, timeout_secs = timeout.as_secs(), "reaping inactive client");
        if broadcast::disconnect(state, &client_id, conn, DisconnectCause::Reaped).await {
            evicted += 1;
        }
    }
    evicted
}

/// Spawn the background reaper. Returns a handle for shutdown.
pub fn spawn_reaper_task(state: AppState) -> JoinHandle<()> {
    let interval = state.config.reaper_interval;
    let timeout = state.config.session_idle_timeout;
    info!(interval_secs = interval.as_secs(), timeout_secs = timeout.as_secs(), "inactivity reaper configured");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; nothing can be idle yet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = sweep(&state, timeout).await;
            let ws_pruned = state.ws_limiter.cleanup();
            let ai_pruned = state.ai_limiter.cleanup();
            if evicted > 0 || ws_pruned > 0 || ai_pruned > 0 {
                let ws_tracked = state.ws_limiter.tracked();
                let ai_tracked = state.ai_limiter.tracked();
                info!(evicted, ws_pruned, ai_pruned, ws_tracked, ai_tracked, "reaper sweep");
            } else {
                debug!("reaper sweep: nothing to do");
            }
        }
    })
}

#[cfg(test)]
#[path = "reaper_test.rs"]
mod tests;
