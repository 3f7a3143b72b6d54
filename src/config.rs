//! Process configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Every knob has a compiled-in default. A missing or unparsable variable
//! falls back to that default instead of failing startup; the only hard
//! requirement is a bindable listen address. `.env` is loaded first when
//! present so local runs match deployed ones.

use std::time::Duration;

pub const APP_NAME: &str = "FastBoard";
pub const APP_DESCRIPTION: &str = "Real-time collaborative whiteboard";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_MAX_STROKE_POINTS: usize = 1000;
const DEFAULT_BOARD_LOG_MAX_ACTIONS: usize = 10_000;
const DEFAULT_SESSION_IDLE_TIMEOUT_SECS: u64 = 300;
const DEFAULT_REAPER_INTERVAL_SECS: u64 = 60;
const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 256;
const DEFAULT_WS_RATE_LIMIT_REQUESTS: usize = 100;
const DEFAULT_WS_RATE_LIMIT_WINDOW_SECS: u64 = 1;
const DEFAULT_AI_RATE_LIMIT_REQUESTS: usize = 10;
const DEFAULT_AI_RATE_LIMIT_WINDOW_SECS: u64 = 60;
const DEFAULT_STATIC_DIR: &str = "static";

/// Sliding-window admission settings for one limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window: Duration,
}

/// Typed process configuration. Built once in `main` and shared via `AppState`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// Upper bound on points in a single draw stroke.
    pub max_stroke_points: usize,
    /// Board log capacity. `0` disables the cap.
    pub board_log_max_actions: usize,
    pub session_idle_timeout: Duration,
    pub reaper_interval: Duration,
    /// Per-session outbound queue depth. A full queue counts as a dead peer.
    pub outbound_queue_capacity: usize,
    /// Inbound frame admission, keyed by client id.
    pub ws_rate_limit: RateLimitConfig,
    /// AI assist admission, keyed by client IP.
    pub ai_rate_limit: RateLimitConfig,
    pub static_dir: String,
}

impl Config {
    /// Build the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        // A missing .env is the normal case outside local development.
        let _ = dotenvy::dotenv();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: env_parse("PORT", DEFAULT_PORT),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string()),
            max_stroke_points: env_parse("MAX_STROKE_POINTS", DEFAULT_MAX_STROKE_POINTS),
            board_log_max_actions: env_parse("BOARD_LOG_MAX_ACTIONS", DEFAULT_BOARD_LOG_MAX_ACTIONS),
            session_idle_timeout: Duration::from_secs(env_parse(
                "SESSION_IDLE_TIMEOUT_SECS",
                DEFAULT_SESSION_IDLE_TIMEOUT_SECS,
            )),
            reaper_interval: Duration::from_secs(
                env_parse("REAPER_INTERVAL_SECS", DEFAULT_REAPER_INTERVAL_SECS).max(1),
            ),
            outbound_queue_capacity: env_parse("OUTBOUND_QUEUE_CAPACITY", DEFAULT_OUTBOUND_QUEUE_CAPACITY).max(1),
            ws_rate_limit: RateLimitConfig {
                max_requests: env_parse("WS_RATE_LIMIT_REQUESTS", DEFAULT_WS_RATE_LIMIT_REQUESTS),
                window: Duration::from_secs(env_parse("WS_RATE_LIMIT_WINDOW_SECS", DEFAULT_WS_RATE_LIMIT_WINDOW_SECS)),
            },
            ai_rate_limit: RateLimitConfig {
                max_requests: env_parse("AI_RATE_LIMIT_REQUESTS", DEFAULT_AI_RATE_LIMIT_REQUESTS),
                window: Duration::from_secs(env_parse("AI_RATE_LIMIT_WINDOW_SECS", DEFAULT_AI_RATE_LIMIT_WINDOW_SECS)),
            },
            static_dir: std::env::var("STATIC_DIR").unwrap_or_else(|_| DEFAULT_STATIC_DIR.to_string()),
        }
    }

    /// `host:port` string suitable for `TcpListener::bind`.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Map `LOG_LEVEL` onto a tracing level. Also accepts the
    /// `WARNING`/`CRITICAL` spellings.
    #[must_use]
    pub fn tracing_level(&self) -> tracing::Level {
        match self.log_level.to_ascii_lowercase().as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "warn" | "warning" => tracing::Level::WARN,
            "error" | "critical" => tracing::Level::ERROR,
            _ => tracing::Level::INFO,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            max_stroke_points: DEFAULT_MAX_STROKE_POINTS,
            board_log_max_actions: DEFAULT_BOARD_LOG_MAX_ACTIONS,
            session_idle_timeout: Duration::from_secs(DEFAULT_SESSION_IDLE_TIMEOUT_SECS),
            reaper_interval: Duration::from_secs(DEFAULT_REAPER_INTERVAL_SECS),
            outbound_queue_capacity: DEFAULT_OUTBOUND_QUEUE_CAPACITY,
            ws_rate_limit: RateLimitConfig {
                max_requests: DEFAULT_WS_RATE_LIMIT_REQUESTS,
                window: Duration::from_secs(DEFAULT_WS_RATE_LIMIT_WINDOW_SECS),
            },
            ai_rate_limit: RateLimitConfig {
                max_requests: DEFAULT_AI_RATE_LIMIT_REQUESTS,
                window: Duration::from_secs(DEFAULT_AI_RATE_LIMIT_WINDOW_SECS),
            },
            static_dir: DEFAULT_STATIC_DIR.to_string(),
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
