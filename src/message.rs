//! Message — the wire type shared by every `FastBoard` connection.
//!
//! ARCHITECTURE
//! ============
//! Every communication over the socket is a `Message`: a JSON object with a
//! `type` discriminator, the originating `clientId`, and a type-specific
//! `payload`. Clients send `draw`, `text`, `clear`, and `cursor`; the server
//! alone emits `user_count`, `board_state`, and `error` under the reserved
//! client id `"server"`.
//!
//! DESIGN
//! ======
//! - `Body` is an adjacently tagged enum, so `type` and `payload` map onto
//!   the variant and its struct without a hand-written codec.
//! - Payload structs deny unknown fields. Forward compatibility is handled by
//!   versioning the client, not by silently dropping data.
//! - Inbound parsing lives in `validate`; this module only describes shapes
//!   and builds server-originated messages.

use axum::extract::ws::Utf8Bytes;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Client id stamped on every server-originated message.
pub const SERVER_CLIENT_ID: &str = "server";

/// Maximum characters in a text action.
pub const MAX_TEXT_CHARS: usize = 1000;

/// Maximum characters in a text action's CSS font string.
pub const MAX_FONT_CHARS: usize = 100;

/// Absolute bound on draw point coordinates.
pub const COORDINATE_LIMIT: f64 = 10_000.0;

pub const MIN_BRUSH_SIZE: u32 = 1;
pub const MAX_BRUSH_SIZE: u32 = 100;

pub const DEFAULT_FONT: &str = "16px Arial";

/// Serialized message, cheap to clone across many outbound queues.
pub type Outbound = Utf8Bytes;

// =============================================================================
// PAYLOADS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Pen,
    Eraser,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DrawPayload {
    pub tool: Tool,
    /// `#RRGGBB`.
    pub color: String,
    /// Whole number; `4.0` is read as `4`.
    #[serde(deserialize_with = "whole_number")]
    pub size: u32,
    pub points: Vec<Point>,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let n = serde_json::Number::deserialize(deserializer)?;
    if let Some(v) = n.as_u64() {
        return u32::try_from(v).map_err(|_| D::Error::custom(format!("{v} is out of range")));
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&f) => Ok(f as u32),
        _ => Err(D::Error::custom(format!("expected a whole number, got {n}"))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextPayload {
    pub content: String,
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_font")]
    pub font: String,
    pub color: String,
}

fn default_font() -> String {
    DEFAULT_FONT.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CursorPayload {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCountPayload {
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardStatePayload {
    pub actions: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    pub code: String,
    /// Whether the same request may succeed later. Omitted when false.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
    /// Seconds the client should wait before retrying. Set on admission errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

// =============================================================================
// MESSAGE
// =============================================================================

/// Type-specific half of a message. Serializes as `"type"` + `"payload"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Body {
    Draw(DrawPayload),
    Text(TextPayload),
    Clear,
    Cursor(CursorPayload),
    UserCount(UserCountPayload),
    BoardState(BoardStatePayload),
    Error(ErrorPayload),
}

/// The universal message type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "clientId")]
    pub client_id: String,
    #[serde(flatten)]
    pub body: Body,
}

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code, retryable flag, and optional retry hint for
/// structured `error` messages.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }

    fn retry_after_secs(&self) -> Option<u64> {
        None
    }
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

impl Message {
    #[must_use]
    pub fn new(client_id: impl Into<String>, body: Body) -> Self {
        Self { client_id: client_id.into(), body }
    }

    /// Live session count announcement.
    #[must_use]
    pub fn user_count(count: usize) -> Self {
        Self::new(SERVER_CLIENT_ID, Body::UserCount(UserCountPayload { count }))
    }

    /// Full board snapshot for a newly connected session.
    #[must_use]
    pub fn board_state(actions: Vec<Message>) -> Self {
        Self::new(SERVER_CLIENT_ID, Body::BoardState(BoardStatePayload { actions }))
    }

    /// Structured error message from a typed error.
    #[must_use]
    pub fn error_from(err: &(impl ErrorCode + ?Sized)) -> Self {
        Self::new(
            SERVER_CLIENT_ID,
            Body::Error(ErrorPayload {
                message: err.to_string(),
                code: err.error_code().to_string(),
                retryable: err.retryable(),
                retry_after_secs: err.retry_after_secs(),
            }),
        )
    }
}

// =============================================================================
// PROPERTIES
// =============================================================================

impl Body {
    /// Wire name of the variant, as it appears in the `type` field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Draw(_) => "draw",
            Self::Text(_) => "text",
            Self::Clear => "clear",
            Self::Cursor(_) => "cursor",
            Self::UserCount(_) => "user_count",
            Self::BoardState(_) => "board_state",
            Self::Error(_) => "error",
        }
    }
}

impl Message {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.body.kind()
    }

    /// Whether the message mutates the board log (draw, text, clear).
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.body, Body::Draw(_) | Body::Text(_) | Body::Clear)
    }

    /// Serialize once for fan-out.
    ///
    /// # Errors
    ///
    /// Returns the serializer error. Not expected for well-formed messages.
    pub fn encode(&self) -> Result<Outbound, serde_json::Error> {
        serde_json::to_string(self).map(Outbound::from)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;
