//! Inbound message validation.
//!
//! DESIGN
//! ======
//! Raw socket text is parsed into an untyped JSON object first so the four
//! failure classes stay distinguishable: broken JSON, a missing envelope
//! key, an identity mismatch, and everything else (schema). Only then is the
//! payload deserialized into its typed struct and range-checked.
//!
//! Validation is pure. It never touches the board log or the registry; the
//! caller decides what to do with a valid message via `Message::is_persistent`.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::message::{
    Body, COORDINATE_LIMIT, CursorPayload, DrawPayload, ErrorCode, MAX_BRUSH_SIZE, MAX_FONT_CHARS, MAX_TEXT_CHARS,
    MIN_BRUSH_SIZE, Message, TextPayload,
};

const FIELD_TYPE: &str = "type";
const FIELD_CLIENT_ID: &str = "clientId";
const FIELD_PAYLOAD: &str = "payload";

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid JSON format: {0}")]
    MalformedJson(String),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("client id mismatch")]
    ClientIdMismatch,
    #[error("message validation failed: {0}")]
    SchemaViolation(String),
}

impl ErrorCode for ValidationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedJson(_) => "E_MALFORMED_JSON",
            Self::MissingField(_) => "E_MISSING_FIELD",
            Self::ClientIdMismatch => "E_CLIENT_ID_MISMATCH",
            Self::SchemaViolation(_) => "E_SCHEMA_VIOLATION",
        }
    }
}

fn schema(reason: impl Into<String>) -> ValidationError {
    ValidationError::SchemaViolation(reason.into())
}

// =============================================================================
// VALIDATOR
// =============================================================================

/// Schema checker for client-originated messages.
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    max_stroke_points: usize,
}

impl Validator {
    #[must_use]
    pub fn new(max_stroke_points: usize) -> Self {
        Self { max_stroke_points }
    }

    /// Parse and check one inbound frame from the connection bound to
    /// `expected_client_id`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn validate(&self, raw: &str, expected_client_id: &str) -> Result<Message, ValidationError> {
        let value: Value = serde_json::from_str(raw).map_err(|e| ValidationError::MalformedJson(e.to_string()))?;
        let Value::Object(mut envelope) = value else {
            return Err(ValidationError::MalformedJson("message must be a JSON object".into()));
        };

        let Some(kind) = envelope.remove(FIELD_TYPE) else {
            return Err(ValidationError::MissingField(FIELD_TYPE));
        };
        let Some(client_id) = envelope.remove(FIELD_CLIENT_ID) else {
            return Err(ValidationError::MissingField(FIELD_CLIENT_ID));
        };
        let Value::String(client_id) = client_id else {
            return Err(schema("clientId must be a string"));
        };
        if client_id != expected_client_id {
            return Err(ValidationError::ClientIdMismatch);
        }
        let Value::String(kind) = kind else {
            return Err(schema("type must be a string"));
        };

        let payload = envelope.remove(FIELD_PAYLOAD).unwrap_or(Value::Null);
        if let Some(extra) = envelope.keys().next() {
            return Err(schema(format!("unknown field: {extra}")));
        }

        let body = match kind.as_str() {
            "draw" => {
                let draw: DrawPayload = parse_payload(payload)?;
                self.check_draw(&draw)?;
                Body::Draw(draw)
            }
            "text" => {
                let text: TextPayload = parse_payload(payload)?;
                check_text(&text)?;
                Body::Text(text)
            }
            "clear" => {
                check_empty(&payload)?;
                Body::Clear
            }
            "cursor" => Body::Cursor(parse_payload::<CursorPayload>(payload)?),
            "user_count" | "board_state" | "error" => {
                return Err(schema(format!("message type '{kind}' is server-only")));
            }
            other => return Err(schema(format!("unknown message type: {other}"))),
        };

        Ok(Message { client_id, body })
    }

    fn check_draw(&self, draw: &DrawPayload) -> Result<(), ValidationError> {
        check_color(&draw.color)?;
        if !(MIN_BRUSH_SIZE..=MAX_BRUSH_SIZE).contains(&draw.size) {
            return Err(schema(format!(
                "size {} out of range [{MIN_BRUSH_SIZE}, {MAX_BRUSH_SIZE}]",
                draw.size
            )));
        }
        if draw.points.is_empty() {
            return Err(schema("stroke must contain at least one point"));
        }
        if draw.points.len() > self.max_stroke_points {
            return Err(schema(format!("too many points in stroke (max: {})", self.max_stroke_points)));
        }
        let in_range = |v: f64| v.is_finite() && (-COORDINATE_LIMIT..=COORDINATE_LIMIT).contains(&v);
        if let Some(point) = draw.points.iter().find(|p| !in_range(p.x) || !in_range(p.y)) {
            return Err(schema(format!("coordinate out of range: ({}, {})", point.x, point.y)));
        }
        Ok(())
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn parse_payload<T: DeserializeOwned>(payload: Value) -> Result<T, ValidationError> {
    if payload.is_null() {
        return Err(ValidationError::SchemaViolation("payload required".into()));
    }
    serde_json::from_value(payload).map_err(|e| schema(e.to_string()))
}

fn check_text(text: &TextPayload) -> Result<(), ValidationError> {
    check_color(&text.color)?;
    if text.content.chars().count() > MAX_TEXT_CHARS {
        return Err(schema(format!("text content exceeds {MAX_TEXT_CHARS} characters")));
    }
    if text.font.chars().count() > MAX_FONT_CHARS {
        return Err(schema(format!("font exceeds {MAX_FONT_CHARS} characters")));
    }
    Ok(())
}

/// `clear` carries nothing; accept an absent, null, or empty payload.
fn check_empty(payload: &Value) -> Result<(), ValidationError> {
    match payload {
        Value::Null => Ok(()),
        Value::Object(map) if map.is_empty() => Ok(()),
        _ => Err(schema("clear takes no payload")),
    }
}

fn check_color(color: &str) -> Result<(), ValidationError> {
    if is_hex_color(color) {
        Ok(())
    } else {
        Err(schema(format!("color must match #RRGGBB: {color}")))
    }
}

/// `#` followed by exactly six hex digits.
#[must_use]
pub fn is_hex_color(color: &str) -> bool {
    let Some(digits) = color.strip_prefix('#') else {
        return false;
    };
    digits.len() == 6 && digits.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
#[path = "validate_test.rs"]
mod tests;
