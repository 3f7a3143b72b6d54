//! AI service — drawing interpretation through the vision model.
//!
//! DESIGN
//! ======
//! The service is optional: with no API key configured the state carries no
//! client, every call reports `Unavailable`, and the rest of the board works
//! unchanged. Failures never propagate past the HTTP handler; each one maps to
//! a short user-facing message.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::llm::{LlmError, LlmVision, VisionRequest};
use crate::message::ErrorCode;

/// Outer bound on one interpretation, including model latency.
pub const INTERPRET_TIMEOUT: Duration = Duration::from_secs(30);
/// Bound on the health probe.
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
/// Shorter answers are treated as truncated.
pub const MIN_INTERPRETATION_CHARS: usize = 10;

const SYSTEM_PROMPT: &str = "You are a precise image analyzer. Only describe what you actually see \
in the image. Do not make assumptions or create content that isn't clearly visible.";

const INTERPRETATION_PROMPT: &str = "You are analyzing a hand-drawn image from a shared digital whiteboard. \
Look at the actual image content and answer only from what is visible.\n\n\
First identify the content: plain text or notes, a list, math, a flowchart of boxes joined by arrows, \
a mind map or hierarchy, a table, a freehand sketch, or nothing legible.\n\n\
Then answer in the matching format:\n\
- text or notes: plain text\n\
- a list: Markdown bullet points\n\
- math: LaTeX\n\
- boxes joined by arrows: a Mermaid flowchart\n\
- a hierarchy or mind map: nested Markdown\n\
- a table: a Markdown table\n\
- a sketch: a short description in words\n\
- empty or unclear: say so\n\n\
Only produce a Mermaid flowchart when boxes and arrows are actually drawn. \
Never invent content that is not clearly visible.";

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("AI service is currently unavailable. Please check configuration.")]
    Unavailable,

    #[error("image_data must be a data:image/... URL")]
    InvalidImage,

    #[error("AI request timed out. Please try again.")]
    Timeout,

    #[error("{}", upstream_message(.0))]
    Upstream(#[from] LlmError),

    #[error("Empty response received from AI")]
    EmptyResponse,

    #[error("AI response too short, possibly incomplete")]
    ResponseTooShort,
}

impl ErrorCode for AiError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Unavailable => "E_AI_UNAVAILABLE",
            Self::InvalidImage => "E_INVALID_IMAGE",
            Self::Timeout => "E_AI_TIMEOUT",
            Self::Upstream(_) => "E_AI_UPSTREAM",
            Self::EmptyResponse => "E_AI_EMPTY_RESPONSE",
            Self::ResponseTooShort => "E_AI_RESPONSE_TOO_SHORT",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::Upstream(e) => e.retryable(),
            _ => false,
        }
    }
}

fn upstream_message(err: &LlmError) -> String {
    match err {
        LlmError::ApiResponse { status: 401, .. } => "Invalid OpenAI API key. Please check your configuration.".into(),
        LlmError::ApiResponse { status: 429, body } if body.contains("insufficient_quota") => {
            "OpenAI API quota exceeded. Please check your billing settings.".into()
        }
        LlmError::ApiResponse { status: 429, .. } => "OpenAI rate limit exceeded. Please try again later.".into(),
        LlmError::ApiResponse { status: 404, .. } => "Configured OpenAI model is not available.".into(),
        LlmError::ApiResponse { status: 400, body } if body.contains("context_length") => {
            "Image or prompt too large for processing.".into()
        }
        LlmError::ApiResponse { status, .. } => format!("OpenAI API error: status {status}"),
        LlmError::ApiRequest(_) => "Could not reach the OpenAI API.".into(),
        LlmError::ApiParse(_) => "Unreadable response from the OpenAI API.".into(),
        other => format!("OpenAI API error: {other}"),
    }
}

/// True for `data:image/<subtype>[;base64],<data>` with a non-empty body.
#[must_use]
pub fn is_data_url(image_data: &str) -> bool {
    image_data
        .strip_prefix("data:image/")
        .and_then(|rest| rest.split_once(','))
        .is_some_and(|(media, data)| !media.is_empty() && !data.is_empty())
}

/// Interpret a drawing with the default 30 second bound.
///
/// # Errors
///
/// See [`interpret_with_timeout`].
pub async fn interpret(llm: Option<&dyn LlmVision>, image_data: &str) -> Result<String, AiError> {
    interpret_with_timeout(llm, image_data, INTERPRET_TIMEOUT).await
}

/// Interpret a drawing. The returned text is trimmed and at least
/// [`MIN_INTERPRETATION_CHARS`] characters long.
///
/// # Errors
///
/// Returns `Unavailable` without a client, `InvalidImage` for anything but a
/// data URL, `Timeout` past `limit`, `Upstream` for provider failures, and
/// `EmptyResponse`/`ResponseTooShort` for unusable answers.
pub async fn interpret_with_timeout(
    llm: Option<&dyn LlmVision>,
    image_data: &str,
    limit: Duration,
) -> Result<String, AiError> {
    let llm = llm.ok_or(AiError::Unavailable)?;
    if !is_data_url(image_data) {
        return Err(AiError::InvalidImage);
    }

    let format = image_data.split(',').next().unwrap_or_default();
    info!(model = llm.model(), format, size = image_data.len(), "processing ai assist request");

    let request = VisionRequest { system: SYSTEM_PROMPT, prompt: INTERPRETATION_PROMPT, image_data_url: image_data };
    let reply = match tokio::time::timeout(limit, llm.describe(request)).await {
        Ok(reply) => reply,
        Err(_) => {
            warn!(timeout_secs = limit.as_secs_f64(), "ai request timed out");
            return Err(AiError::Timeout);
        }
    };
    let content = reply.map_err(|e| {
        error!(error = %e, "ai upstream request failed");
        AiError::from(e)
    })?;

    let interpretation = content.as_deref().map(str::trim).unwrap_or_default();
    if interpretation.is_empty() {
        return Err(AiError::EmptyResponse);
    }
    if interpretation.chars().count() < MIN_INTERPRETATION_CHARS {
        return Err(AiError::ResponseTooShort);
    }
    info!(chars = interpretation.chars().count(), "ai interpretation completed");
    Ok(interpretation.to_string())
}

/// Probe the provider. `false` when unconfigured, unreachable, or slow.
pub async fn health(llm: Option<&dyn LlmVision>) -> bool {
    health_with_timeout(llm, HEALTH_TIMEOUT).await
}

pub(crate) async fn health_with_timeout(llm: Option<&dyn LlmVision>, limit: Duration) -> bool {
    let Some(llm) = llm else {
        return false;
    };
    match tokio::time::timeout(limit, llm.ping()).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!(error = %e, "ai health check failed");
            false
        }
        Err(_) => {
            error!("ai health check timed out");
            false
        }
    }
}

#[cfg(test)]
#[path = "ai_test.rs"]
mod tests;
