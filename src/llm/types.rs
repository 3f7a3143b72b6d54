//! LLM types — vision request shape, errors, and the client trait.

use crate::message::ErrorCode;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by LLM client operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The required API key environment variable is not set.
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },

    /// The HTTP request to the LLM provider failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The LLM provider returned a non-success HTTP status.
    #[error("API response error: status {status}")]
    ApiResponse { status: u16, body: String },

    /// The LLM provider response body could not be deserialized.
    #[error("API response parse failed: {0}")]
    ApiParse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ErrorCode for LlmError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigParse(_) => "E_CONFIG_PARSE",
            Self::MissingApiKey { .. } => "E_MISSING_API_KEY",
            Self::ApiRequest(_) => "E_API_REQUEST",
            Self::ApiResponse { .. } => "E_API_RESPONSE",
            Self::ApiParse(_) => "E_API_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::ApiRequest(_) | Self::ApiResponse { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// REQUEST
// =============================================================================

/// One image-understanding call: a system instruction, a user prompt, and
/// the image as a `data:image/...` URL.
#[derive(Debug, Clone, Copy)]
pub struct VisionRequest<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
    pub image_data_url: &'a str,
}

// =============================================================================
// LLM VISION TRAIT
// =============================================================================

/// Provider-neutral async trait for image interpretation. Enables mocking in
/// tests.
#[async_trait::async_trait]
pub trait LlmVision: Send + Sync {
    /// Ask the model to describe an image. `Ok(None)` means the provider
    /// answered but produced no text.
    ///
    /// # Errors
    ///
    /// Returns an [`LlmError`] if the request fails or the response is malformed.
    async fn describe(&self, request: VisionRequest<'_>) -> Result<Option<String>, LlmError>;

    /// Cheap connectivity probe.
    ///
    /// # Errors
    ///
    /// Returns an [`LlmError`] if the provider cannot be reached.
    async fn ping(&self) -> Result<(), LlmError>;

    /// Model name, for logs and the info endpoint.
    fn model(&self) -> &str;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
