//! LLM — vision adapter used by the drawing interpretation endpoint.
//!
//! DESIGN
//! ======
//! Configured from environment variables. `LlmClient` wraps the OpenAI
//! chat-completions client and implements [`LlmVision`] so the service layer
//! can be exercised against a mock.

pub mod config;
pub mod openai;
pub mod types;

use config::LlmConfig;
pub use types::{LlmError, LlmVision, VisionRequest};

/// Concrete LLM client backed by an OpenAI-compatible API.
///
/// Configured from environment variables by [`LlmClient::from_env`].
pub struct LlmClient {
    inner: openai::OpenAiClient,
    model: String,
    max_tokens: u32,
}

impl LlmClient {
    /// Build an LLM client from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the HTTP client fails.
    pub fn from_env() -> Result<Self, LlmError> {
        let config = LlmConfig::from_env()?;
        Self::from_config(config)
    }

    /// Build an LLM client from a parsed typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: LlmConfig) -> Result<Self, LlmError> {
        let inner = openai::OpenAiClient::new(config.api_key, &config.base_url, config.timeouts)?;
        Ok(Self { inner, model: config.model, max_tokens: config.max_tokens })
    }
}

#[async_trait::async_trait]
impl LlmVision for LlmClient {
    async fn describe(&self, request: VisionRequest<'_>) -> Result<Option<String>, LlmError> {
        self.inner.describe(&self.model, self.max_tokens, request).await
    }

    async fn ping(&self) -> Result<(), LlmError> {
        self.inner.list_models().await
    }

    fn model(&self) -> &str {
        &self.model
    }
}
