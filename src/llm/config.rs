//! LLM configuration parsed from environment variables.

use super::types::LlmError;
use crate::config::env_parse;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_OPENAI_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_LLM_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_LLM_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Value shipped in the sample `.env`; treated as "not configured".
const PLACEHOLDER_API_KEY: &str = "your_actual_api_key_here";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlmTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub base_url: String,
    pub timeouts: LlmTimeouts,
}

impl LlmConfig {
    /// Build typed LLM config from environment variables.
    ///
    /// Required:
    /// - `OPENAI_API_KEY`
    ///
    /// Optional:
    /// - `OPENAI_MODEL`: default `gpt-4o`
    /// - `OPENAI_MAX_TOKENS`: default 1000
    /// - `OPENAI_BASE_URL`: default OpenAI API base URL
    /// - `LLM_REQUEST_TIMEOUT_SECS`: default 60
    /// - `LLM_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing, empty, or the sample placeholder.
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let api_key = parse_api_key(&api_key)?;

        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_OPENAI_MODEL.to_string());
        let base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let timeouts = LlmTimeouts {
            request_secs: env_parse("LLM_REQUEST_TIMEOUT_SECS", DEFAULT_LLM_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse("LLM_CONNECT_TIMEOUT_SECS", DEFAULT_LLM_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self {
            api_key,
            model,
            max_tokens: env_parse("OPENAI_MAX_TOKENS", DEFAULT_OPENAI_MAX_TOKENS),
            base_url,
            timeouts,
        })
    }
}

fn parse_api_key(raw: &str) -> Result<String, LlmError> {
    let key = raw.trim();
    if key.is_empty() {
        return Err(LlmError::MissingApiKey { var: "OPENAI_API_KEY".into() });
    }
    if key == PLACEHOLDER_API_KEY {
        return Err(LlmError::ConfigParse("OPENAI_API_KEY is still the sample placeholder".into()));
    }
    Ok(key.to_string())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
