//! OpenAI chat-completions client for image interpretation.
//!
//! Sends one system message plus a user message carrying the prompt text and
//! the image as an `image_url` part. Sampling is pinned near-deterministic so
//! repeated calls on the same drawing read the same way.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::config::LlmTimeouts;
use super::types::{LlmError, VisionRequest};

const TEMPERATURE: f32 = 0.0;
const TOP_P: f32 = 0.1;
const IMAGE_DETAIL: &str = "high";

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: String, base_url: &str, timeouts: LlmTimeouts) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, api_key, base_url: base_url.trim_end_matches('/').to_string() })
    }

    /// Run one vision completion and return the first choice's text, if any.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-200 status, or a body that
    /// is not a chat-completions response.
    pub async fn describe(
        &self,
        model: &str,
        max_tokens: u32,
        request: VisionRequest<'_>,
    ) -> Result<Option<String>, LlmError> {
        let messages = build_vision_messages(request);
        let body = CcRequest { model, max_tokens, temperature: TEMPERATURE, top_p: TOP_P, messages: &messages };
        let text = self.send_json("/chat/completions", &body).await?;
        parse_chat_completions_response(&text)
    }

    /// List models as a connectivity and credential check.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the status is not 200.
    pub async fn list_models(&self) -> Result<(), LlmError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;
        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiResponse { status, body });
        }
        Ok(())
    }

    async fn send_json(&self, path: &str, body: &impl Serialize) -> Result<String, LlmError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;
        if status != 200 {
            return Err(LlmError::ApiResponse { status, body: text });
        }
        Ok(text)
    }
}

// =============================================================================
// CHAT COMPLETIONS — wire types
// =============================================================================

#[derive(Serialize)]
struct CcRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    messages: &'a [CcMessage<'a>],
}

#[derive(Serialize)]
struct CcMessage<'a> {
    role: &'static str,
    content: CcContent<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum CcContent<'a> {
    Text(&'a str),
    Parts(Vec<CcPart<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CcPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: CcImageUrl<'a> },
}

#[derive(Serialize)]
struct CcImageUrl<'a> {
    url: &'a str,
    detail: &'static str,
}

#[derive(Deserialize)]
struct CcResponse {
    choices: Vec<CcChoice>,
}

#[derive(Deserialize)]
struct CcChoice {
    message: CcResponseMessage,
}

#[derive(Deserialize)]
struct CcResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

fn build_vision_messages(request: VisionRequest<'_>) -> Vec<CcMessage<'_>> {
    vec![
        CcMessage { role: "system", content: CcContent::Text(request.system) },
        CcMessage {
            role: "user",
            content: CcContent::Parts(vec![
                CcPart::Text { text: request.prompt },
                CcPart::ImageUrl { image_url: CcImageUrl { url: request.image_data_url, detail: IMAGE_DETAIL } },
            ]),
        },
    ]
}

fn parse_chat_completions_response(text: &str) -> Result<Option<String>, LlmError> {
    let value: Value = serde_json::from_str(text).map_err(|e| LlmError::ApiParse(e.to_string()))?;
    let response: CcResponse = serde_json::from_value(value).map_err(|e| LlmError::ApiParse(e.to_string()))?;
    Ok(response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content))
}

#[cfg(test)]
#[path = "openai_test.rs"]
mod tests;
