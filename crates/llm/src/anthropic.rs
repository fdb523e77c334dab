//! Anthropic messages API backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::backend::AnalysisBackend;
use crate::config::ENV_ANTHROPIC_API_KEY;
use crate::error::{BackendError, BackendResult};

/// Anthropic API endpoint
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Anthropic API version
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default model
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorResponse {
    error: AnthropicError,
}

/// Anthropic Claude backend.
pub struct AnthropicBackend {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl AnthropicBackend {
    /// Create a new Anthropic backend.
    ///
    /// An empty `model` falls back to the default model.
    pub fn new(
        api_key: Option<String>,
        model: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> BackendResult<Self> {
        let api_key = api_key
            .filter(|k| !k.is_empty())
            .ok_or(BackendError::MissingCredential {
                provider: "anthropic",
                env_var: ENV_ANTHROPIC_API_KEY,
            })?;
        let model = if model.is_empty() { DEFAULT_MODEL } else { model };

        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
            base_url: ANTHROPIC_API_URL.to_string(),
            model: model.to_string(),
            temperature,
            max_tokens,
        })
    }

    /// Set a custom base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl AnalysisBackend for AnthropicBackend {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn analyze(&self, prompt: &str) -> BackendResult<String> {
        let request = AnthropicRequest {
            model: &self.model,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "Calling Claude API");

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AnthropicErrorResponse>(&body).map_or(body, |e| {
                format!("{} - {}", e.error.error_type, e.error.message)
            });
            return Err(BackendError::Api {
                provider: "anthropic",
                status: status.as_u16(),
                message,
            });
        }

        let response: AnthropicResponse = response.json().await?;

        // Only text blocks carry narrative; concatenate them in order.
        let text: String = response
            .content
            .into_iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text)
            .collect();

        if text.is_empty() {
            return Err(BackendError::EmptyResponse("anthropic"));
        }
        Ok(text)
    }
}
