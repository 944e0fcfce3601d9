//! Anthropic Claude provider implementation

use super::types::*;
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Anthropic model variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnthropicModel {
    Claude45Sonnet,
    Claude45Haiku,
}

impl AnthropicModel {
    /// All models the registry should attempt to construct
    pub const ALL: &'static [AnthropicModel] =
        &[AnthropicModel::Claude45Sonnet, AnthropicModel::Claude45Haiku];

    pub fn api_name(&self) -> &'static str {
        match self {
            AnthropicModel::Claude45Sonnet => "claude-sonnet-4-5",
            AnthropicModel::Claude45Haiku => "claude-haiku-4-5",
        }
    }

    pub fn model_id(&self) -> &'static str {
        match self {
            AnthropicModel::Claude45Sonnet => "claude-4.5-sonnet",
            AnthropicModel::Claude45Haiku => "claude-4.5-haiku",
        }
    }
}

/// Anthropic service implementation
pub struct AnthropicService {
    client: Client,
    api_key: String,
    model: AnthropicModel,
    base_url: String,
}

impl AnthropicService {
    pub fn new(api_key: String, model: AnthropicModel, gateway: Option<&str>) -> Result<Self, LlmError> {
        let base_url = match gateway {
            Some(gw) => format!("{}/anthropic/v1/messages", gw.trim_end_matches('/')),
            None => "https://api.anthropic.com/v1/messages".to_string(),
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url,
        })
    }

    fn translate_request(&self, request: &LlmRequest) -> AnthropicRequest {
        let messages: Vec<AnthropicMessage> = request
            .messages
            .iter()
            .map(|m| AnthropicMessage {
                role: match m.role {
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                },
                content: m.text.clone(),
            })
            .collect();

        AnthropicRequest {
            model: self.model.api_name().to_string(),
            max_tokens: request.max_tokens.unwrap_or(2048),
            system: request.system.clone(),
            messages,
        }
    }

    fn normalize_response(&self, resp: AnthropicResponse) -> LlmResponse {
        let text: String = resp
            .content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicContentBlock::Text { text } => Some(text),
            })
            .collect::<Vec<_>>()
            .join("");

        LlmResponse {
            text,
            usage: Usage {
                input_tokens: resp.usage.input_tokens,
                output_tokens: resp.usage.output_tokens,
            },
        }
    }

    fn classify_error(&self, status: reqwest::StatusCode, body: &str) -> LlmError {
        match status.as_u16() {
            401 | 403 => LlmError::auth(format!("Authentication failed: {body}")),
            429 => {
                let mut err = LlmError::rate_limit(format!("Rate limited: {body}"));
                // Honor retry_after when the error body carries one
                if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(body) {
                    if let Some(retry_after) = parsed
                        .get("error")
                        .and_then(|e| e.get("retry_after"))
                        .and_then(|r| r.as_f64())
                    {
                        err = err.with_retry_after(Duration::from_secs_f64(retry_after));
                    }
                }
                err
            }
            400 => LlmError::invalid_request(format!("Invalid request: {body}")),
            500..=599 => LlmError::server_error(format!("Server error: {body}")),
            _ => LlmError::unknown(format!("HTTP {status}: {body}")),
        }
    }
}

#[async_trait]
impl LlmService for AnthropicService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let anthropic_request = self.translate_request(request);

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&anthropic_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::timeout(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(self.classify_error(status, &body));
        }

        let anthropic_response: AnthropicResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::unknown(format!("Failed to parse response: {e} - body: {body}")))?;

        Ok(self.normalize_response(anthropic_response))
    }

    fn model_id(&self) -> &str {
        self.model.model_id()
    }
}

// Anthropic API types

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text { text: String },
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}
