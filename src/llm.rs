//! Language-model service client.
//!
//! Defines the [`LanguageModel`] seam the conversation manager generates
//! through, and the [`OpenAiChat`] client for the OpenAI chat-completions
//! API. One request per call; quota, timeout, and malformed-response
//! failures surface as [`EngineError::Upstream`] unretried.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::ChatConfig;
use crate::error::EngineError;

/// One message in a chat-completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Token accounting reported by the service, when available.
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// A completed generation.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: Option<Usage>,
}

/// Seam to the external language-model service.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, EngineError>;
}

/// Chat-completions client for the OpenAI API.
///
/// Calls `POST /v1/chat/completions` with the configured model,
/// temperature, and response-token limit. Requires the `OPENAI_API_KEY`
/// environment variable to be set.
pub struct OpenAiChat {
    config: ChatConfig,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiChat {
    pub fn new(config: &ChatConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config: config.clone(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, EngineError> {
        let url = self
            .config
            .url
            .as_deref()
            .unwrap_or("https://api.openai.com/v1/chat/completions");

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_response_tokens,
        });

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(EngineError::Upstream(format!(
                "API error {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EngineError::Upstream(e.to_string()))?;
        parse_completion(&json)
    }
}

/// Parse a chat-completions response: `choices[0].message.content` plus
/// optional token usage.
fn parse_completion(json: &serde_json::Value) -> Result<Completion, EngineError> {
    let text = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .ok_or_else(|| {
            EngineError::Upstream("malformed response: missing choices[0].message.content".to_string())
        })?
        .to_string();

    let usage = json.get("usage").map(|u| Usage {
        prompt_tokens: u
            .get("prompt_tokens")
            .and_then(|v| v.as_u64())
            .unwrap_or(0),
        completion_tokens: u
            .get("completion_tokens")
            .and_then(|v| v.as_u64())
            .unwrap_or(0),
    });

    Ok(Completion { text, usage })
}
