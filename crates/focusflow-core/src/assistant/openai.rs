//! OpenAI-compatible `/chat/completions` client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{resolve_api_key, ChatAssistant, FALLBACK_REPLY, SYSTEM_PROMPT};
use crate::error::{GatewayError, Result, ValidationError};
use crate::storage::AssistantConfig;

pub struct OpenAiAssistant {
    client: Client,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    api_key: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ReplyMessage>,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<String>,
}

impl OpenAiAssistant {
    pub fn new(config: &AssistantConfig, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            api_key: api_key.into(),
        }
    }

    /// Build a client using the key found by [`resolve_api_key`].
    pub fn from_config(config: &AssistantConfig) -> Result<Self> {
        let key = resolve_api_key(config)?;
        Ok(Self::new(config, key))
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// Map a non-success response to a gateway error.
fn classify(status: StatusCode, body: &str) -> GatewayError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let code = parsed.as_ref().and_then(|e| e.error.code.as_deref());

    if status == StatusCode::UNAUTHORIZED || code == Some("invalid_api_key") {
        return GatewayError::Unauthorized;
    }
    if status == StatusCode::TOO_MANY_REQUESTS || code == Some("rate_limit_exceeded") {
        return GatewayError::RateLimited;
    }
    let message = match parsed {
        Some(e) if !e.error.message.is_empty() => e.error.message,
        _ => "Failed to get AI response. Please try again.".to_string(),
    };
    GatewayError::Http {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl ChatAssistant for OpenAiAssistant {
    async fn ask(&self, message: &str) -> Result<String> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ValidationError::Empty("message".into()).into());
        }

        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: message,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!(model = %self.model, "sending chat completion request");
        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(GatewayError::from)?;

        let status = resp.status();
        let body = resp.text().await.map_err(GatewayError::from)?;
        if !status.is_success() {
            let err = classify(status, &body);
            warn!(status = status.as_u16(), error = %err, "chat completion failed");
            return Err(err.into());
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))?;
        let reply = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| FALLBACK_REPLY.to_string());
        Ok(reply)
    }
}
