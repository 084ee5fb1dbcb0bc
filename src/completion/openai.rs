//! OpenAI-compatible chat completions client.
//!
//! Posts to `{api_url}/chat/completions` with the persona instruction as the
//! leading system message. Works against local servers that speak the same
//! format; the bearer header is only sent when an API key is configured.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, CompletionError, CompletionProvider, CompletionRequest};
use crate::config::CompletionConfig;

#[derive(Clone)]
pub struct OpenAiCompletion {
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl OpenAiCompletion {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            tracing::warn!(api_url = %config.api_url, "no completion API key configured");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            client,
        })
    }

    fn body<'a>(&'a self, request: &CompletionRequest) -> ChatCompletionBody<'a> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(ChatMessage::system(request.system.clone()));
        messages.extend(request.messages.iter().cloned());

        ChatCompletionBody {
            model: &self.model,
            messages,
            temperature: request.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.api_url);

        let mut req = self.client.post(&url).json(&self.body(request));
        if !self.api_key.is_empty() {
            req = req.bearer_auth(&self.api_key);
        }

        tracing::debug!(model = %self.model, messages = request.messages.len(), "requesting completion");
        let response = req.send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(status_error(status.as_u16(), &body));
        }

        parse_completion(&body)
    }
}

/// Build a status error, preferring the provider's own `error.message`.
fn status_error(status: u16, body: &str) -> CompletionError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| {
            if body.is_empty() {
                "Failed to get AI response".to_string()
            } else {
                body.chars().take(500).collect()
            }
        });
    CompletionError::Status { status, message }
}

/// Extract the first choice's content from a chat completions response body.
fn parse_completion(body: &str) -> Result<String, CompletionError> {
    let completion: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| CompletionError::Malformed(e.to_string()))?;

    completion
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or(CompletionError::Empty)
}
