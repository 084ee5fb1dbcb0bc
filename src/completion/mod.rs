//! AI completion boundary.
//!
//! Provides the [`CompletionProvider`] trait and an OpenAI-compatible HTTP
//! implementation. The provider is created via [`create_provider`] from
//! configuration.

pub mod openai;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role tag on a completion message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One completion call: the persona instruction plus the ordered conversation.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion provider returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed completion payload: {0}")]
    Malformed(String),
    #[error("completion provider returned no choices")]
    Empty,
}

/// Trait for requesting a completion from a language model.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Return the completion text for `request`.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

/// Create a completion provider from config.
///
/// Currently only `"openai"` (any OpenAI-compatible chat completions endpoint) is supported.
pub fn create_provider(
    config: &crate::config::CompletionConfig,
) -> Result<Box<dyn CompletionProvider>> {
    match config.provider.as_str() {
        "openai" => {
            let provider = openai::OpenAiCompletion::new(config)?;
            Ok(Box::new(provider))
        }
        other => anyhow::bail!("unknown completion provider: {other}. Supported: openai"),
    }
}
