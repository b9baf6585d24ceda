//! Backend abstraction shared by every LLM provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::sessions::Message;

/// Per-call generation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOptions {
    /// Model override; `None` uses the provider's configured model.
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: 150,
            temperature: 0.7,
        }
    }
}

/// Token accounting reported by the backend, when available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Generated reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

impl ChatResponse {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// An LLM backend that turns an ordered conversation into a reply.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate a reply for `messages` (oldest first).
    async fn chat(&self, messages: &[Message], options: &ChatOptions) -> anyhow::Result<ChatResponse>;

    /// Cheap liveness probe. Never errors; unreachable backends report `false`.
    async fn health_check(&self) -> bool;

    /// Model used when [`ChatOptions::model`] is unset.
    fn default_model(&self) -> &str;

    /// Generation settings configured for this backend.
    fn default_options(&self) -> ChatOptions {
        ChatOptions::default()
    }

    /// Canonical provider id (e.g. `"litellm"`).
    fn name(&self) -> &str;
}
