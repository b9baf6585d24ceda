//! Google Gemini provider.
//!
//! The conversation is flattened into a single labelled prompt and sent to the
//! `generateContent` endpoint. Without an API key the provider stays
//! constructible but disabled: chat fails, health reports `false`, and model
//! listing is empty.

use crate::providers::traits::{ChatOptions, ChatResponse, Provider, TokenUsage};
use crate::sessions::{Message, Role};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Returned when Gemini answers without any usable text.
pub const NO_RESPONSE_TEXT: &str = "I'm sorry, I couldn't generate a response.";

const HEALTH_PROMPT: &str = "Say 'OK' if you can hear me.";

pub struct GeminiProvider {
    api_key: Option<String>,
    model: String,
    base_url: String,
    defaults: ChatOptions,
    client: Client,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u64,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u64,
    #[serde(rename = "totalTokenCount", default)]
    total_token_count: u64,
}

#[derive(Debug, Deserialize)]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
    #[serde(rename = "supportedGenerationMethods", default)]
    supported_generation_methods: Vec<String>,
}

/// Flatten a conversation into the labelled prompt Gemini receives.
pub fn format_messages(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|msg| {
            let label = match msg.role {
                Role::System => "Instructions",
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            format!("{label}: {}", msg.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Concatenate the text parts of the first candidate, if there are any.
fn extract_text(response: GenerateContentResponse) -> Option<String> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        tracing::warn!("No candidates in Gemini response");
        return None;
    };

    if candidate.finish_reason.as_deref() == Some("MAX_TOKENS") {
        tracing::warn!("Gemini response truncated - increase max_tokens");
    }

    let Some(content) = candidate.content.filter(|c| !c.parts.is_empty()) else {
        tracing::warn!("No content in Gemini response");
        return None;
    };

    let text: String = content
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .filter(|t| !t.is_empty())
        .collect();

    if text.is_empty() {
        tracing::warn!("No text parts found in Gemini response");
        return None;
    }
    Some(text)
}

impl GeminiProvider {
    pub fn new(api_key: Option<&str>, model: &str, base_url: &str) -> Self {
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(ToString::to_string);

        if api_key.is_some() {
            tracing::info!(model, "Gemini client initialized");
        } else {
            tracing::warn!("No Gemini API key provided - Gemini will be unavailable");
        }

        Self {
            api_key,
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            defaults: ChatOptions {
                model: None,
                max_tokens: 2048,
                temperature: 0.7,
            },
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    pub fn with_defaults(mut self, max_tokens: u32, temperature: f64) -> Self {
        self.defaults = ChatOptions {
            model: None,
            max_tokens,
            temperature,
        };
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    fn model_path(model: &str) -> String {
        if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        }
    }

    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        prompt: String,
        generation_config: GenerationConfig,
    ) -> anyhow::Result<GenerateContentResponse> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config,
        };
        let url = format!(
            "{}/{}:generateContent",
            self.base_url,
            Self::model_path(model)
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .context("Gemini request failed")?;

        if !response.status().is_success() {
            return Err(super::api_error("gemini", response).await);
        }

        response
            .json()
            .await
            .context("Failed to decode Gemini response")
    }

    /// Model names that support `generateContent`. Empty when disabled or on failure.
    pub async fn list_models(&self) -> Vec<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Vec::new();
        };

        let result: anyhow::Result<ListModelsResponse> = async {
            let response = self
                .client
                .get(format!("{}/models", self.base_url))
                .header("x-goog-api-key", api_key)
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(super::api_error("gemini", response).await);
            }
            Ok(response.json().await?)
        }
        .await;

        match result {
            Ok(list) => list
                .models
                .into_iter()
                .filter(|m| {
                    m.supported_generation_methods
                        .iter()
                        .any(|method| method == "generateContent")
                })
                .map(|m| m.name)
                .collect(),
            Err(e) => {
                tracing::error!("Failed to list Gemini models: {e}");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn chat(&self, messages: &[Message], options: &ChatOptions) -> anyhow::Result<ChatResponse> {
        let Some(api_key) = self.api_key.as_deref() else {
            anyhow::bail!("Gemini client not enabled - check API key");
        };

        let model = options.model.as_deref().unwrap_or(&self.model);
        let response = self
            .generate(
                api_key,
                model,
                format_messages(messages),
                GenerationConfig {
                    temperature: Some(options.temperature),
                    max_output_tokens: options.max_tokens,
                },
            )
            .await?;

        let usage = response.usage_metadata.as_ref().map(|u| TokenUsage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        });
        let text = extract_text(response).unwrap_or_else(|| NO_RESPONSE_TEXT.to_string());

        Ok(ChatResponse { text, usage })
    }

    async fn health_check(&self) -> bool {
        let Some(api_key) = self.api_key.as_deref() else {
            return false;
        };

        let probe = self
            .generate(
                api_key,
                &self.model,
                HEALTH_PROMPT.to_string(),
                GenerationConfig {
                    temperature: None,
                    max_output_tokens: 10,
                },
            )
            .await;

        match probe {
            Ok(response) => extract_text(response).is_some(),
            Err(e) => {
                tracing::error!("Gemini health check failed: {e}");
                false
            }
        }
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    fn default_options(&self) -> ChatOptions {
        self.defaults.clone()
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
