//! Generic OpenAI-compatible provider.
//! LiteLLM proxies (and most hosted LLM APIs) follow the `/v1/chat/completions`
//! format, so a single implementation serves all of them.

use crate::providers::traits::{ChatOptions, ChatResponse, Provider, TokenUsage};
use crate::sessions::{Message, Role};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// System prompt injected when a conversation arrives without one.
pub const VOICE_SYSTEM_PROMPT: &str = "You are a helpful AI assistant integrated with Google Assistant. \
Provide concise, clear responses optimized for voice output. \
Keep responses under 3 sentences when possible. \
Avoid markdown formatting, code blocks, and long URLs. \
Be conversational and friendly.";

/// A provider that speaks the OpenAI-compatible chat completions API.
pub struct OpenAiCompatibleProvider {
    pub(crate) name: String,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
    model: String,
    defaults: ChatOptions,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(name: &str, base_url: &str, api_key: Option<&str>, model: &str) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(ToString::to_string),
            model: model.to_string(),
            defaults: ChatOptions::default(),
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Override the generation settings reported by [`Provider::default_options`].
    pub fn with_defaults(mut self, max_tokens: u32, temperature: f64) -> Self {
        self.defaults = ChatOptions {
            model: None,
            max_tokens,
            temperature,
        };
        self
    }

    /// Build the full URL for chat completions, detecting if base_url already includes the path.
    fn chat_completions_url(&self) -> String {
        let has_full_endpoint = reqwest::Url::parse(&self.base_url)
            .map(|url| {
                url.path()
                    .trim_end_matches('/')
                    .ends_with("/chat/completions")
            })
            .unwrap_or_else(|_| {
                self.base_url
                    .trim_end_matches('/')
                    .ends_with("/chat/completions")
            });

        if has_full_endpoint {
            self.base_url.clone()
        } else {
            format!("{}/chat/completions", self.base_url)
        }
    }

    /// Keyless proxies get no `Authorization` header at all.
    fn apply_auth_header(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key.as_deref() {
            Some(api_key) => req.bearer_auth(api_key),
            None => req,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ApiMessage>,
    max_tokens: u32,
    temperature: f64,
    stream: bool,
}

#[derive(Debug, Serialize, PartialEq)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

/// Convert a conversation to wire messages, prepending the voice system
/// prompt unless the conversation already opens with a system message.
fn with_voice_system_prompt(messages: &[Message]) -> Vec<ApiMessage> {
    let has_system = messages.first().is_some_and(|m| m.role == Role::System);
    let mut api_messages = Vec::with_capacity(messages.len() + 1);
    if !has_system {
        api_messages.push(ApiMessage {
            role: Role::System.as_str(),
            content: VOICE_SYSTEM_PROMPT.to_string(),
        });
    }
    api_messages.extend(messages.iter().map(|m| ApiMessage {
        role: m.role.as_str(),
        content: m.content.clone(),
    }));
    api_messages
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    async fn chat(&self, messages: &[Message], options: &ChatOptions) -> anyhow::Result<ChatResponse> {
        let request = ChatRequest {
            model: options.model.clone().unwrap_or_else(|| self.model.clone()),
            messages: with_voice_system_prompt(messages),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            stream: false,
        };

        let url = self.chat_completions_url();
        let response = self
            .apply_auth_header(self.client.post(&url).json(&request))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(super::api_error(&self.name, response).await);
        }

        let chat_response: ApiChatResponse = response.json().await?;
        let usage = chat_response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        let text = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| anyhow::anyhow!("No response from {}", self.name))?;

        tracing::info!(
            provider = %self.name,
            model = %request.model,
            tokens = usage.map_or(0, |u| u.total_tokens),
            "Chat completion successful"
        );

        Ok(ChatResponse { text, usage })
    }

    async fn health_check(&self) -> bool {
        let options = ChatOptions {
            model: None,
            max_tokens: 5,
            temperature: 0.0,
        };
        match self.chat(&[Message::user("test")], &options).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(provider = %self.name, "Health check failed: {e}");
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
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};

    fn make_provider(name: &str, url: &str, key: Option<&str>) -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::new(name, url, key, "test-model")
    }

    /// Serve `handler` on an ephemeral local port and return its base URL.
    async fn spawn_mock(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    #[test]
    fn creates_with_key() {
        let p = make_provider("litellm", "http://localhost:4000/v1", Some("sk-proxy"));
        assert_eq!(p.name, "litellm");
        assert_eq!(p.base_url, "http://localhost:4000/v1");
        assert_eq!(p.api_key.as_deref(), Some("sk-proxy"));
    }

    #[test]
    fn blank_key_is_treated_as_absent() {
        let p = make_provider("litellm", "http://localhost:4000/v1", Some("   "));
        assert!(p.api_key.is_none());
    }

    #[test]
    fn with_defaults_overrides_options() {
        let p = make_provider("litellm", "http://localhost:4000/v1", None).with_defaults(64, 0.2);
        let opts = p.default_options();
        assert_eq!(opts.max_tokens, 64);
        assert!((opts.temperature - 0.2).abs() < f64::EPSILON);
        assert!(opts.model.is_none());
    }

    #[test]
    fn strips_trailing_slash() {
        let p = make_provider("test", "https://example.com/", None);
        assert_eq!(p.base_url, "https://example.com");
    }

    #[test]
    fn chat_completions_url_base_with_v1() {
        let p = make_provider("test", "http://localhost:4000/v1", None);
        assert_eq!(
            p.chat_completions_url(),
            "http://localhost:4000/v1/chat/completions"
        );
    }

    #[test]
    fn chat_completions_url_custom_full_endpoint() {
        let p = make_provider(
            "custom",
            "https://my-api.example.com/api/v2/chat/completions",
            None,
        );
        assert_eq!(
            p.chat_completions_url(),
            "https://my-api.example.com/api/v2/chat/completions"
        );
    }

    #[test]
    fn system_prompt_added_when_missing() {
        let api = with_voice_system_prompt(&[Message::user("hi")]);
        assert_eq!(api.len(), 2);
        assert_eq!(api[0].role, "system");
        assert_eq!(api[0].content, VOICE_SYSTEM_PROMPT);
        assert_eq!(api[1], ApiMessage { role: "user", content: "hi".into() });
    }

    #[test]
    fn existing_system_prompt_is_kept() {
        let api = with_voice_system_prompt(&[Message::system("custom"), Message::user("hi")]);
        assert_eq!(api.len(), 2);
        assert_eq!(api[0].content, "custom");
    }

    #[test]
    fn empty_conversation_still_gets_system_prompt() {
        let api = with_voice_system_prompt(&[]);
        assert_eq!(api.len(), 1);
        assert_eq!(api[0].role, "system");
    }

    #[test]
    fn request_serializes_expected_fields() {
        let req = ChatRequest {
            model: "granite".into(),
            messages: with_voice_system_prompt(&[Message::user("hello")]),
            max_tokens: 150,
            temperature: 0.7,
            stream: false,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "granite");
        assert_eq!(json["max_tokens"], 150);
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][1]["role"], "user");
    }

    #[test]
    fn response_deserializes_with_usage() {
        let json = r#"{"choices":[{"message":{"content":"Hi there"}}],"usage":{"prompt_tokens":12,"completion_tokens":3,"total_tokens":15}}"#;
        let resp: ApiChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.choices[0].message.content.as_deref(), Some("Hi there"));
        assert_eq!(resp.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn response_with_null_content() {
        let json = r#"{"choices":[{"message":{"content":null}}]}"#;
        let resp: ApiChatResponse = serde_json::from_str(json).unwrap();
        assert!(resp.choices[0].message.content.is_none());
        assert!(resp.usage.is_none());
    }

    #[tokio::test]
    async fn chat_returns_first_choice_and_usage() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|Json(body): Json<serde_json::Value>| async move {
                let last = body["messages"].as_array().unwrap().last().unwrap()["content"].clone();
                Json(serde_json::json!({
                    "choices": [{"message": {"content": format!("echo: {}", last.as_str().unwrap())}}],
                    "usage": {"prompt_tokens": 4, "completion_tokens": 2, "total_tokens": 6}
                }))
            }),
        );
        let base = spawn_mock(router).await;
        let p = make_provider("litellm", &base, Some("sk-local"));

        let resp = p
            .chat(&[Message::user("ping")], &ChatOptions::default())
            .await
            .unwrap();
        assert_eq!(resp.text, "echo: ping");
        assert_eq!(resp.usage.unwrap().total_tokens, 6);
        assert!(p.health_check().await);
    }

    #[tokio::test]
    async fn chat_sends_bearer_only_when_key_is_set() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|headers: axum::http::HeaderMap| async move {
                let auth = headers
                    .get(axum::http::header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("none")
                    .to_string();
                Json(serde_json::json!({"choices": [{"message": {"content": auth}}]}))
            }),
        );
        let base = spawn_mock(router).await;

        let keyed = make_provider("litellm", &base, Some("sk-local"));
        let resp = keyed
            .chat(&[Message::user("hi")], &ChatOptions::default())
            .await
            .unwrap();
        assert_eq!(resp.text, "Bearer sk-local");

        let keyless = make_provider("litellm", &base, None);
        let resp = keyless
            .chat(&[Message::user("hi")], &ChatOptions::default())
            .await
            .unwrap();
        assert_eq!(resp.text, "none");
    }

    #[tokio::test]
    async fn chat_surfaces_sanitized_api_error() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                (
                    axum::http::StatusCode::UNAUTHORIZED,
                    "invalid key sk-leakedsecret123",
                )
            }),
        );
        let base = spawn_mock(router).await;
        let p = make_provider("litellm", &base, Some("sk-bad"));

        let err = p
            .chat(&[Message::user("hi")], &ChatOptions::default())
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("litellm API error (401"));
        assert!(!err.contains("sk-leakedsecret123"));
        assert!(!p.health_check().await);
    }

    #[tokio::test]
    async fn chat_errors_on_empty_choices() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(serde_json::json!({"choices": []})) }),
        );
        let base = spawn_mock(router).await;
        let p = make_provider("litellm", &base, None);

        let err = p
            .chat(&[Message::user("hi")], &ChatOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No response from litellm"));
    }

    #[tokio::test]
    async fn health_check_false_when_unreachable() {
        let p = make_provider("litellm", "http://127.0.0.1:9/v1", None);
        assert!(!p.health_check().await);
    }
}
