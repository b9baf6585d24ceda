use std::sync::Arc;
use std::time::Instant;

use super::request::{validate_request, WebhookRequest};
use super::response::{format_response, FulfillmentResponse};
use super::voice::optimize_for_voice;
use crate::config::VoiceConfig;
use crate::observability::{Metrics, RequestStatus};
use crate::providers::Provider;
use crate::sessions::{ConversationStore, Message};
use crate::util::sanitize_session_id;

pub const WELCOME_TEXT: &str = "Hi! I'm your personal AI assistant powered by Granite. \
I can help you with questions, information, and conversations. \
What would you like to know?";

pub const FALLBACK_TEXT: &str = "I didn't quite catch that. Could you rephrase your question? \
I'm here to help with information and answer your questions.";

pub const AI_UNAVAILABLE_TEXT: &str =
    "I'm having trouble connecting to my AI brain right now. Please try again in a moment.";

/// How a request is answered, decided from the intent display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Welcome,
    Fallback,
    AskAi,
    /// Any other intent; answered by the model like `AskAi`.
    Other(String),
}

impl Intent {
    pub fn from_display_name(name: &str) -> Self {
        match name {
            "Default Welcome Intent" => Self::Welcome,
            "Default Fallback Intent" => Self::Fallback,
            "Ask AI" => Self::AskAi,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Answers webhook requests using the session store and an LLM backend.
pub struct FulfillmentService {
    store: Arc<dyn ConversationStore>,
    provider: Arc<dyn Provider>,
    voice: VoiceConfig,
    metrics: Option<Arc<Metrics>>,
}

impl FulfillmentService {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        provider: Arc<dyn Provider>,
        voice: VoiceConfig,
    ) -> Self {
        Self {
            store,
            provider,
            voice,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Route one request by intent and build the spoken reply.
    pub async fn handle(&self, request: &WebhookRequest) -> FulfillmentResponse {
        if let Err(e) = validate_request(request) {
            tracing::warn!("{e}");
        }

        let intent = request.intent_name();
        tracing::info!(
            intent = request.intent_label(),
            session = %sanitize_session_id(request.session_id()),
            "Processing webhook request"
        );

        let text = match Intent::from_display_name(intent) {
            Intent::Welcome => WELCOME_TEXT.to_string(),
            Intent::Fallback => FALLBACK_TEXT.to_string(),
            Intent::AskAi | Intent::Other(_) => {
                self.ask_ai(request.query_text(), request.session_id()).await
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_request(request.intent_label(), RequestStatus::Success);
        }
        format_response(&text)
    }

    /// Run one conversational turn against the backend.
    ///
    /// History is only written back when the backend answers; a failed turn
    /// leaves the session untouched and yields [`AI_UNAVAILABLE_TEXT`].
    pub async fn ask_ai(&self, query_text: &str, session_id: &str) -> String {
        let mut history = self.store.get_history(session_id);
        history.push(Message::user(query_text));

        let options = self.provider.default_options();
        let started = Instant::now();
        let result = self.provider.chat(&history, &options).await;
        if let Some(metrics) = &self.metrics {
            metrics.observe_ai_response(started.elapsed().as_secs_f64());
        }

        match result {
            Ok(reply) => {
                if let Some(usage) = reply.usage {
                    tracing::debug!(
                        provider = self.provider.name(),
                        prompt_tokens = usage.prompt_tokens,
                        completion_tokens = usage.completion_tokens,
                        total_tokens = usage.total_tokens,
                        "Backend token usage"
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics.record_token_usage(&usage);
                    }
                }
                let text = optimize_for_voice(&reply.text, &self.voice);
                history.push(Message::assistant(text.clone()));
                self.store.update_history(session_id, history);
                text
            }
            Err(e) => {
                tracing::error!(
                    provider = self.provider.name(),
                    session = %sanitize_session_id(session_id),
                    "Error getting AI response: {e}"
                );
                AI_UNAVAILABLE_TEXT.to_string()
            }
        }
    }
}
