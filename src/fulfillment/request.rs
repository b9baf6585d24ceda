//! Dialogflow webhook payload types and field extraction.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Session id used when the platform omits one.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Incoming fulfillment request. Every field is optional on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    #[serde(default)]
    pub response_id: Option<String>,
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub query_result: Option<QueryResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default)]
    pub query_text: Option<String>,
    #[serde(default)]
    pub intent: Option<IntentInfo>,
    #[serde(default)]
    pub parameters: serde_json::Value,
    #[serde(default)]
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentInfo {
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Structural problems with a webhook payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

impl WebhookRequest {
    fn intent_display_name(&self) -> Option<&str> {
        self.query_result
            .as_ref()?
            .intent
            .as_ref()?
            .display_name
            .as_deref()
    }

    /// Intent display name for routing; empty when absent.
    pub fn intent_name(&self) -> &str {
        self.intent_display_name().unwrap_or("")
    }

    /// Intent display name for logs and metric labels; `"unknown"` when absent.
    pub fn intent_label(&self) -> &str {
        self.intent_display_name().unwrap_or("unknown")
    }

    /// The user's utterance; empty when absent.
    pub fn query_text(&self) -> &str {
        self.query_result
            .as_ref()
            .and_then(|q| q.query_text.as_deref())
            .unwrap_or("")
    }

    /// Conversation key; [`DEFAULT_SESSION_ID`] when absent.
    pub fn session_id(&self) -> &str {
        self.session.as_deref().unwrap_or(DEFAULT_SESSION_ID)
    }
}

/// Check that the payload carries the fields a Dialogflow request always has.
pub fn validate_request(request: &WebhookRequest) -> Result<(), RequestError> {
    if request.session.is_none() {
        return Err(RequestError::MissingField("session"));
    }
    if request.query_result.is_none() {
        return Err(RequestError::MissingField("queryResult"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> WebhookRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parses_full_dialogflow_payload() {
        let req = parse(json!({
            "responseId": "abc-123",
            "session": "projects/p/agent/sessions/s1",
            "queryResult": {
                "queryText": "what is rust",
                "parameters": {"topic": "rust"},
                "intent": {"name": "projects/p/agent/intents/1", "displayName": "Ask AI"},
                "languageCode": "en"
            },
            "originalDetectIntentRequest": {"source": "google"}
        }));
        assert_eq!(req.intent_name(), "Ask AI");
        assert_eq!(req.query_text(), "what is rust");
        assert_eq!(req.session_id(), "projects/p/agent/sessions/s1");
        assert_eq!(req.query_result.unwrap().parameters["topic"], "rust");
    }

    #[test]
    fn empty_object_uses_defaults() {
        let req = parse(json!({}));
        assert_eq!(req.intent_name(), "");
        assert_eq!(req.intent_label(), "unknown");
        assert_eq!(req.query_text(), "");
        assert_eq!(req.session_id(), DEFAULT_SESSION_ID);
    }

    #[test]
    fn intent_without_display_name() {
        let req = parse(json!({"queryResult": {"intent": {}}}));
        assert_eq!(req.intent_label(), "unknown");
    }

    #[test]
    fn validate_requires_session_then_query_result() {
        assert_eq!(
            validate_request(&parse(json!({}))),
            Err(RequestError::MissingField("session"))
        );
        assert_eq!(
            validate_request(&parse(json!({"session": "s"}))),
            Err(RequestError::MissingField("queryResult"))
        );
        assert!(validate_request(&parse(json!({"session": "s", "queryResult": {}}))).is_ok());
    }

    #[test]
    fn request_error_message_names_field() {
        assert_eq!(
            RequestError::MissingField("queryResult").to_string(),
            "Missing required field: queryResult"
        );
    }

    #[test]
    fn non_object_payload_is_rejected() {
        assert!(serde_json::from_value::<WebhookRequest>(json!([1, 2])).is_err());
    }
}
