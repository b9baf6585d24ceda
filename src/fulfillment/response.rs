//! Dialogflow fulfillment response envelope.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentResponse {
    pub fulfillment_text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fulfillment_messages: Vec<FulfillmentMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentMessage {
    pub text: TextBlock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: Vec<String>,
}

impl FulfillmentResponse {
    /// Full response: the text both as `fulfillmentText` and as a single text message.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            fulfillment_messages: vec![FulfillmentMessage {
                text: TextBlock {
                    text: vec![text.clone()],
                },
            }],
            fulfillment_text: text,
        }
    }

    /// Bare `{fulfillmentText}` body used for gateway-level failures.
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            fulfillment_text: text.into(),
            fulfillment_messages: Vec::new(),
        }
    }
}

/// Build the response body the platform speaks back to the user.
pub fn format_response(text: &str) -> FulfillmentResponse {
    FulfillmentResponse::new(text)
}
