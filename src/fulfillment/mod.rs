//! Dialogflow fulfillment: payload parsing, intent routing, and spoken replies.

pub mod dispatcher;
pub mod request;
pub mod response;
pub mod voice;

pub use dispatcher::{FulfillmentService, Intent, AI_UNAVAILABLE_TEXT, FALLBACK_TEXT, WELCOME_TEXT};
pub use request::{validate_request, RequestError, WebhookRequest, DEFAULT_SESSION_ID};
pub use response::{format_response, FulfillmentResponse};
pub use voice::optimize_for_voice;

/// Returned with HTTP 400 when the body is not JSON.
pub const INVALID_FORMAT_TEXT: &str = "Sorry, I received an invalid request format.";

/// Returned with HTTP 200 when the body cannot be handled at all.
pub const PROCESSING_ERROR_TEXT: &str =
    "Sorry, I encountered an error processing your request. Please try again.";
