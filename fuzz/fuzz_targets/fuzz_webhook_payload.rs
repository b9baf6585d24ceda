#![no_main]
use libfuzzer_sys::fuzz_target;
use voicegate::fulfillment::{validate_request, WebhookRequest};

fuzz_target!(|data: &[u8]| {
    if let Ok(request) = serde_json::from_slice::<WebhookRequest>(data) {
        let _ = validate_request(&request);
        let _ = request.intent_name();
        let _ = request.intent_label();
        let _ = request.query_text();
        let _ = voicegate::util::sanitize_session_id(request.session_id());
    }
});
