//! Route handlers.

use super::AppState;
use crate::fulfillment::{
    FulfillmentResponse, WebhookRequest, INVALID_FORMAT_TEXT, PROCESSING_ERROR_TEXT,
};
use crate::observability::{Metrics, RequestStatus};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use std::time::Instant;

pub const SERVICE_NAME: &str = "voicegate";

/// True for `application/json` and `application/*+json` media types.
fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(value) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    let mime = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

/// GET /: service info
pub async fn handle_root() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "webhook": "/webhook",
            "health": "/health",
            "metrics": "/metrics",
            "sessions": "/api/sessions/stats",
        },
    }))
}

/// GET /health: backend liveness
pub async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let provider = state.service.provider();
    if provider.health_check().await {
        (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "healthy",
                "service": SERVICE_NAME,
                "backend": "connected",
                "provider": provider.name(),
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "degraded",
                "service": SERVICE_NAME,
                "backend": "unavailable",
                "provider": provider.name(),
            })),
        )
    }
}

/// GET /metrics: Prometheus text exposition
pub async fn handle_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let Some(metrics) = state.metrics.as_ref() else {
        return handle_not_found().await.into_response();
    };

    metrics.set_session_stats(&state.service.store().get_stats());
    match metrics.render() {
        Ok(body) => ([(header::CONTENT_TYPE, Metrics::content_type())], body).into_response(),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "Internal server error",
                    "message": "An unexpected error occurred",
                })),
            )
                .into_response()
        }
    }
}

/// POST /webhook: Dialogflow fulfillment
///
/// Always answers 200 with a fulfillment body so the assistant speaks a
/// friendly message; only a non-JSON content type gets 400.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let started = Instant::now();
    let metrics = state.metrics.as_deref();

    let response = if !is_json_content_type(&headers) {
        tracing::warn!("Non-JSON request received");
        if let Some(m) = metrics {
            m.record_request("unknown", RequestStatus::Error);
        }
        (
            StatusCode::BAD_REQUEST,
            Json(FulfillmentResponse::text_only(INVALID_FORMAT_TEXT)),
        )
    } else {
        match serde_json::from_slice::<WebhookRequest>(&body) {
            Ok(request) => {
                let reply = state.service.handle(&request).await;
                tracing::info!(intent = request.intent_label(), "Webhook response sent");
                (StatusCode::OK, Json(reply))
            }
            Err(e) => {
                tracing::error!(error = %e, "Webhook processing error");
                if let Some(m) = metrics {
                    m.record_request("error", RequestStatus::Error);
                }
                (
                    StatusCode::OK,
                    Json(FulfillmentResponse::text_only(PROCESSING_ERROR_TEXT)),
                )
            }
        }
    };

    if let Some(m) = metrics {
        m.observe_request_duration(started.elapsed().as_secs_f64());
    }
    response
}

/// GET /api/sessions/stats: store snapshot
pub async fn handle_session_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.store().get_stats())
}

/// DELETE /api/sessions/{id}: drop one session
///
/// Dialogflow session paths contain `/`; callers percent-encode them.
pub async fn handle_session_clear(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    state.service.store().clear_session(&session_id);
    Json(serde_json::json!({"status": "ok"}))
}

/// Fallback for unknown routes.
pub async fn handle_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": "Endpoint not found",
            "message": "The requested endpoint does not exist",
        })),
    )
}
