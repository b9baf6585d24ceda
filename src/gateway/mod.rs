//! HTTP gateway for the Dialogflow fulfillment webhook.
//!
//! Routes:
//! - `GET /` service info
//! - `GET /health` backend liveness (`503` when degraded)
//! - `GET /metrics` Prometheus exposition (when enabled)
//! - `POST /webhook` fulfillment
//! - `GET /api/sessions/stats`, `DELETE /api/sessions/{id}` session admin

pub mod api;
pub mod janitor;

use crate::config::{Config, GatewayConfig};
use crate::fulfillment::FulfillmentService;
use crate::observability::Metrics;
use crate::providers;
use crate::sessions::create_conversation_store;
use anyhow::Context;
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<FulfillmentService>,
    pub metrics: Option<Arc<Metrics>>,
}

/// Build the router with body-size and timeout limits from `config`.
pub fn build_router(state: AppState, config: &GatewayConfig) -> Router {
    let mut router = Router::new()
        .route("/", get(api::handle_root))
        .route("/health", get(api::handle_health))
        .route("/webhook", post(api::handle_webhook))
        .route("/api/sessions/stats", get(api::handle_session_stats))
        .route("/api/sessions/{id}", delete(api::handle_session_clear));

    if state.metrics.is_some() {
        router = router.route("/metrics", get(api::handle_metrics));
    }

    router
        .fallback(api::handle_not_found)
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .with_state(state)
}

/// Wire the store, backend, and metrics together from config.
pub fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let store = create_conversation_store(&config.conversation);
    let registry = providers::create_registry(config)?;
    let provider = registry.resolve(Some(&config.default_backend))?;

    let metrics = if config.observability.metrics_enabled {
        Some(Arc::new(Metrics::new().context("Failed to register metrics")?))
    } else {
        None
    };

    let mut service = FulfillmentService::new(store, provider, config.voice.clone());
    if let Some(metrics) = &metrics {
        service = service.with_metrics(metrics.clone());
    }

    Ok(AppState {
        service: Arc::new(service),
        metrics,
    })
}

/// Run the gateway until Ctrl+C or SIGTERM.
pub async fn run_gateway(config: &Config) -> anyhow::Result<()> {
    let state = build_state(config)?;
    let addr: SocketAddr = format!("{}:{}", config.gateway.host, config.gateway.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid gateway address {}:{}",
                config.gateway.host, config.gateway.port
            )
        })?;

    let janitor = janitor::spawn_janitor(
        state.service.store().clone(),
        Duration::from_secs(config.conversation.sweep_interval_secs),
    );

    let router = build_router(state.clone(), &config.gateway);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind gateway on {addr}"))?;

    tracing::info!(
        %addr,
        backend = state.service.provider().name(),
        model = state.service.provider().default_model(),
        "Starting voice webhook gateway"
    );

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Some(handle) = janitor {
        handle.abort();
    }
    served.context("Gateway server error")?;

    tracing::info!("Gateway stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
