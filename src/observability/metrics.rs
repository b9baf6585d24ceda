//! Prometheus metrics for the webhook gateway.

use crate::providers::TokenUsage;
use crate::sessions::SessionStats;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// Outcome label for `assistant_requests_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Success,
    Error,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// Registry plus the collectors the gateway updates.
pub struct Metrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration: Histogram,
    ai_response_time: Histogram,
    ai_tokens_total: IntCounterVec,
    active_sessions: IntGauge,
    stored_messages: IntGauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("assistant_requests_total", "Total number of webhook requests"),
            &["intent", "status"],
        )?;
        let request_duration = Histogram::with_opts(HistogramOpts::new(
            "assistant_request_duration_seconds",
            "Request processing duration",
        ))?;
        let ai_response_time = Histogram::with_opts(HistogramOpts::new(
            "assistant_ai_response_time_seconds",
            "AI model response time",
        ))?;
        let ai_tokens_total = IntCounterVec::new(
            Opts::new("assistant_ai_tokens_total", "Tokens reported by the backend"),
            &["kind"],
        )?;
        let active_sessions = IntGauge::new(
            "assistant_active_sessions",
            "Sessions holding conversation history",
        )?;
        let stored_messages = IntGauge::new(
            "assistant_stored_messages",
            "Messages held across all sessions",
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(ai_response_time.clone()))?;
        registry.register(Box::new(ai_tokens_total.clone()))?;
        registry.register(Box::new(active_sessions.clone()))?;
        registry.register(Box::new(stored_messages.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration,
            ai_response_time,
            ai_tokens_total,
            active_sessions,
            stored_messages,
        })
    }

    pub fn record_request(&self, intent: &str, status: RequestStatus) {
        self.requests_total
            .with_label_values(&[intent, status.as_str()])
            .inc();
    }

    pub fn observe_request_duration(&self, seconds: f64) {
        self.request_duration.observe(seconds);
    }

    pub fn observe_ai_response(&self, seconds: f64) {
        self.ai_response_time.observe(seconds);
    }

    pub fn record_token_usage(&self, usage: &TokenUsage) {
        self.ai_tokens_total
            .with_label_values(&["prompt"])
            .inc_by(usage.prompt_tokens);
        self.ai_tokens_total
            .with_label_values(&["completion"])
            .inc_by(usage.completion_tokens);
    }

    pub fn set_session_stats(&self, stats: &SessionStats) {
        self.active_sessions
            .set(i64::try_from(stats.active_sessions).unwrap_or(i64::MAX));
        self.stored_messages
            .set(i64::try_from(stats.total_messages).unwrap_or(i64::MAX));
    }

    /// Prometheus text exposition of everything registered.
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }

    pub fn content_type() -> &'static str {
        prometheus::TEXT_FORMAT
    }
}
