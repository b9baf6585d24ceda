//! Process-wide `tracing` subscriber setup.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Library modules held at `warn` unless `RUST_LOG` says otherwise.
pub const NOISY_MODULES: &[&str] = &["hyper", "hyper_util", "reqwest", "h2", "rustls", "tower_http"];

/// `RUST_LOG` wins; otherwise `info` with noisy dependencies quieted.
fn build_filter() -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::new(default_directives())
}

fn default_directives() -> String {
    let mut directives = String::from("info");
    for module in NOISY_MODULES {
        directives.push(',');
        directives.push_str(module);
        directives.push_str("=warn");
    }
    directives
}

/// Install the global subscriber. `"json"` emits one JSON object per event;
/// anything else uses the human-readable formatter.
///
/// Calling this twice is harmless: the second install is ignored.
pub fn init_logging(log_format: &str) {
    let registry = tracing_subscriber::registry().with(build_filter());

    let result = if log_format == "json" {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_target(true),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("Global subscriber already installed");
    }
}
