//! Provider subsystem for LLM backends.
//!
//! Each backend implements the [`Provider`] trait defined in [`traits`] and is
//! constructed from config by [`create_provider`] using its canonical string key.
//!
//! # Extension
//!
//! To add a backend, implement [`Provider`] in a new submodule, register it in
//! [`create_provider`], and list it in [`list_providers`].

pub mod compatible;
pub mod gemini;
pub mod registry;
pub mod traits;

#[allow(unused_imports)]
pub use traits::{ChatOptions, ChatResponse, Provider, TokenUsage};
pub use registry::ProviderRegistry;

use crate::config::Config;
use compatible::OpenAiCompatibleProvider;
use gemini::GeminiProvider;
use std::sync::Arc;

const MAX_API_ERROR_CHARS: usize = 200;

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')
}

fn token_end(input: &str, from: usize) -> usize {
    let mut end = from;
    for (i, c) in input[from..].char_indices() {
        if is_secret_char(c) {
            end = from + i + c.len_utf8();
        } else {
            break;
        }
    }
    end
}

/// Scrub known secret-like token prefixes from provider error strings.
///
/// Redacts OpenAI/LiteLLM style `sk-` keys and Google `AIza` keys.
pub fn scrub_secret_patterns(input: &str) -> String {
    const PREFIXES: [&str; 2] = ["sk-", "AIza"];

    let mut scrubbed = input.to_string();

    for prefix in PREFIXES {
        let mut search_from = 0;
        while let Some(rel) = scrubbed[search_from..].find(prefix) {
            let start = search_from + rel;
            let content_start = start + prefix.len();
            let end = token_end(&scrubbed, content_start);

            if end == content_start {
                search_from = content_start;
                continue;
            }

            scrubbed.replace_range(start..end, "[REDACTED]");
            search_from = start + "[REDACTED]".len();
        }
    }

    scrubbed
}

/// Sanitize API error text by scrubbing secrets and truncating length.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input);

    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed;
    }

    crate::util::truncate_with_ellipsis(&scrubbed, MAX_API_ERROR_CHARS)
}

/// Build a sanitized provider error from a failed HTTP response.
pub async fn api_error(provider: &str, response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read provider error body>".to_string());
    let sanitized = sanitize_api_error(&body);
    anyhow::anyhow!("{provider} API error ({status}): {sanitized}")
}

/// Create a backend by canonical name from the loaded config.
pub fn create_provider(name: &str, config: &Config) -> anyhow::Result<Arc<dyn Provider>> {
    match name.trim().to_ascii_lowercase().as_str() {
        "litellm" => {
            let c = &config.litellm;
            Ok(Arc::new(
                OpenAiCompatibleProvider::new("litellm", &c.base_url, c.api_key.as_deref(), &c.model)
                    .with_defaults(c.max_tokens, c.temperature),
            ))
        }
        "gemini" => {
            let c = &config.gemini;
            Ok(Arc::new(
                GeminiProvider::new(c.api_key.as_deref(), &c.model, &c.base_url)
                    .with_defaults(c.max_tokens, c.temperature),
            ))
        }
        "" => anyhow::bail!("Provider name must not be empty"),
        other => anyhow::bail!(
            "Unknown provider: {other}. Run `voicegate providers` to see supported backends."
        ),
    }
}

/// Build a registry holding every known backend, defaulting to `config.default_backend`.
pub fn create_registry(config: &Config) -> anyhow::Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new(&config.default_backend);
    for info in list_providers() {
        registry.register(create_provider(info.name, config)?);
    }
    Ok(registry)
}

/// Information about a supported backend for display purposes.
pub struct ProviderInfo {
    /// Canonical name used in config (e.g. `"litellm"`)
    pub name: &'static str,
    /// Human-readable display name
    pub display_name: &'static str,
    /// Environment variables that supply credentials
    pub key_env: &'static [&'static str],
}

/// Return the list of all known backends for display in `voicegate providers`.
pub fn list_providers() -> Vec<ProviderInfo> {
    vec![
        ProviderInfo {
            name: "litellm",
            display_name: "LiteLLM (OpenAI-compatible)",
            key_env: &["LITELLM_API_KEY"],
        },
        ProviderInfo {
            name: "gemini",
            display_name: "Google Gemini",
            key_env: &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
        },
    ]
}
