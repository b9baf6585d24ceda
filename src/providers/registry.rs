//! Registry of constructed backends.
//!
//! Holds one shared instance per backend name and resolves requests to the
//! preferred backend, falling back to the configured default and then to the
//! first registered backend.

use super::traits::Provider;
use std::sync::Arc;

pub struct ProviderRegistry {
    entries: Vec<Arc<dyn Provider>>,
    default: String,
}

impl ProviderRegistry {
    pub fn new(default: &str) -> Self {
        Self {
            entries: Vec::new(),
            default: default.to_string(),
        }
    }

    /// Register a backend. A later registration replaces an earlier one with the same name.
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        if let Some(slot) = self
            .entries
            .iter_mut()
            .find(|p| p.name() == provider.name())
        {
            *slot = provider;
        } else {
            self.entries.push(provider);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.entries.iter().find(|p| p.name() == name).cloned()
    }

    pub fn list(&self) -> Vec<String> {
        self.entries.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn resolve(&self, preferred: Option<&str>) -> anyhow::Result<Arc<dyn Provider>> {
        if let Some(provider) = preferred.and_then(|name| self.get(name)) {
            return Ok(provider);
        }

        if let Some(provider) = self.get(&self.default) {
            return Ok(provider);
        }

        self.entries
            .first()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No provider available in registry"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::traits::{ChatOptions, ChatResponse};
    use crate::sessions::Message;
    use async_trait::async_trait;

    struct Named(&'static str, &'static str);

    #[async_trait]
    impl Provider for Named {
        async fn chat(&self, _: &[Message], _: &ChatOptions) -> anyhow::Result<ChatResponse> {
            Ok(ChatResponse::text_only(self.1))
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn default_model(&self) -> &str {
            "stub"
        }

        fn name(&self) -> &str {
            self.0
        }
    }

    fn registry(default: &str) -> ProviderRegistry {
        let mut r = ProviderRegistry::new(default);
        r.register(Arc::new(Named("litellm", "a")));
        r.register(Arc::new(Named("gemini", "b")));
        r
    }

    #[test]
    fn registry_default_is_empty() {
        let registry = ProviderRegistry::new("litellm");
        assert!(registry.list().is_empty());
    }

    #[test]
    fn registry_resolve_empty_errors() {
        let registry = ProviderRegistry::new("litellm");
        assert!(registry.resolve(None).is_err());
    }

    #[test]
    fn resolve_prefers_requested() {
        assert_eq!(registry("litellm").resolve(Some("gemini")).unwrap().name(), "gemini");
    }

    #[test]
    fn resolve_falls_back_to_default() {
        let r = registry("gemini");
        assert_eq!(r.resolve(Some("missing")).unwrap().name(), "gemini");
        assert_eq!(r.resolve(None).unwrap().name(), "gemini");
    }

    #[test]
    fn resolve_falls_back_to_first() {
        let r = registry("missing");
        assert_eq!(r.resolve(None).unwrap().name(), "litellm");
        assert_eq!(r.resolve(Some("other")).unwrap().name(), "litellm");
    }

    #[tokio::test]
    async fn register_replaces_same_name() {
        let mut r = registry("litellm");
        r.register(Arc::new(Named("litellm", "replacement")));
        assert_eq!(r.list(), vec!["litellm", "gemini"]);
        let reply = r
            .get("litellm")
            .unwrap()
            .chat(&[], &ChatOptions::default())
            .await
            .unwrap();
        assert_eq!(reply.text, "replacement");
    }
}
