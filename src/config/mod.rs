pub mod schema;

#[allow(unused_imports)]
pub use schema::{
    Config, ConversationConfig, GatewayConfig, GeminiConfig, LiteLlmConfig, ObservabilityConfig,
    VoiceConfig,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reexported_config_default_is_constructible() {
        let config = Config::default();

        assert!(!config.default_backend.is_empty());
        assert!(config.conversation.max_history > 0);
        assert!(config.litellm.temperature > 0.0);
    }
}
