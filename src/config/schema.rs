use anyhow::{Context, Result};
use directories::UserDirs;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
#[cfg(unix)]
use tokio::fs::File;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

const SUPPORTED_BACKENDS: &[&str] = &["litellm", "gemini"];
const SUPPORTED_LOG_FORMATS: &[&str] = &["text", "json"];

// ── Top-level config ──────────────────────────────────────────────

/// Top-level voicegate configuration, loaded from `config.toml`.
///
/// Resolution order: `VOICEGATE_CONFIG_DIR` env → `~/.voicegate/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    /// Path to config.toml - computed at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    /// Backend used for AI replies (`"litellm"` or `"gemini"`). Default: `"litellm"`.
    #[serde(default = "default_backend")]
    pub default_backend: String,

    /// OpenAI-compatible LiteLLM proxy backend (`[litellm]`).
    #[serde(default)]
    pub litellm: LiteLlmConfig,

    /// Google Gemini backend (`[gemini]`).
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Conversation history limits and expiry (`[conversation]`).
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// HTTP gateway bind address and limits (`[gateway]`).
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Voice output shaping (`[voice]`).
    #[serde(default)]
    pub voice: VoiceConfig,

    /// Logging and metrics (`[observability]`).
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

fn default_backend() -> String {
    "litellm".into()
}

fn default_temperature() -> f64 {
    0.7
}

// ── Backends ─────────────────────────────────────────────────────

/// LiteLLM proxy configuration (`[litellm]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LiteLlmConfig {
    /// Proxy base URL. Default: `http://localhost:4000/v1`.
    #[serde(default = "default_litellm_base_url")]
    pub base_url: String,
    /// API key sent as a bearer token. Overridden by `LITELLM_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model routed through the proxy. Default: `granite-3.2-8b-instruct`.
    #[serde(default = "default_litellm_model")]
    pub model: String,
    /// Completion token cap; voice replies should stay short. Default: `150`.
    #[serde(default = "default_litellm_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature (0.0 to 2.0). Default: `0.7`.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_litellm_base_url() -> String {
    "http://localhost:4000/v1".into()
}

fn default_litellm_model() -> String {
    "granite-3.2-8b-instruct".into()
}

fn default_litellm_max_tokens() -> u32 {
    150
}

impl Default for LiteLlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_litellm_base_url(),
            api_key: None,
            model: default_litellm_model(),
            max_tokens: default_litellm_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Gemini configuration (`[gemini]` section). The backend is disabled without an API key.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeminiConfig {
    /// Google AI Studio key. Overridden by `GEMINI_API_KEY` or `GOOGLE_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Default: `gemini-1.5-flash`.
    #[serde(default = "default_gemini_model")]
    pub model: String,
    /// Gemini needs a generous budget to produce any text. Default: `2048`.
    #[serde(default = "default_gemini_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// API root. Default: `https://generativelanguage.googleapis.com/v1beta`.
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".into()
}

fn default_gemini_max_tokens() -> u32 {
    2048
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_gemini_model(),
            max_tokens: default_gemini_max_tokens(),
            temperature: default_temperature(),
            base_url: default_gemini_base_url(),
        }
    }
}

// ── Conversation ─────────────────────────────────────────────────

/// Conversation store configuration (`[conversation]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConversationConfig {
    /// Maximum messages retained per session. Default: `10`.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// Idle minutes before a session is discarded. Default: `30`.
    #[serde(default = "default_session_timeout_minutes")]
    pub session_timeout_minutes: u64,
    /// Background expiry sweep period in seconds; `0` disables the janitor. Default: `60`.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_max_history() -> usize {
    10
}

fn default_session_timeout_minutes() -> u64 {
    30
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            session_timeout_minutes: default_session_timeout_minutes(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

// ── Gateway ──────────────────────────────────────────────────────

/// Gateway server configuration (`[gateway]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GatewayConfig {
    /// Gateway port (default: 5001)
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Gateway host (default: 0.0.0.0)
    #[serde(default = "default_gateway_host")]
    pub host: String,
    /// Per-request timeout covering the backend round-trip.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Maximum accepted request body size.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_gateway_port() -> u16 {
    5001
}

fn default_gateway_host() -> String {
    "0.0.0.0".into()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    65_536
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            host: default_gateway_host(),
            request_timeout_secs: default_request_timeout_secs(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

// ── Voice ────────────────────────────────────────────────────────

/// Voice output configuration (`[voice]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VoiceConfig {
    /// Spoken replies are cut at a word boundary past this length. Default: `500`.
    #[serde(default = "default_max_response_chars")]
    pub max_response_chars: usize,
    /// Phrase spoken in place of a URL.
    #[serde(default = "default_url_replacement")]
    pub url_replacement: String,
}

fn default_max_response_chars() -> usize {
    500
}

fn default_url_replacement() -> String {
    "check the link I sent to your phone".into()
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            max_response_chars: default_max_response_chars(),
            url_replacement: default_url_replacement(),
        }
    }
}

// ── Observability ─────────────────────────────────────────────────

/// Observability configuration (`[observability]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ObservabilityConfig {
    /// "text" | "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Serve Prometheus metrics on `/metrics`.
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_format() -> String {
    "json".into()
}

fn default_true() -> bool {
    true
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            metrics_enabled: true,
        }
    }
}

// ── Config impl ──────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        let home =
            UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());

        Self {
            config_path: home.join(".voicegate").join("config.toml"),
            default_backend: default_backend(),
            litellm: LiteLlmConfig::default(),
            gemini: GeminiConfig::default(),
            conversation: ConversationConfig::default(),
            gateway: GatewayConfig::default(),
            voice: VoiceConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

fn default_config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("VOICEGATE_CONFIG_DIR") {
        let dir = dir.trim();
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = UserDirs::new()
        .map(|u| u.home_dir().to_path_buf())
        .context("Could not find home directory")?;
    Ok(home.join(".voicegate"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub async fn load_or_init() -> Result<Self> {
        let config_dir = default_config_dir()?;
        fs::create_dir_all(&config_dir)
            .await
            .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;
        Self::load_or_init_at(&config_dir.join("config.toml")).await
    }

    /// Load `config_path`, writing defaults there first if it does not exist.
    pub async fn load_or_init_at(config_path: &Path) -> Result<Self> {
        let mut config = if !config_path.exists() {
            let mut config = Config::default();
            config.config_path = config_path.to_path_buf();
            config.save().await?;
            config
        } else {
            let contents = fs::read_to_string(config_path)
                .await
                .context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_path = config_path.to_path_buf();
            config
        };

        config.apply_env_overrides();
        config.default_backend = config.default_backend.trim().to_ascii_lowercase();
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values that would cause runtime failures.
    pub fn validate(&self) -> Result<()> {
        let backend = self.default_backend.trim().to_ascii_lowercase();
        if !SUPPORTED_BACKENDS.contains(&backend.as_str()) {
            anyhow::bail!(
                "default_backend must be one of {SUPPORTED_BACKENDS:?}, got {:?}",
                self.default_backend
            );
        }
        if self.conversation.max_history == 0 {
            anyhow::bail!("conversation.max_history must be greater than 0");
        }
        if self.conversation.session_timeout_minutes == 0 {
            anyhow::bail!("conversation.session_timeout_minutes must be greater than 0");
        }
        if self.gateway.host.trim().is_empty() {
            anyhow::bail!("gateway.host must not be empty");
        }
        for (field, temp) in [
            ("litellm.temperature", self.litellm.temperature),
            ("gemini.temperature", self.gemini.temperature),
        ] {
            if !(0.0..=2.0).contains(&temp) {
                anyhow::bail!("{field} must be between 0.0 and 2.0, got {temp}");
            }
        }
        if self.voice.max_response_chars <= 3 {
            anyhow::bail!("voice.max_response_chars must be greater than 3");
        }
        if !SUPPORTED_LOG_FORMATS.contains(&self.observability.log_format.as_str()) {
            anyhow::bail!(
                "observability.log_format must be one of {SUPPORTED_LOG_FORMATS:?}, got {:?}",
                self.observability.log_format
            );
        }
        Ok(())
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup. Empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_empty(lookup(key));

        if let Some(url) = get("LITELLM_BASE_URL") {
            self.litellm.base_url = url;
        }
        if let Some(key) = get("LITELLM_API_KEY") {
            self.litellm.api_key = Some(key);
        }
        if let Some(model) = get("LITELLM_MODEL") {
            self.litellm.model = model;
        }

        // Gemini key: GEMINI_API_KEY wins over GOOGLE_API_KEY
        if let Some(key) = get("GEMINI_API_KEY").or_else(|| get("GOOGLE_API_KEY")) {
            self.gemini.api_key = Some(key);
        }
        if let Some(model) = get("GEMINI_MODEL") {
            self.gemini.model = model;
        }

        if let Some(backend) = get("VOICEGATE_BACKEND") {
            self.default_backend = backend.to_ascii_lowercase();
        }

        // Gateway port: VOICEGATE_PORT or PORT
        if let Some(port) = get("VOICEGATE_PORT").or_else(|| get("PORT")) {
            match port.parse::<u16>() {
                Ok(port) => self.gateway.port = port,
                Err(_) => tracing::warn!(port = %port, "Ignoring invalid port override"),
            }
        }
        if let Some(host) = get("VOICEGATE_HOST").or_else(|| get("HOST")) {
            self.gateway.host = host;
        }

        if let Some(raw) = get("MAX_HISTORY") {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => self.conversation.max_history = n,
                _ => tracing::warn!(value = %raw, "Ignoring invalid MAX_HISTORY"),
            }
        }
        if let Some(raw) = get("SESSION_TIMEOUT_MINUTES") {
            match raw.parse::<u64>() {
                Ok(n) if n > 0 => self.conversation.session_timeout_minutes = n,
                _ => tracing::warn!(value = %raw, "Ignoring invalid SESSION_TIMEOUT_MINUTES"),
            }
        }

        if let Some(format) = get("VOICEGATE_LOG_FORMAT") {
            self.observability.log_format = format.to_ascii_lowercase();
        }
    }

    pub async fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;

        let parent_dir = self
            .config_path
            .parent()
            .context("Config path must have a parent directory")?;

        fs::create_dir_all(parent_dir).await.with_context(|| {
            format!(
                "Failed to create config directory: {}",
                parent_dir.display()
            )
        })?;

        let file_name = self
            .config_path
            .file_name()
            .and_then(|v| v.to_str())
            .unwrap_or("config.toml");
        let temp_path = parent_dir.join(format!(".{file_name}.tmp-{}", uuid::Uuid::new_v4()));

        let mut temp_file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to create temporary config file: {}",
                    temp_path.display()
                )
            })?;
        temp_file
            .write_all(toml_str.as_bytes())
            .await
            .context("Failed to write temporary config contents")?;
        temp_file
            .sync_all()
            .await
            .context("Failed to fsync temporary config file")?;
        drop(temp_file);

        if let Err(e) = fs::rename(&temp_path, &self.config_path).await {
            let _ = fs::remove_file(&temp_path).await;
            anyhow::bail!("Failed to atomically replace config file: {e}");
        }

        // Restrict permissions (may contain API keys)
        #[cfg(unix)]
        {
            use std::{fs::Permissions, os::unix::fs::PermissionsExt};
            let _ = fs::set_permissions(&self.config_path, Permissions::from_mode(0o600)).await;
        }

        sync_directory(parent_dir).await
    }
}

async fn sync_directory(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        let dir = File::open(path)
            .await
            .with_context(|| format!("Failed to open directory for fsync: {}", path.display()))?;
        dir.sync_all()
            .await
            .with_context(|| format!("Failed to fsync directory metadata: {}", path.display()))?;
        Ok(())
    }

    #[cfg(not(unix))]
    {
        let _ = path;
        Ok(())
    }
}
