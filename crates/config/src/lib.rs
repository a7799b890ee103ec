//! Configuration loading, validation, and management for promptgate.
//!
//! Loads configuration from `~/.promptgate/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.promptgate/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default model backend
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Optional cap on tokens per response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_max_tokens: Option<u32>,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Context compression settings
    #[serde(default)]
    pub compression: CompressionConfig,

    /// Audit trail settings
    #[serde(default)]
    pub audit: AuditConfig,
}

fn default_provider() -> String {
    "ollama".into()
}
fn default_model() -> String {
    "gemma3:4b".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("providers", &self.providers)
            .field("compression", &self.compression)
            .field("audit", &self.audit)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

/// When and how oversized context is shrunk before a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Master switch; when off, context is always sent verbatim
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// The backend's context window, in tokens
    #[serde(default = "default_context_window")]
    pub context_window_tokens: usize,

    /// Share of the window the prompt may occupy (0 < f <= 1)
    #[serde(default = "default_usable_fraction")]
    pub usable_fraction: f32,

    /// Tokens held back for the model's answer
    #[serde(default = "default_response_reserve")]
    pub response_reserve_tokens: usize,

    /// Size of each piece summarized in one backend call
    #[serde(default = "default_chunk_tokens")]
    pub chunk_tokens: usize,

    /// Upper bound on summarization rounds for the pre-check
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
}

fn default_context_window() -> usize {
    8192
}
fn default_usable_fraction() -> f32 {
    0.8
}
fn default_response_reserve() -> usize {
    512
}
fn default_chunk_tokens() -> usize {
    2048
}
fn default_max_rounds() -> u32 {
    3
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            context_window_tokens: default_context_window(),
            usable_fraction: default_usable_fraction(),
            response_reserve_tokens: default_response_reserve(),
            chunk_tokens: default_chunk_tokens(),
            max_rounds: default_max_rounds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Stage that records land in when none was started explicitly
    #[serde(default = "default_stage")]
    pub default_stage: String,

    /// Where to write the JSON export after a run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_path: Option<PathBuf>,
}

fn default_stage() -> String {
    "default".into()
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_stage: default_stage(),
            export_path: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.promptgate/config.toml).
    ///
    /// Environment overrides:
    /// - `PROMPTGATE_API_KEY`, then `OPENAI_API_KEY` (only when no key is configured)
    /// - `PROMPTGATE_PROVIDER`, `PROMPTGATE_MODEL`
    /// - `OLLAMA_HOST` (ollama base URL, when not configured)
    /// - `PROMPTGATE_COMPRESSION` (`0`, `false` or `off` disables compression)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    fn apply_env_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = env("PROMPTGATE_API_KEY").or_else(|| env("OPENAI_API_KEY"));
        }

        if let Some(provider) = env("PROMPTGATE_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = env("PROMPTGATE_MODEL") {
            self.default_model = model;
        }

        if let Some(host) = env("OLLAMA_HOST") {
            let ollama = self.providers.entry("ollama".into()).or_default();
            if ollama.api_url.is_none() {
                ollama.api_url = Some(host);
            }
        }

        if let Some(flag) = env("PROMPTGATE_COMPRESSION") {
            if matches!(flag.trim().to_ascii_lowercase().as_str(), "0" | "false" | "off") {
                self.compression.enabled = false;
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".promptgate")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        let c = &self.compression;
        if c.usable_fraction <= 0.0 || c.usable_fraction > 1.0 {
            return Err(ConfigError::ValidationError(
                "compression.usable_fraction must be in (0.0, 1.0]".into(),
            ));
        }
        if c.chunk_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "compression.chunk_tokens must be > 0".into(),
            ));
        }
        if c.max_rounds == 0 {
            return Err(ConfigError::ValidationError(
                "compression.max_rounds must be >= 1".into(),
            ));
        }
        if c.response_reserve_tokens >= c.context_window_tokens {
            return Err(ConfigError::ValidationError(
                "compression.response_reserve_tokens must be smaller than context_window_tokens".into(),
            ));
        }

        Ok(())
    }

    /// Settings for a named provider, if configured.
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: None,
            providers: HashMap::new(),
            compression: CompressionConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "ollama");
        assert_eq!(config.default_model, "gemma3:4b");
        assert!(config.compression.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(
            parsed.compression.context_window_tokens,
            config.compression.context_window_tokens
        );
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_rounds_rejected() {
        let mut config = AppConfig::default();
        config.compression.max_rounds = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_rounds"));
    }

    #[test]
    fn usable_fraction_bounds() {
        let mut config = AppConfig::default();
        config.compression.usable_fraction = 0.0;
        assert!(config.validate().is_err());
        config.compression.usable_fraction = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        let config = result.unwrap();
        assert_eq!(config.default_provider, "ollama");
    }

    #[test]
    fn load_from_file_with_partial_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
default_model = "llama3.1:8b"

[compression]
enabled = false
context_window_tokens = 4096

[providers.ollama]
api_url = "http://gpu-box:11434"
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.default_model, "llama3.1:8b");
        assert!(!config.compression.enabled);
        assert_eq!(config.compression.context_window_tokens, 4096);
        assert_eq!(config.compression.max_rounds, 3);
        assert_eq!(
            config.provider("ollama").and_then(|p| p.api_url.as_deref()),
            Some("http://gpu-box:11434")
        );
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_model = [unterminated").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(env_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("PROMPTGATE_MODEL", "qwen2.5:7b"),
            ("OLLAMA_HOST", "http://10.0.0.5:11434"),
            ("PROMPTGATE_COMPRESSION", "off"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.default_model, "qwen2.5:7b");
        assert!(!config.compression.enabled);
        assert_eq!(
            config.provider("ollama").and_then(|p| p.api_url.as_deref()),
            Some("http://10.0.0.5:11434")
        );
    }

    #[test]
    fn configured_key_wins_over_env() {
        let mut config = AppConfig {
            api_key: Some("from-file".into()),
            ..AppConfig::default()
        };
        config.apply_env_overrides(env_from(&[("PROMPTGATE_API_KEY", "from-env")]));
        assert_eq!(config.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("ollama"));
        assert!(toml_str.contains("[compression]"));
    }
}
