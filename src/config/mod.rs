pub mod validation;

use serde::{Deserialize, Serialize};

use crate::protocol::ProtocolVariant;

use self::validation::validate_config;

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Relay server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    /// Overall upstream request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_http_pool_max_idle_per_host")]
    pub http_pool_max_idle_per_host: usize,
    /// `0` keeps idle connections forever.
    #[serde(default = "default_http_pool_idle_timeout_secs")]
    pub http_pool_idle_timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_worker_threads: Option<usize>,
    #[serde(default)]
    pub http_use_env_proxy: bool,
}

fn default_port() -> u16 {
    8765
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_timeout() -> u64 {
    120
}
fn default_http_pool_max_idle_per_host() -> usize {
    8
}
fn default_http_pool_idle_timeout_secs() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            timeout: default_timeout(),
            http_pool_max_idle_per_host: default_http_pool_max_idle_per_host(),
            http_pool_idle_timeout_secs: default_http_pool_idle_timeout_secs(),
            runtime_worker_threads: None,
            http_use_env_proxy: false,
        }
    }
}

/// Upstream LLM defaults. These seed the settings store at startup; the
/// store may be changed at runtime afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model_name")]
    pub model_name: String,
    #[serde(default)]
    pub api_protocol: ProtocolVariant,
    #[serde(default)]
    pub reasoning_effort: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_api_endpoint() -> String {
    "https://api.deepseek.com/chat/completions".to_string()
}
fn default_model_name() -> String {
    "deepseek-chat".to_string()
}
fn default_temperature() -> f64 {
    0.3
}
fn default_max_tokens() -> u32 {
    2000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_endpoint: default_api_endpoint(),
            api_key: String::new(),
            model_name: default_model_name(),
            api_protocol: ProtocolVariant::default(),
            reasoning_effort: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Client authentication configuration. An empty key list leaves the relay open.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientAuthConfig {
    #[serde(default)]
    pub allowed_keys: Vec<String>,
}

/// Feature flags and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub client_authentication: ClientAuthConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
}

/// Load configuration from a YAML file and validate it.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when reading the file fails, [`ConfigError::Yaml`]
/// when parsing fails, or [`ConfigError::Validation`] when semantic validation fails.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse and validate configuration from YAML text.
///
/// # Errors
///
/// Returns [`ConfigError::Yaml`] or [`ConfigError::Validation`].
pub fn parse_config(contents: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_yaml::from_str(contents)?;
    validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_example_config() {
        // The example config should load and validate successfully
        let config = load_config("config.example.yaml");
        assert!(
            config.is_ok(),
            "Failed to load example config: {:?}",
            config.err()
        );
        let config = config.unwrap();
        assert_eq!(config.server.port, 8765);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.llm.api_protocol, ProtocolVariant::ResponsesApi);
        assert_eq!(config.llm.reasoning_effort.as_deref(), Some("low"));
        assert!((config.llm.temperature - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.llm.max_tokens, 2000);
        assert_eq!(config.client_authentication.allowed_keys.len(), 1);
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config.server.port, 8765);
        assert_eq!(config.server.runtime_worker_threads, None);
        assert_eq!(config.llm.model_name, "deepseek-chat");
        assert_eq!(config.llm.api_protocol, ProtocolVariant::ChatCompletions);
        assert_eq!(config.llm.max_tokens, 2000);
        assert!(config.client_authentication.allowed_keys.is_empty());
        assert_eq!(config.features.log_level, "INFO");
    }

    #[test]
    fn test_protocol_spellings_in_yaml() {
        let config = parse_config("llm:\n  api_protocol: responses_api\n").unwrap();
        assert_eq!(config.llm.api_protocol, ProtocolVariant::ResponsesApi);
        let err = parse_config("llm:\n  api_protocol: grpc\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }
}
