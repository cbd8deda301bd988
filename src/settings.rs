//! Key-value settings store holding the user's LLM choices.
//!
//! Keys use the extension's camelCase spelling so a settings payload can be
//! stored as-is.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

use crate::config::LlmConfig;
use crate::error::RelayError;
use crate::protocol::ProtocolVariant;

pub const KEY_API_ENDPOINT: &str = "apiEndpoint";
pub const KEY_API_KEY: &str = "apiKey";
pub const KEY_MODEL_NAME: &str = "modelName";
pub const KEY_API_PROTOCOL: &str = "apiProtocol";
pub const KEY_REASONING_EFFORT: &str = "reasoningEffort";

/// Keys the relay reads for an LLM call.
pub const LLM_SETTING_KEYS: [&str; 5] = [
    KEY_API_ENDPOINT,
    KEY_API_KEY,
    KEY_MODEL_NAME,
    KEY_API_PROTOCOL,
    KEY_REASONING_EFFORT,
];

/// Storage backend for settings.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value);
}

/// Process-local settings store.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: RwLock<FxHashMap<String, Value>>,
}

impl MemorySettingsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated from the `llm` config section.
    #[must_use]
    pub fn seeded_from(llm: &LlmConfig) -> Self {
        let store = Self::new();
        store.set(KEY_API_ENDPOINT, Value::from(llm.api_endpoint.as_str()));
        store.set(KEY_API_KEY, Value::from(llm.api_key.as_str()));
        store.set(KEY_MODEL_NAME, Value::from(llm.model_name.as_str()));
        store.set(KEY_API_PROTOCOL, Value::from(llm.api_protocol.as_setting()));
        if let Some(effort) = &llm.reasoning_effort {
            store.set(KEY_REASONING_EFFORT, Value::from(effort.as_str()));
        }
        store
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.values.write().insert(key.to_string(), value);
    }
}

/// Settings resolved for one LLM call.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub api_endpoint: String,
    pub api_key: String,
    pub model_name: String,
    pub protocol: ProtocolVariant,
    pub reasoning_effort: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl LlmSettings {
    /// Read the call settings from `store`.
    ///
    /// Temperature and token limit are not user settings; they come from the
    /// config defaults and may be overridden per call.
    #[must_use]
    pub fn load(store: &dyn SettingsStore, defaults: &LlmConfig) -> Self {
        let string = |key: &str| {
            store
                .get(key)
                .and_then(|value| value.as_str().map(ToString::to_string))
                .unwrap_or_default()
        };
        let protocol = ProtocolVariant::from_setting(&string(KEY_API_PROTOCOL));
        let reasoning_effort = Some(string(KEY_REASONING_EFFORT)).filter(|e| !e.trim().is_empty());

        Self {
            api_endpoint: string(KEY_API_ENDPOINT),
            api_key: string(KEY_API_KEY),
            model_name: string(KEY_MODEL_NAME),
            protocol,
            reasoning_effort,
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
        }
    }

    /// # Errors
    ///
    /// Returns [`RelayError::NotConfigured`] naming the first missing setting.
    pub fn ensure_configured(&self) -> Result<(), RelayError> {
        let missing = [
            (KEY_API_ENDPOINT, &self.api_endpoint),
            (KEY_API_KEY, &self.api_key),
            (KEY_MODEL_NAME, &self.model_name),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty());

        match missing {
            Some((key, _)) => Err(RelayError::NotConfigured(format!("{key} is not set"))),
            None => Ok(()),
        }
    }
}

/// Apply a settings update, accepting only known keys with string (or null) values.
///
/// # Errors
///
/// Returns [`RelayError::InvalidRequest`] for an unknown key, a non-string
/// value, or an unknown protocol spelling. Nothing is written on error.
pub fn apply_update(store: &dyn SettingsStore, update: &Map<String, Value>) -> Result<(), RelayError> {
    for (key, value) in update {
        if !LLM_SETTING_KEYS.contains(&key.as_str()) {
            return Err(RelayError::InvalidRequest(format!("unknown setting '{key}'")));
        }
        let Some(text) = value.as_str().or_else(|| value.is_null().then_some("")) else {
            return Err(RelayError::InvalidRequest(format!(
                "setting '{key}' must be a string"
            )));
        };
        if key == KEY_API_PROTOCOL
            && serde_json::from_value::<ProtocolVariant>(Value::from(text)).is_err()
        {
            return Err(RelayError::InvalidRequest(format!(
                "unknown apiProtocol '{text}'"
            )));
        }
    }

    for (key, value) in update {
        let value = if value.is_null() {
            Value::from("")
        } else {
            value.clone()
        };
        store.set(key, value);
    }
    tracing::info!(keys = update.len(), "settings updated");
    Ok(())
}
