use std::sync::Arc;

use crate::auth::{authenticate, build_allowed_key_set, AllowedClientKeys};
use crate::client::LlmClient;
use crate::config::AppConfig;
use crate::error::RelayError;
use crate::settings::{LlmSettings, MemorySettingsStore, SettingsStore};
use crate::transport::HttpTransport;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub config: AppConfig,
    pub client: LlmClient,
    settings: Arc<dyn SettingsStore>,
    allowed_client_keys: AllowedClientKeys,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: AppConfig,
        transport: HttpTransport,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        let allowed_client_keys = build_allowed_key_set(&config);
        Self {
            config,
            client: LlmClient::new(transport),
            settings,
            allowed_client_keys,
        }
    }

    /// State with a transport and an in-memory settings store built from `config`.
    #[must_use]
    pub fn from_config(config: AppConfig) -> Self {
        let transport = HttpTransport::new(&config.server);
        let settings = Arc::new(MemorySettingsStore::seeded_from(&config.llm));
        Self::new(config, transport, settings)
    }

    /// Authenticate a relay request using the prebuilt key index.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Auth` when the API key is missing or invalid.
    pub fn authenticate(&self, headers: &http::HeaderMap) -> Result<(), RelayError> {
        authenticate(headers, &self.allowed_client_keys)
    }

    #[must_use]
    pub fn auth_required(&self) -> bool {
        !self.allowed_client_keys.is_open()
    }

    #[must_use]
    pub fn settings_store(&self) -> &dyn SettingsStore {
        self.settings.as_ref()
    }

    /// Settings for the next LLM call, read fresh from the store.
    #[must_use]
    pub fn llm_settings(&self) -> LlmSettings {
        LlmSettings::load(self.settings.as_ref(), &self.config.llm)
    }
}
