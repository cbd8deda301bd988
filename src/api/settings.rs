use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde_json::{Map, Value};

use crate::settings::{apply_update, SettingsStore, KEY_API_KEY, LLM_SETTING_KEYS};
use crate::state::AppState;

use super::{parse_json_body, success_response};

/// `GET /v1/settings`
pub fn get_handler(State(state): State<Arc<AppState>>, headers: &HeaderMap) -> Response {
    if let Err(err) = state.authenticate(headers) {
        return err.into_response();
    }
    success_response(Value::Object(masked_settings(state.settings_store())))
}

/// `PUT /v1/settings`: partial update of the LLM settings.
pub fn put_handler(State(state): State<Arc<AppState>>, headers: &HeaderMap, body: &Bytes) -> Response {
    let result = state.authenticate(headers).and_then(|()| {
        let update: Map<String, Value> = parse_json_body(body, "settings")?;
        apply_update(state.settings_store(), &update)
    });
    match result {
        Ok(()) => success_response(Value::Object(masked_settings(state.settings_store()))),
        Err(err) => err.into_response(),
    }
}

fn masked_settings(store: &dyn SettingsStore) -> Map<String, Value> {
    LLM_SETTING_KEYS
        .iter()
        .filter_map(|key| {
            let value = store.get(key)?;
            let value = if *key == KEY_API_KEY {
                Value::from(mask_secret(value.as_str().unwrap_or_default()))
            } else {
                value
            };
            Some(((*key).to_string(), value))
        })
        .collect()
}

/// Keep only the last four characters of a secret.
fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count == 0 {
        return String::new();
    }
    if count <= 8 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("****{tail}")
}
