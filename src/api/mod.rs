pub mod forward;
pub mod health;
pub mod llm;
pub mod probe;
pub mod settings;

use axum::response::{IntoResponse, Json, Response};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::RelayError;

/// Decode a JSON request body.
///
/// # Errors
///
/// Returns [`RelayError::InvalidRequest`] naming `what` when decoding fails.
pub(crate) fn parse_json_body<T: DeserializeOwned>(body: &Bytes, what: &str) -> Result<T, RelayError> {
    serde_json::from_slice(body)
        .map_err(|err| RelayError::InvalidRequest(format!("Invalid {what} body: {err}")))
}

/// `{"success": true, "data": ...}`
pub(crate) fn success_response(data: Value) -> Response {
    Json(json!({
        "success": true,
        "data": data,
    }))
    .into_response()
}
