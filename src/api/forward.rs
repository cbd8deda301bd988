use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;

use crate::error::RelayError;
use crate::state::AppState;

use super::{parse_json_body, success_response};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForwardRequest {
    endpoint: String,
    #[serde(default)]
    api_key: Option<String>,
    body: Value,
}

/// `POST /v1/forward`: send a JSON body to an arbitrary endpoint on the caller's behalf.
pub async fn handler(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Response {
    match handler_inner(&state, &headers, &body).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn handler_inner(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Response, RelayError> {
    state.authenticate(headers)?;
    let request: ForwardRequest = parse_json_body(body, "forward request")?;
    let reply = state
        .client
        .forward_json(&request.endpoint, request.api_key.as_deref(), &request.body)
        .await?;
    Ok(success_response(reply))
}
