use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use crate::client::LlmRequest;
use crate::error::RelayError;
use crate::state::AppState;

use super::{parse_json_body, success_response};

/// `POST /v1/llm`: run one conversation against the configured upstream.
pub async fn handler(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Response {
    match handler_inner(&state, &headers, &body).await {
        Ok(response) => response,
        Err(err) => {
            tracing::debug!(error = %err, "llm request failed");
            err.into_response()
        }
    }
}

async fn handler_inner(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Response, RelayError> {
    state.authenticate(headers)?;
    let request: LlmRequest = parse_json_body(body, "llm request")?;
    let settings = state.llm_settings();
    let reply = state.client.complete(&settings, &request).await?;
    Ok(success_response(reply))
}
