use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Json, Response};
use bytes::Bytes;

use crate::client::ConnectionProbe;
use crate::state::AppState;

use super::parse_json_body;

/// `POST /v1/test`: connection test with caller-supplied settings.
///
/// Upstream failures are part of the outcome (`200` with `success: false`);
/// only relay-side problems use error statuses.
pub async fn handler(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Response {
    if let Err(err) = state.authenticate(&headers) {
        return err.into_response();
    }
    let probe: ConnectionProbe = match parse_json_body(&body, "connection test") {
        Ok(probe) => probe,
        Err(err) => return err.into_response(),
    };
    Json(state.client.test_connection(&probe).await).into_response()
}
