//! Response normalization: one entry point that turns an upstream reply into
//! an [`UpstreamResult`] for either protocol variant.

pub mod fold;

pub use fold::{fold_stream, ResponseFold};

use serde_json::Value;

use crate::error::RelayError;
use crate::protocol::{extract_response_text, CanonicalResult, ProtocolVariant, UpstreamResult};
use crate::stream::decode_stream;
use crate::transport::UpstreamResponse;

/// Parse a successful upstream reply according to `variant`.
///
/// - Chat completions: the body is one JSON document, passed through as-is.
/// - Responses API: an SSE body is decoded and folded; any other body is
///   parsed as one JSON document and its text extracted.
///
/// # Errors
///
/// Returns [`RelayError::InvalidResponse`] for a non-JSON document body,
/// [`RelayError::StreamUnavailable`] when an SSE reply has no body,
/// [`RelayError::UpstreamStream`] for an in-band error event,
/// [`RelayError::EmptyStream`] when a stream yields nothing usable, and
/// [`RelayError::Transport`] when reading the body fails.
pub async fn parse_response(
    response: UpstreamResponse,
    variant: ProtocolVariant,
) -> Result<UpstreamResult, RelayError> {
    match variant {
        ProtocolVariant::ChatCompletions => {
            let doc = read_json_document(response).await?;
            Ok(UpstreamResult::Passthrough(doc))
        }
        ProtocolVariant::ResponsesApi => parse_responses_api(response)
            .await
            .map(UpstreamResult::Normalized),
    }
}

async fn parse_responses_api(response: UpstreamResponse) -> Result<CanonicalResult, RelayError> {
    if response.is_event_stream() {
        let body = response.into_byte_stream()?;
        return fold_stream(decode_stream(body)).await;
    }

    let raw = match read_json_document(response).await? {
        Value::Object(doc) => doc,
        other => {
            tracing::debug!(kind = json_kind(&other), "responses document is not an object");
            serde_json::Map::new()
        }
    };
    let output_text = extract_response_text(&raw);
    Ok(CanonicalResult { output_text, raw })
}

async fn read_json_document(response: UpstreamResponse) -> Result<Value, RelayError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|err| RelayError::InvalidResponse(format!("body is not valid JSON: {err}")))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
