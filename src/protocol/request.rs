use bytes::Bytes;
use serde::Serialize;

use crate::error::RelayError;

use super::{ProtocolVariant, RequestMessage};

/// Generation settings applied to one outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub model: String,
    /// `None` omits the field entirely (the connection probe does this).
    pub temperature: Option<f64>,
    pub max_tokens: u32,
    /// Only honored by the Responses API, and only when non-empty after trimming.
    pub reasoning_effort: Option<String>,
}

/// Chat-completions request wire type.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionsBody<'a> {
    pub model: &'a str,
    pub messages: &'a [RequestMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    pub max_tokens: u32,
}

/// Responses API request wire type.
#[derive(Debug, Clone, Serialize)]
pub struct ResponsesBody<'a> {
    pub model: &'a str,
    pub input: Vec<RequestMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    pub max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ReasoningConfig<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReasoningConfig<'a> {
    pub effort: &'a str,
}

/// Outbound request body for either protocol variant.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RequestBody<'a> {
    ChatCompletions(ChatCompletionsBody<'a>),
    Responses(ResponsesBody<'a>),
}

/// Build the request body for `variant`.
///
/// All per-protocol differences live here: the Responses API rewrites
/// `system` to `developer`, renames the token limit to `max_output_tokens`,
/// and may carry a `reasoning` block.
#[must_use]
pub fn build_request_body<'a>(
    variant: ProtocolVariant,
    messages: &'a [RequestMessage],
    params: &'a GenerationParams,
) -> RequestBody<'a> {
    match variant {
        ProtocolVariant::ChatCompletions => RequestBody::ChatCompletions(ChatCompletionsBody {
            model: &params.model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        }),
        ProtocolVariant::ResponsesApi => {
            let input = messages
                .iter()
                .map(|message| RequestMessage {
                    role: message.role.for_responses_api(),
                    content: message.content.clone(),
                })
                .collect();
            let reasoning = params
                .reasoning_effort
                .as_deref()
                .map(str::trim)
                .filter(|effort| !effort.is_empty())
                .map(|effort| ReasoningConfig { effort });
            RequestBody::Responses(ResponsesBody {
                model: &params.model,
                input,
                temperature: params.temperature,
                max_output_tokens: params.max_tokens,
                reasoning,
            })
        }
    }
}

/// Build and serialize the request body in one step.
///
/// # Errors
///
/// Returns [`RelayError::InvalidRequest`] when serialization fails (for
/// example a non-finite temperature).
pub fn encode_request_body(
    variant: ProtocolVariant,
    messages: &[RequestMessage],
    params: &GenerationParams,
) -> Result<Bytes, RelayError> {
    let body = build_request_body(variant, messages, params);
    serde_json::to_vec(&body)
        .map(Bytes::from)
        .map_err(|err| RelayError::InvalidRequest(format!("failed to encode request body: {err}")))
}
