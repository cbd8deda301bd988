use std::time::Instant;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RelayError;
use crate::normalize::parse_response;
use crate::observability::log_call_complete;
use crate::protocol::{
    encode_request_body, GenerationParams, ProtocolVariant, RequestMessage, Role, UpstreamResult,
};
use crate::settings::LlmSettings;
use crate::transport::{upstream_http_error, HttpTransport, UpstreamResponse};

const PROBE_PROMPT: &str = "Say OK";
const PROBE_MAX_TOKENS: u32 = 10;

/// One conversation to send upstream, with optional per-call overrides.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmRequest {
    pub messages: Vec<RequestMessage>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default, alias = "max_tokens")]
    pub max_tokens: Option<u32>,
}

/// Parameters of a connection test. These are supplied by the caller and do
/// not touch the settings store, so unsaved settings can be tried out.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProbe {
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub model: String,
    #[serde(default)]
    pub api_protocol: Option<String>,
    #[serde(default)]
    pub reasoning_effort: Option<String>,
}

impl ConnectionProbe {
    fn protocol(&self) -> ProtocolVariant {
        self.api_protocol
            .as_deref()
            .map(ProtocolVariant::from_setting)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeOutcome {
    pub success: bool,
    pub message: String,
}

/// Performs upstream LLM calls: build the body, exchange, normalize.
#[derive(Clone)]
pub struct LlmClient {
    transport: HttpTransport,
}

impl LlmClient {
    #[must_use]
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    /// Send one conversation and return the reply in chat-completion shape.
    ///
    /// # Errors
    ///
    /// - [`RelayError::InvalidRequest`] when `request` has no messages.
    /// - [`RelayError::NotConfigured`] when endpoint, key or model is missing.
    /// - [`RelayError::UpstreamHttp`] for a non-2xx upstream status.
    /// - Any error from [`parse_response`].
    pub async fn complete(
        &self,
        settings: &LlmSettings,
        request: &LlmRequest,
    ) -> Result<Value, RelayError> {
        if request.messages.is_empty() {
            return Err(RelayError::InvalidRequest(
                "messages must be a non-empty array".to_string(),
            ));
        }
        settings.ensure_configured()?;

        let params = GenerationParams {
            model: settings.model_name.clone(),
            temperature: Some(request.temperature.unwrap_or(settings.temperature)),
            max_tokens: request.max_tokens.unwrap_or(settings.max_tokens),
            reasoning_effort: settings.reasoning_effort.clone(),
        };
        let start = Instant::now();
        let result = self
            .exchange(
                &settings.api_endpoint,
                Some(&settings.api_key),
                settings.protocol,
                &request.messages,
                &params,
            )
            .await?;

        let reply = result.into_chat_completion();
        let text = reply
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default();
        log_call_complete(
            &params.model,
            settings.protocol.as_setting(),
            &reply,
            text,
            start,
        );
        Ok(reply)
    }

    /// Check that an endpoint answers a trivial prompt.
    ///
    /// Never fails: every problem is reported in the outcome's message.
    pub async fn test_connection(&self, probe: &ConnectionProbe) -> ProbeOutcome {
        match self.run_probe(probe).await {
            Ok(()) => ProbeOutcome {
                success: true,
                message: "Connection succeeded".to_string(),
            },
            Err(err) => {
                tracing::info!(endpoint = %probe.endpoint, error = %err, "connection test failed");
                ProbeOutcome {
                    success: false,
                    message: err.to_string(),
                }
            }
        }
    }

    async fn run_probe(&self, probe: &ConnectionProbe) -> Result<(), RelayError> {
        let protocol = probe.protocol();
        let messages = [RequestMessage::new(Role::User, PROBE_PROMPT)];
        let params = GenerationParams {
            model: probe.model.clone(),
            temperature: None,
            max_tokens: PROBE_MAX_TOKENS,
            reasoning_effort: probe.reasoning_effort.clone(),
        };
        let result = self
            .exchange(
                &probe.endpoint,
                probe.api_key.as_deref(),
                protocol,
                &messages,
                &params,
            )
            .await?;

        if result.has_reply() {
            Ok(())
        } else {
            Err(RelayError::InvalidResponse(
                "reply carried no answer".to_string(),
            ))
        }
    }

    /// POST arbitrary JSON to `endpoint` and return the JSON reply untouched.
    ///
    /// # Errors
    ///
    /// [`RelayError::UpstreamHttp`] for a non-2xx status,
    /// [`RelayError::InvalidResponse`] for a non-JSON reply, and transport errors.
    pub async fn forward_json(
        &self,
        endpoint: &str,
        api_key: Option<&str>,
        body: &Value,
    ) -> Result<Value, RelayError> {
        let body = serde_json::to_vec(body)
            .map(Bytes::from)
            .map_err(|err| RelayError::InvalidRequest(format!("failed to encode body: {err}")))?;
        let response = self.transport.post_json(endpoint, api_key, body).await?;
        let response = ensure_success(response).await?;
        // A forwarded reply is read exactly like a chat-completion reply.
        let result = parse_response(response, ProtocolVariant::ChatCompletions).await?;
        Ok(result.into_chat_completion())
    }

    async fn exchange(
        &self,
        endpoint: &str,
        api_key: Option<&str>,
        protocol: ProtocolVariant,
        messages: &[RequestMessage],
        params: &GenerationParams,
    ) -> Result<UpstreamResult, RelayError> {
        let body = encode_request_body(protocol, messages, params)?;
        let response = self.transport.post_json(endpoint, api_key, body).await?;
        let response = ensure_success(response).await?;
        tracing::debug!(
            %protocol,
            content_type = response.content_type().unwrap_or(""),
            "parsing upstream reply"
        );
        parse_response(response, protocol).await
    }
}

async fn ensure_success(response: UpstreamResponse) -> Result<UpstreamResponse, RelayError> {
    if response.is_success() {
        return Ok(response);
    }
    let err = upstream_http_error(response).await;
    tracing::warn!(error = %err, "upstream returned an error status");
    Err(err)
}
