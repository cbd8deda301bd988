pub mod canonical;
pub mod request;
pub mod responses;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use canonical::{CanonicalResult, Document, UpstreamResult};
pub use request::{build_request_body, encode_request_body, GenerationParams, RequestBody};
pub use responses::{extract_response_text, is_event_stream_content_type};

/// Conversation role of a [`RequestMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Developer,
}

impl Role {
    /// The Responses API has no `system` role; instructions go in as `developer`.
    #[must_use]
    pub fn for_responses_api(self) -> Self {
        match self {
            Role::System => Role::Developer,
            other => other,
        }
    }
}

/// One chronological entry of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMessage {
    pub role: Role,
    pub content: String,
}

impl RequestMessage {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Which upstream protocol a call speaks. Selects both the request-body shape
/// and the response-parsing path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProtocolVariant {
    #[default]
    #[serde(rename = "openai_compatible", alias = "chat_completions")]
    ChatCompletions,
    #[serde(rename = "openai_responses", alias = "responses_api")]
    ResponsesApi,
}

impl ProtocolVariant {
    /// Lenient parse used for values read from the settings store.
    ///
    /// Anything that is not a Responses API spelling falls back to chat completions.
    #[must_use]
    pub fn from_setting(value: &str) -> Self {
        match value.trim() {
            "openai_responses" | "responses_api" => ProtocolVariant::ResponsesApi,
            _ => ProtocolVariant::ChatCompletions,
        }
    }

    #[must_use]
    pub fn as_setting(self) -> &'static str {
        match self {
            ProtocolVariant::ChatCompletions => "openai_compatible",
            ProtocolVariant::ResponsesApi => "openai_responses",
        }
    }
}

impl fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_setting())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_variant_serde_spellings() {
        let variant: ProtocolVariant = serde_json::from_str("\"openai_responses\"").unwrap();
        assert_eq!(variant, ProtocolVariant::ResponsesApi);
        let variant: ProtocolVariant = serde_json::from_str("\"chat_completions\"").unwrap();
        assert_eq!(variant, ProtocolVariant::ChatCompletions);
        assert_eq!(
            serde_json::to_string(&ProtocolVariant::ChatCompletions).unwrap(),
            "\"openai_compatible\""
        );
    }

    #[test]
    fn test_protocol_variant_from_setting_is_lenient() {
        assert_eq!(
            ProtocolVariant::from_setting(" responses_api "),
            ProtocolVariant::ResponsesApi
        );
        assert_eq!(
            ProtocolVariant::from_setting("something-else"),
            ProtocolVariant::ChatCompletions
        );
        assert_eq!(
            ProtocolVariant::from_setting(""),
            ProtocolVariant::ChatCompletions
        );
    }

    #[test]
    fn test_role_rewrite_only_touches_system() {
        assert_eq!(Role::System.for_responses_api(), Role::Developer);
        assert_eq!(Role::User.for_responses_api(), Role::User);
        assert_eq!(Role::Assistant.for_responses_api(), Role::Assistant);
        assert_eq!(Role::Developer.for_responses_api(), Role::Developer);
    }
}
