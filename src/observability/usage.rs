use std::time::Duration;

use serde_json::Value;
use tracing::info;

/// Token counts reported by the upstream, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallUsage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// Rough token estimate (`bytes / 4`), used when the upstream reports nothing.
#[must_use]
pub fn estimate_tokens(text: &str) -> u64 {
    (text.len() as u64).div_ceil(4)
}

/// Read the `usage` object from a reply document.
///
/// Understands both spellings: `input_tokens`/`output_tokens` (Responses API)
/// and `prompt_tokens`/`completion_tokens` (chat completions).
#[must_use]
pub fn usage_from_document(doc: &Value) -> CallUsage {
    let Some(usage) = doc.get("usage") else {
        return CallUsage::default();
    };
    let field = |primary: &str, legacy: &str| {
        usage
            .get(primary)
            .and_then(Value::as_u64)
            .or_else(|| usage.get(legacy).and_then(Value::as_u64))
    };
    CallUsage {
        input_tokens: field("input_tokens", "prompt_tokens"),
        output_tokens: field("output_tokens", "completion_tokens"),
    }
}

/// Log one completed upstream call.
pub fn log_call_usage(
    model: &str,
    protocol: &str,
    usage: CallUsage,
    output_text: &str,
    elapsed: Duration,
) {
    let output_tokens = usage
        .output_tokens
        .unwrap_or_else(|| estimate_tokens(output_text));
    info!(
        model,
        protocol,
        input_tokens = usage.input_tokens.unwrap_or(0),
        output_tokens,
        estimated = usage.output_tokens.is_none(),
        output_chars = output_text.chars().count(),
        elapsed_ms = elapsed.as_millis() as u64,
        "llm call complete"
    );
}
