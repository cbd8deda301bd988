use serde_json::{json, Value};

/// An opaque structured JSON object as returned by the upstream.
pub type Document = serde_json::Map<String, Value>;

/// Unified result of a Responses API call, whether it arrived as one document
/// or as an SSE stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalResult {
    /// What the model said. This is the only text consumers should read.
    pub output_text: String,
    /// Whatever extra structured fields the terminal document carried.
    pub raw: Document,
}

impl CanonicalResult {
    #[must_use]
    pub fn new(output_text: impl Into<String>, raw: Document) -> Self {
        Self {
            output_text: output_text.into(),
            raw,
        }
    }

    /// Project into the chat-completion shape older callers expect.
    ///
    /// Returns a shallow copy of `raw` with a `choices` array holding a single
    /// assistant message whose content is `output_text`.
    #[must_use]
    pub fn to_legacy_shape(&self) -> Value {
        legacy_shape(self.raw.clone(), &self.output_text)
    }

    #[must_use]
    pub fn into_legacy_shape(self) -> Value {
        legacy_shape(self.raw, &self.output_text)
    }
}

fn legacy_shape(mut raw: Document, output_text: &str) -> Value {
    raw.insert(
        "choices".to_string(),
        json!([{
            "message": {
                "role": "assistant",
                "content": output_text,
            }
        }]),
    );
    Value::Object(raw)
}

/// Outcome of parsing an upstream reply for a given protocol variant.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamResult {
    /// Chat-completion replies are already in the shape callers expect.
    Passthrough(Value),
    /// Responses API replies folded into one canonical result.
    Normalized(CanonicalResult),
}

impl UpstreamResult {
    /// The chat-completion shaped document handed back to callers.
    #[must_use]
    pub fn into_chat_completion(self) -> Value {
        match self {
            UpstreamResult::Passthrough(doc) => doc,
            UpstreamResult::Normalized(result) => result.into_legacy_shape(),
        }
    }

    /// Whether the reply looks like a usable answer.
    ///
    /// A chat-completion reply needs a first choice; a normalized reply needs
    /// non-empty text.
    #[must_use]
    pub fn has_reply(&self) -> bool {
        match self {
            UpstreamResult::Passthrough(doc) => doc
                .get("choices")
                .and_then(Value::as_array)
                .is_some_and(|choices| !choices.is_empty()),
            UpstreamResult::Normalized(result) => !result.output_text.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_shape_adds_single_assistant_choice() {
        let mut raw = Document::new();
        raw.insert("id".to_string(), json!("r1"));
        let result = CanonicalResult::new("hi", raw);
        assert_eq!(
            result.to_legacy_shape(),
            json!({
                "id": "r1",
                "choices": [{"message": {"role": "assistant", "content": "hi"}}]
            })
        );
        // Derived on demand; the canonical result is untouched.
        assert!(!result.raw.contains_key("choices"));
    }

    #[test]
    fn test_legacy_shape_replaces_existing_choices() {
        let mut raw = Document::new();
        raw.insert("choices".to_string(), json!([1, 2, 3]));
        let shaped = CanonicalResult::new("x", raw).into_legacy_shape();
        assert_eq!(shaped["choices"].as_array().map(Vec::len), Some(1));
        assert_eq!(shaped["choices"][0]["message"]["content"], "x");
    }

    #[test]
    fn test_passthrough_is_returned_untouched() {
        let doc = json!({"choices": [{"message": {"role": "assistant", "content": "pong"}}]});
        let result = UpstreamResult::Passthrough(doc.clone());
        assert!(result.has_reply());
        assert_eq!(result.into_chat_completion(), doc);
    }

    #[test]
    fn test_has_reply_requires_text_for_normalized() {
        let empty = UpstreamResult::Normalized(CanonicalResult::default());
        assert!(!empty.has_reply());
        let passthrough = UpstreamResult::Passthrough(json!({"choices": []}));
        assert!(!passthrough.has_reply());
    }
}
