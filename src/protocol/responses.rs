use serde_json::Value;

use super::Document;

const EVENT_STREAM_MIME: &str = "text/event-stream";

/// Extract the assistant text from a Responses API document.
///
/// A non-empty top-level `output_text` wins. Otherwise the `text` of every
/// `output_text` content part inside `message` output items is concatenated
/// in encounter order.
#[must_use]
pub fn extract_response_text(doc: &Document) -> String {
    if let Some(text) = doc.get("output_text").and_then(Value::as_str) {
        if !text.is_empty() {
            return text.to_string();
        }
    }

    let Some(items) = doc.get("output").and_then(Value::as_array) else {
        return String::new();
    };

    let mut out = String::new();
    for item in items {
        if item.get("type").and_then(Value::as_str) != Some("message") {
            continue;
        }
        let Some(parts) = item.get("content").and_then(Value::as_array) else {
            continue;
        };
        for part in parts {
            if part.get("type").and_then(Value::as_str) != Some("output_text") {
                continue;
            }
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                out.push_str(text);
            }
        }
    }
    out
}

/// Whether a `Content-Type` header value announces an SSE body.
#[must_use]
pub fn is_event_stream_content_type(content_type: &str) -> bool {
    content_type
        .as_bytes()
        .windows(EVENT_STREAM_MIME.len())
        .any(|window| window.eq_ignore_ascii_case(EVENT_STREAM_MIME.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_extract_concatenates_output_text_parts() {
        let d = doc(json!({
            "output": [{
                "type": "message",
                "content": [
                    {"type": "output_text", "text": "A"},
                    {"type": "output_text", "text": "B"}
                ]
            }]
        }));
        assert_eq!(extract_response_text(&d), "AB");
    }

    #[test]
    fn test_extract_prefers_top_level_output_text() {
        let d = doc(json!({
            "output_text": "direct",
            "output": [{"type": "message", "content": [{"type": "output_text", "text": "x"}]}]
        }));
        assert_eq!(extract_response_text(&d), "direct");
    }

    #[test]
    fn test_extract_ignores_empty_top_level_and_non_message_items() {
        let d = doc(json!({
            "output_text": "",
            "output": [
                {"type": "reasoning", "content": [{"type": "output_text", "text": "hidden"}]},
                {"type": "message", "content": [
                    {"type": "refusal", "refusal": "no"},
                    {"type": "output_text", "text": "one"},
                    {"type": "output_text", "text": 7}
                ]},
                {"type": "message", "content": "not-an-array"},
                {"type": "message", "content": [{"type": "output_text", "text": "two"}]}
            ]
        }));
        assert_eq!(extract_response_text(&d), "onetwo");
    }

    #[test]
    fn test_extract_without_output_is_empty() {
        assert_eq!(extract_response_text(&Document::new()), "");
    }

    #[test]
    fn test_event_stream_content_type_detection() {
        assert!(is_event_stream_content_type("text/event-stream"));
        assert!(is_event_stream_content_type("Text/Event-Stream; charset=utf-8"));
        assert!(!is_event_stream_content_type("application/json"));
        assert!(!is_event_stream_content_type(""));
    }
}
