use serde_json::Value;

use super::sse::SseFrame;
use super::StreamEvent;

pub const EVENT_OUTPUT_TEXT_DELTA: &str = "response.output_text.delta";
pub const EVENT_OUTPUT_TEXT_DONE: &str = "response.output_text.done";
pub const EVENT_COMPLETED: &str = "response.completed";
pub const EVENT_ERROR: &str = "error";

const DONE_SENTINEL: &str = "[DONE]";
const FALLBACK_ERROR_MESSAGE: &str = "upstream stream reported an error event";

/// Classify one flushed frame into at most one [`StreamEvent`].
///
/// Returns `None` for heartbeats (blank payloads), unknown event names, and
/// known events whose payload lacks the required field. A `[DONE]` payload
/// yields [`StreamEvent::Terminator`].
#[must_use]
pub fn classify_frame(frame: &SseFrame) -> Option<StreamEvent> {
    let data = frame.data.trim();
    if data.is_empty() {
        return None;
    }
    if data == DONE_SENTINEL {
        return Some(StreamEvent::Terminator);
    }

    // Unparseable payloads stay opaque; dispatch then relies on the event name.
    let payload: Option<Value> = serde_json::from_str(data).ok();
    let name = frame
        .event
        .as_deref()
        .filter(|name| !name.is_empty())
        .or_else(|| payload.as_ref()?.get("type")?.as_str())
        .unwrap_or("");

    match name {
        EVENT_OUTPUT_TEXT_DELTA => {
            let payload = payload.as_ref()?;
            let delta = payload.get("delta")?.as_str()?;
            Some(StreamEvent::TextDelta {
                item_id: item_id(payload),
                content_index: content_index(payload),
                delta: delta.to_string(),
            })
        }
        EVENT_OUTPUT_TEXT_DONE => {
            let payload = payload.as_ref()?;
            let text = payload.get("text")?.as_str()?;
            Some(StreamEvent::TextDone {
                item_id: item_id(payload),
                content_index: content_index(payload),
                text: text.to_string(),
            })
        }
        EVENT_COMPLETED => {
            let response = payload
                .as_ref()
                .and_then(|payload| payload.get("response"))
                .and_then(Value::as_object)
                .cloned();
            Some(StreamEvent::Completed { response })
        }
        EVENT_ERROR => Some(StreamEvent::Error {
            message: error_message(payload.as_ref()),
        }),
        other => {
            tracing::trace!(event = other, "ignoring unrecognized stream event");
            None
        }
    }
}

fn item_id(payload: &Value) -> Option<String> {
    payload
        .get("item_id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(ToString::to_string)
}

fn content_index(payload: &Value) -> Option<u64> {
    payload.get("content_index").and_then(Value::as_u64)
}

fn error_message(payload: Option<&Value>) -> String {
    let non_blank = |value: Option<&Value>| {
        value
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .map(ToString::to_string)
    };
    let Some(payload) = payload else {
        return FALLBACK_ERROR_MESSAGE.to_string();
    };
    non_blank(payload.get("error").and_then(|error| error.get("message")))
        .or_else(|| non_blank(payload.get("message")))
        .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(event: Option<&str>, data: &str) -> SseFrame {
        SseFrame {
            event: event.map(ToString::to_string),
            data: data.to_string(),
        }
    }

    #[test]
    fn test_delta_from_type_field() {
        let event = classify_frame(&frame(
            None,
            r#"{"type":"response.output_text.delta","item_id":"msg_1","content_index":0,"delta":"He"}"#,
        ));
        assert_eq!(
            event,
            Some(StreamEvent::TextDelta {
                item_id: Some("msg_1".to_string()),
                content_index: Some(0),
                delta: "He".to_string(),
            })
        );
    }

    #[test]
    fn test_event_name_takes_precedence_over_type() {
        let event = classify_frame(&frame(
            Some("response.output_text.done"),
            r#"{"type":"response.output_text.delta","text":"Hello","delta":"x"}"#,
        ));
        assert_eq!(
            event,
            Some(StreamEvent::TextDone {
                item_id: None,
                content_index: None,
                text: "Hello".to_string(),
            })
        );
    }

    #[test]
    fn test_delta_without_string_field_is_dropped() {
        assert_eq!(
            classify_frame(&frame(
                Some("response.output_text.delta"),
                r#"{"delta":42}"#
            )),
            None
        );
    }

    #[test]
    fn test_heartbeat_and_sentinel() {
        assert_eq!(classify_frame(&frame(None, "   ")), None);
        assert_eq!(
            classify_frame(&frame(None, " [DONE] ")),
            Some(StreamEvent::Terminator)
        );
    }

    #[test]
    fn test_unknown_events_are_ignored() {
        assert_eq!(
            classify_frame(&frame(None, r#"{"type":"response.in_progress"}"#)),
            None
        );
        assert_eq!(classify_frame(&frame(None, "not json at all")), None);
    }

    #[test]
    fn test_completed_keeps_response_object() {
        let event = classify_frame(&frame(
            Some("response.completed"),
            r#"{"type":"response.completed","response":{"id":"resp_1","status":"completed"}}"#,
        ));
        let Some(StreamEvent::Completed { response: Some(doc) }) = event else {
            panic!("expected completed event with document, got {event:?}");
        };
        assert_eq!(doc.get("id"), Some(&json!("resp_1")));
    }

    #[test]
    fn test_completed_with_non_object_response() {
        assert_eq!(
            classify_frame(&frame(Some("response.completed"), r#"{"response":"oops"}"#)),
            Some(StreamEvent::Completed { response: None })
        );
        assert_eq!(
            classify_frame(&frame(Some("response.completed"), "garbage")),
            Some(StreamEvent::Completed { response: None })
        );
    }

    #[test]
    fn test_error_message_precedence() {
        let nested = classify_frame(&frame(
            Some("error"),
            r#"{"error":{"message":"  rate limited  "},"message":"outer"}"#,
        ));
        assert_eq!(
            nested,
            Some(StreamEvent::Error {
                message: "rate limited".to_string()
            })
        );

        let flat = classify_frame(&frame(None, r#"{"type":"error","message":"boom"}"#));
        assert_eq!(
            flat,
            Some(StreamEvent::Error {
                message: "boom".to_string()
            })
        );

        let opaque = classify_frame(&frame(Some("error"), "not json"));
        assert_eq!(
            opaque,
            Some(StreamEvent::Error {
                message: FALLBACK_ERROR_MESSAGE.to_string()
            })
        );
    }
}
