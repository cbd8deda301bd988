use http::StatusCode;
use serde_json::Value;

use crate::error::RelayError;

use super::UpstreamResponse;

const ERROR_BODY_MAX_CHARS: usize = 2000;
// Enough bytes for the character cap plus one more character.
const ERROR_BODY_MAX_BYTES: usize = (ERROR_BODY_MAX_CHARS + 1) * 4;

/// Turn a non-2xx upstream reply into [`RelayError::UpstreamHttp`].
///
/// Only the start of the body is read. Body read failures are not fatal here;
/// the message then falls back to the status line.
pub async fn upstream_http_error(response: UpstreamResponse) -> RelayError {
    let status = response.status();
    let body = match response.text_prefix(ERROR_BODY_MAX_BYTES).await {
        Ok(body) => body,
        Err(err) => {
            tracing::debug!(status = status.as_u16(), error = %err, "failed to read upstream error body");
            String::new()
        }
    };
    RelayError::UpstreamHttp {
        status: status.as_u16(),
        message: format_upstream_error(status, &body),
    }
}

/// Build the `HTTP {status}: {message}` text for a failed upstream reply.
///
/// The body is capped at 2000 characters (with `...` appended when cut). The
/// message is the JSON `error.message`, then the JSON `message`, then the
/// raw text, then the reason phrase.
#[must_use]
pub fn format_upstream_error(status: StatusCode, body: &str) -> String {
    let text = truncate_chars(body, ERROR_BODY_MAX_CHARS);
    let parsed: Option<Value> = if text.is_empty() {
        None
    } else {
        serde_json::from_str(&text).ok()
    };

    let non_empty_str = |value: Option<&Value>| {
        value
            .and_then(Value::as_str)
            .filter(|message| !message.is_empty())
            .map(ToString::to_string)
    };

    let message = parsed
        .as_ref()
        .and_then(|json| {
            non_empty_str(json.get("error").and_then(|error| error.get("message")))
                .or_else(|| non_empty_str(json.get("message")))
        })
        .or_else(|| (!text.is_empty()).then(|| text.clone()))
        .or_else(|| status.canonical_reason().map(ToString::to_string))
        .unwrap_or_default();

    if message.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("HTTP {}: {message}", status.as_u16())
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + 3);
            out.push_str(&text[..cut]);
            out.push_str("...");
            out
        }
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_nested_error_message() {
        let body = r#"{"error":{"message":"Incorrect API key"},"message":"outer"}"#;
        assert_eq!(
            format_upstream_error(StatusCode::UNAUTHORIZED, body),
            "HTTP 401: Incorrect API key"
        );
    }

    #[test]
    fn test_falls_back_to_top_level_message() {
        let body = r#"{"message":"model not found"}"#;
        assert_eq!(
            format_upstream_error(StatusCode::NOT_FOUND, body),
            "HTTP 404: model not found"
        );
    }

    #[test]
    fn test_falls_back_to_raw_text() {
        assert_eq!(
            format_upstream_error(StatusCode::BAD_GATEWAY, "upstream exploded"),
            "HTTP 502: upstream exploded"
        );
        // JSON without a usable message keeps the raw JSON text.
        assert_eq!(
            format_upstream_error(StatusCode::BAD_REQUEST, r#"{"code":7}"#),
            "HTTP 400: {\"code\":7}"
        );
    }

    #[test]
    fn test_falls_back_to_reason_phrase() {
        assert_eq!(
            format_upstream_error(StatusCode::TOO_MANY_REQUESTS, ""),
            "HTTP 429: Too Many Requests"
        );
    }

    #[test]
    fn test_no_reason_phrase_gives_bare_status() {
        let status = StatusCode::from_u16(599).unwrap();
        assert_eq!(format_upstream_error(status, ""), "HTTP 599");
    }

    #[test]
    fn test_long_body_is_truncated_by_characters() {
        let body = "é".repeat(2500);
        let message = format_upstream_error(StatusCode::INTERNAL_SERVER_ERROR, &body);
        let expected = format!("HTTP 500: {}...", "é".repeat(2000));
        assert_eq!(message, expected);
    }

    #[tokio::test]
    async fn test_huge_error_body_is_read_only_up_to_cap() {
        let chunks = vec![bytes::Bytes::from(vec![b'x'; 4096]); 64];
        let response = UpstreamResponse::from_chunks(StatusCode::BAD_GATEWAY, "text/plain", chunks);
        let err = upstream_http_error(response).await;
        let expected = format!("HTTP 502: {}...", "x".repeat(2000));
        assert_eq!(err.to_string(), expected);
    }

    #[tokio::test]
    async fn test_upstream_http_error_from_response() {
        let response = UpstreamResponse::from_chunks(
            StatusCode::FORBIDDEN,
            "application/json",
            vec![bytes::Bytes::from_static(br#"{"error":{"message":"denied"}}"#)],
        );
        let err = upstream_http_error(response).await;
        match err {
            RelayError::UpstreamHttp { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "HTTP 403: denied");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
