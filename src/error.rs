use serde_json::{json, Value};

/// Crate-wide error type. Every call produces exactly one of these or a result.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("API not configured: {0}")]
    NotConfigured(String),
    #[error("Auth error: {0}")]
    Auth(String),
    #[error("Transport error: {0}")]
    Transport(String),
    /// Non-2xx upstream status. `message` already carries the `HTTP {status}` prefix.
    #[error("{message}")]
    UpstreamHttp { status: u16, message: String },
    /// An `error` event arrived in the middle of an SSE stream.
    #[error("{0}")]
    UpstreamStream(String),
    #[error("Upstream response has no readable body stream")]
    StreamUnavailable,
    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),
    #[error("Upstream stream ended without a completed response or any output text")]
    EmptyStream,
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        RelayError::Transport(err.to_string())
    }
}

impl From<std::convert::Infallible> for RelayError {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

/// Broad error category for status code selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InvalidRequest,
    Authentication,
    Permission,
    RateLimit,
    /// Any other upstream 4xx; the relay answers with the same status.
    UpstreamClient(u16),
    Upstream,
    Unknown,
}

/// Map an upstream HTTP status code to an error category.
#[must_use]
pub fn category_from_upstream_status(status: u16) -> ErrorCategory {
    match status {
        400 => ErrorCategory::InvalidRequest,
        401 => ErrorCategory::Authentication,
        403 => ErrorCategory::Permission,
        429 => ErrorCategory::RateLimit,
        402..=499 => ErrorCategory::UpstreamClient(status),
        500..=599 => ErrorCategory::Upstream,
        _ => ErrorCategory::Unknown,
    }
}

impl RelayError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            RelayError::InvalidRequest(_) | RelayError::NotConfigured(_) => {
                ErrorCategory::InvalidRequest
            }
            RelayError::Auth(_) => ErrorCategory::Authentication,
            RelayError::Transport(_)
            | RelayError::UpstreamStream(_)
            | RelayError::StreamUnavailable
            | RelayError::InvalidResponse(_)
            | RelayError::EmptyStream => ErrorCategory::Upstream,
            RelayError::UpstreamHttp { status, .. } => category_from_upstream_status(*status),
        }
    }

    /// Upstream status code, when the failure came from a non-2xx reply.
    #[must_use]
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            RelayError::UpstreamHttp { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn http_status_for_category(cat: ErrorCategory) -> http::StatusCode {
    match cat {
        ErrorCategory::InvalidRequest => http::StatusCode::BAD_REQUEST,
        ErrorCategory::Authentication => http::StatusCode::UNAUTHORIZED,
        ErrorCategory::Permission => http::StatusCode::FORBIDDEN,
        ErrorCategory::RateLimit => http::StatusCode::TOO_MANY_REQUESTS,
        ErrorCategory::UpstreamClient(status) => http::StatusCode::from_u16(status)
            .unwrap_or(http::StatusCode::BAD_GATEWAY),
        ErrorCategory::Upstream => http::StatusCode::BAD_GATEWAY,
        ErrorCategory::Unknown => http::StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Format an error as the relay's failure envelope, returning (`status_code`, JSON body).
///
/// The body mirrors what the extension's background worker replies with:
/// `{"success": false, "error": "...", "status": 401}` where `status` is only
/// present for upstream HTTP failures.
#[must_use]
pub fn format_error(err: &RelayError) -> (http::StatusCode, Value) {
    let status = http_status_for_category(err.category());
    let mut body = json!({
        "success": false,
        "error": err.to_string(),
    });
    if let (Some(upstream_status), Some(obj)) = (err.upstream_status(), body.as_object_mut()) {
        obj.insert("status".to_string(), Value::from(upstream_status));
    }
    (status, body)
}

impl axum::response::IntoResponse for RelayError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = format_error(&self);
        (status, axum::Json(body)).into_response()
    }
}
