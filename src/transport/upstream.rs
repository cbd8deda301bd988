use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt, TryStreamExt};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, StatusCode};

use crate::error::RelayError;
use crate::protocol::is_event_stream_content_type;

/// Boxed upstream body stream.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, RelayError>> + Send>>;

/// Descriptor of an upstream HTTP reply.
///
/// The body can be consumed exactly once, either read whole with
/// [`UpstreamResponse::text`] / [`UpstreamResponse::bytes`] or streamed with
/// [`UpstreamResponse::into_byte_stream`]. All three take `self`.
pub struct UpstreamResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<ByteStream>,
}

impl std::fmt::Debug for UpstreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

impl UpstreamResponse {
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: Option<ByteStream>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Wrap a reqwest response without touching its body.
    #[must_use]
    pub fn from_reqwest(response: reqwest::Response) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let body: ByteStream = Box::pin(response.bytes_stream().map_err(RelayError::from));
        Self::new(status, headers, Some(body))
    }

    /// Build a response whose body replays in-memory chunks.
    #[must_use]
    pub fn from_chunks(status: StatusCode, content_type: &str, chunks: Vec<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        if let Ok(value) = http::HeaderValue::from_str(content_type) {
            headers.insert(CONTENT_TYPE, value);
        }
        let body: ByteStream = Box::pin(futures_util::stream::iter(
            chunks.into_iter().map(Ok::<Bytes, RelayError>),
        ));
        Self::new(status, headers, Some(body))
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Look up a header as text; non-UTF-8 values read as absent.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE.as_str())
    }

    #[must_use]
    pub fn is_event_stream(&self) -> bool {
        self.content_type()
            .is_some_and(is_event_stream_content_type)
    }

    /// Read the whole body. A missing body reads as empty.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Transport`] when reading the body fails.
    pub async fn bytes(self) -> Result<Bytes, RelayError> {
        let Some(mut body) = self.body else {
            return Ok(Bytes::new());
        };
        let mut buf = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// Read the whole body as text, replacing invalid UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Transport`] when reading the body fails.
    pub async fn text(self) -> Result<String, RelayError> {
        self.text_prefix(usize::MAX).await
    }

    /// Read at most about `max_bytes` of the body as text and drop the rest
    /// unread. The chunk that crosses the limit is kept whole.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Transport`] when reading the body fails.
    pub async fn text_prefix(self, max_bytes: usize) -> Result<String, RelayError> {
        let Some(mut body) = self.body else {
            return Ok(String::new());
        };
        let mut buf = BytesMut::new();
        while buf.len() < max_bytes {
            match body.next().await {
                Some(chunk) => buf.extend_from_slice(&chunk?),
                None => break,
            }
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Take the body as a byte stream.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::StreamUnavailable`] when the response has no body.
    pub fn into_byte_stream(self) -> Result<ByteStream, RelayError> {
        self.body.ok_or(RelayError::StreamUnavailable)
    }
}
