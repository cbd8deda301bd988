pub mod classify;
pub mod sse;

pub use classify::classify_frame;
pub use sse::{SseFrame, SseParser, Utf8ChunkDecoder};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use smallvec::SmallVec;

use crate::error::RelayError;
use crate::protocol::Document;

/// A typed event decoded from a Responses API SSE stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Incremental text for one output part.
    TextDelta {
        item_id: Option<String>,
        content_index: Option<u64>,
        delta: String,
    },
    /// Full text of one output part, echoed once the part is finished.
    TextDone {
        item_id: Option<String>,
        content_index: Option<u64>,
        text: String,
    },
    /// End of response, carrying the full response document when it was an object.
    Completed { response: Option<Document> },
    /// Upstream error reported in-band.
    Error { message: String },
    /// Explicit `[DONE]` sentinel. [`decode_stream`] ends on it without yielding it.
    Terminator,
}

impl StreamEvent {
    /// Events after which the decoder stops reading.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamEvent::Completed { .. } | StreamEvent::Error { .. } | StreamEvent::Terminator
        )
    }

    /// Identity of the output part a text event belongs to.
    #[must_use]
    pub fn part_key(&self) -> Option<PartKey> {
        match self {
            StreamEvent::TextDelta {
                item_id,
                content_index,
                ..
            }
            | StreamEvent::TextDone {
                item_id,
                content_index,
                ..
            } => PartKey::new(item_id.as_deref(), *content_index),
            _ => None,
        }
    }
}

/// `(item_id, content_index)` identity of one output part.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartKey {
    item_id: String,
    content_index: Option<u64>,
}

impl PartKey {
    /// Returns `None` for anonymous parts (neither identifier present).
    #[must_use]
    pub fn new(item_id: Option<&str>, content_index: Option<u64>) -> Option<Self> {
        let item_id = item_id.unwrap_or_default();
        if item_id.is_empty() && content_index.is_none() {
            return None;
        }
        Some(Self {
            item_id: item_id.to_string(),
            content_index,
        })
    }
}

// ---------------------------------------------------------------------------
// EventDecoder — synchronous bytes -> StreamEvent core
// ---------------------------------------------------------------------------

/// Push-based decoder from raw SSE bytes to [`StreamEvent`]s.
///
/// Owns every piece of per-stream state: the UTF-8 carry-over, the line
/// buffer, the current event name and pending data lines. Once a terminal
/// event or `[DONE]` is seen, further input is ignored.
#[derive(Debug, Default)]
pub struct EventDecoder {
    utf8: Utf8ChunkDecoder,
    parser: SseParser,
    text: String,
    frames: Vec<SseFrame>,
    stopped: bool,
}

impl EventDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the decoder has seen a terminal event, `[DONE]`, or end of input.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Decode one chunk and append the resulting events to `out`.
    pub fn push(&mut self, chunk: &[u8], out: &mut Vec<StreamEvent>) {
        if self.stopped {
            return;
        }
        self.text.clear();
        self.utf8.decode_into(chunk, &mut self.text);
        self.parser.feed_into(&self.text, &mut self.frames);
        self.drain_frames(out);
    }

    /// Signal end of input: flush any pending frame, then stop.
    pub fn finish(&mut self, out: &mut Vec<StreamEvent>) {
        if self.stopped {
            return;
        }
        self.text.clear();
        self.utf8.finish_into(&mut self.text);
        self.parser.feed_into(&self.text, &mut self.frames);
        self.parser.finish_into(&mut self.frames);
        self.drain_frames(out);
        self.stopped = true;
    }

    fn drain_frames(&mut self, out: &mut Vec<StreamEvent>) {
        for frame in self.frames.drain(..) {
            if self.stopped {
                continue;
            }
            match classify_frame(&frame) {
                None => {}
                Some(StreamEvent::Terminator) => {
                    tracing::debug!("stream sentinel received, stop decoding");
                    self.stopped = true;
                }
                Some(event) => {
                    self.stopped = event.is_terminal();
                    out.push(event);
                }
            }
        }
    }
}

/// Decode a complete in-memory body, chunk by chunk.
#[must_use]
pub fn decode_chunks<'a, I>(chunks: I) -> Vec<StreamEvent>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut decoder = EventDecoder::new();
    let mut out = Vec::new();
    for chunk in chunks {
        if decoder.is_stopped() {
            break;
        }
        decoder.push(chunk, &mut out);
    }
    decoder.finish(&mut out);
    out
}

// ---------------------------------------------------------------------------
// Stream adapter
// ---------------------------------------------------------------------------

struct PendingEvents {
    events: SmallVec<[StreamEvent; 8]>,
    head: usize,
}

impl PendingEvents {
    #[inline]
    fn new() -> Self {
        Self {
            events: SmallVec::new(),
            head: 0,
        }
    }

    #[inline]
    fn pop_front(&mut self) -> Option<StreamEvent> {
        if self.head >= self.events.len() {
            return None;
        }
        let event = std::mem::replace(&mut self.events[self.head], StreamEvent::Terminator);
        self.head += 1;
        if self.head == self.events.len() {
            self.events.clear();
            self.head = 0;
        }
        Some(event)
    }

    #[inline]
    fn extend_from_vec(&mut self, parsed: &mut Vec<StreamEvent>) {
        if parsed.is_empty() {
            return;
        }
        self.events.reserve(parsed.len());
        self.events.extend(parsed.drain(..));
    }
}

struct DecodeState<S> {
    source: Option<std::pin::Pin<Box<S>>>,
    decoder: EventDecoder,
    parsed: Vec<StreamEvent>,
    pending: PendingEvents,
}

/// Turn an SSE byte stream into a lazy stream of [`StreamEvent`]s.
///
/// The source is polled only when no decoded event is waiting, so events are
/// yielded at frame boundaries and decoding runs at the pace of the
/// transport. The source is dropped as soon as a terminal event, `[DONE]`, or
/// a read error is seen; dropping the returned stream drops it too. A read
/// error is yielded once as [`RelayError`] and ends the stream.
pub fn decode_stream<S, E>(
    byte_stream: S,
) -> impl Stream<Item = Result<StreamEvent, RelayError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<RelayError> + Send + 'static,
{
    let state = DecodeState {
        source: Some(Box::pin(byte_stream)),
        decoder: EventDecoder::new(),
        parsed: Vec::with_capacity(8),
        pending: PendingEvents::new(),
    };

    futures_util::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((Ok(event), state));
            }

            let source = state.source.as_mut()?;
            match source.next().await {
                Some(Ok(chunk)) => state.decoder.push(&chunk, &mut state.parsed),
                Some(Err(err)) => {
                    state.source = None;
                    let err: RelayError = err.into();
                    let err = match err {
                        RelayError::Transport(message) => RelayError::Transport(format!(
                            "failed to read upstream stream: {message}"
                        )),
                        other => other,
                    };
                    return Some((Err(err), state));
                }
                None => state.decoder.finish(&mut state.parsed),
            }

            if state.decoder.is_stopped() {
                state.source = None;
            }
            state.pending.extend_from_vec(&mut state.parsed);
        }
    })
}
