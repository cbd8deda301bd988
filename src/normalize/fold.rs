use std::ops::ControlFlow;

use futures_util::{Stream, StreamExt};
use rustc_hash::FxHashSet;

use crate::error::RelayError;
use crate::protocol::{extract_response_text, CanonicalResult, Document};
use crate::stream::{PartKey, StreamEvent};

/// Accumulator that folds a [`StreamEvent`] sequence into one [`CanonicalResult`].
///
/// A part's text is taken from its deltas when any arrived, otherwise from
/// its done event, never both. Parts without identifiers share one fallback
/// flag: once any delta was seen, anonymous done events are skipped.
#[derive(Debug, Default)]
pub struct ResponseFold {
    output_text: String,
    parts_with_delta: FxHashSet<PartKey>,
    saw_any_delta: bool,
    document: Option<Document>,
    error: Option<String>,
    stopped: bool,
}

impl ResponseFold {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event. Returns `Break` once the fold has reached a terminal
    /// state; later events are ignored.
    pub fn push(&mut self, event: StreamEvent) -> ControlFlow<()> {
        if self.stopped {
            return ControlFlow::Break(());
        }

        let key = event.part_key();
        match event {
            StreamEvent::TextDelta { delta, .. } => {
                self.output_text.push_str(&delta);
                self.saw_any_delta = true;
                if let Some(key) = key {
                    self.parts_with_delta.insert(key);
                }
            }
            StreamEvent::TextDone { text, .. } => {
                let seen_delta = match &key {
                    Some(key) => self.parts_with_delta.contains(key),
                    None => self.saw_any_delta,
                };
                if seen_delta {
                    tracing::trace!("skipping done text already received as deltas");
                } else {
                    self.output_text.push_str(&text);
                }
            }
            StreamEvent::Completed { response } => {
                if let Some(doc) = response {
                    self.document = Some(doc);
                }
                self.stopped = true;
            }
            StreamEvent::Error { message } => {
                tracing::debug!(%message, "upstream stream reported an error");
                self.error = Some(message);
                self.stopped = true;
            }
            StreamEvent::Terminator => {
                self.stopped = true;
            }
        }

        if self.stopped {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    /// Finish the fold.
    ///
    /// The accumulated text wins when non-empty; otherwise text is extracted
    /// from the completed document.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::UpstreamStream`] when an error event was seen and
    /// [`RelayError::EmptyStream`] when the stream produced neither text nor a
    /// completed document.
    pub fn finish(self) -> Result<CanonicalResult, RelayError> {
        if let Some(message) = self.error {
            return Err(RelayError::UpstreamStream(message));
        }

        let has_document = self.document.is_some();
        let raw = self.document.unwrap_or_default();
        let output_text = if self.output_text.is_empty() {
            extract_response_text(&raw)
        } else {
            self.output_text
        };

        if output_text.is_empty() && !has_document {
            return Err(RelayError::EmptyStream);
        }
        Ok(CanonicalResult { output_text, raw })
    }
}

/// Drive an event stream to completion through a [`ResponseFold`].
///
/// Stops pulling as soon as the fold reaches a terminal state, which drops
/// the rest of the stream and its source.
///
/// # Errors
///
/// Propagates decode/transport errors from the stream and the errors of
/// [`ResponseFold::finish`].
pub async fn fold_stream<S>(events: S) -> Result<CanonicalResult, RelayError>
where
    S: Stream<Item = Result<StreamEvent, RelayError>>,
{
    let mut events = std::pin::pin!(events);
    let mut fold = ResponseFold::new();
    while let Some(event) = events.next().await {
        if fold.push(event?).is_break() {
            break;
        }
    }
    fold.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn delta(item: Option<&str>, index: Option<u64>, text: &str) -> StreamEvent {
        StreamEvent::TextDelta {
            item_id: item.map(ToString::to_string),
            content_index: index,
            delta: text.to_string(),
        }
    }

    fn done(item: Option<&str>, index: Option<u64>, text: &str) -> StreamEvent {
        StreamEvent::TextDone {
            item_id: item.map(ToString::to_string),
            content_index: index,
            text: text.to_string(),
        }
    }

    fn fold_all(events: Vec<StreamEvent>) -> Result<CanonicalResult, RelayError> {
        let mut fold = ResponseFold::new();
        for event in events {
            if fold.push(event).is_break() {
                break;
            }
        }
        fold.finish()
    }

    #[test]
    fn test_done_only_part_contributes_its_text() {
        let result = fold_all(vec![done(Some("msg_1"), Some(0), "X")]).unwrap();
        assert_eq!(result.output_text, "X");
        assert!(result.raw.is_empty());
    }

    #[test]
    fn test_deltas_then_done_is_not_double_counted() {
        let result = fold_all(vec![
            delta(Some("msg_1"), Some(0), "He"),
            delta(Some("msg_1"), Some(0), "llo"),
            done(Some("msg_1"), Some(0), "Hello"),
        ])
        .unwrap();
        assert_eq!(result.output_text, "Hello");
    }

    #[test]
    fn test_dedup_is_per_part() {
        let result = fold_all(vec![
            delta(Some("msg_1"), Some(0), "A"),
            done(Some("msg_1"), Some(0), "A"),
            done(Some("msg_1"), Some(1), "B"),
        ])
        .unwrap();
        assert_eq!(result.output_text, "AB");
    }

    #[test]
    fn test_anonymous_parts_share_fallback_flag() {
        let result = fold_all(vec![
            delta(None, None, "He"),
            delta(None, None, "y"),
            done(None, None, "Hey"),
        ])
        .unwrap();
        assert_eq!(result.output_text, "Hey");

        // Any delta, even an identified one, suppresses anonymous done text.
        let result = fold_all(vec![delta(Some("m"), Some(0), "a"), done(None, None, "zzz")]).unwrap();
        assert_eq!(result.output_text, "a");
    }

    #[test]
    fn test_error_wins_over_later_completed() {
        let err = fold_all(vec![
            delta(None, None, "partial"),
            StreamEvent::Error {
                message: "quota exceeded".to_string(),
            },
            StreamEvent::Completed {
                response: Some(Document::new()),
            },
        ])
        .unwrap_err();
        assert!(matches!(err, RelayError::UpstreamStream(ref m) if m == "quota exceeded"));
    }

    #[test]
    fn test_completed_document_is_raw_and_text_fallback() {
        let doc = json!({
            "id": "resp_1",
            "output": [{"type": "message", "content": [{"type": "output_text", "text": "from doc"}]}]
        });
        let Some(doc) = doc.as_object().cloned() else {
            panic!("object");
        };
        let result = fold_all(vec![StreamEvent::Completed {
            response: Some(doc.clone()),
        }])
        .unwrap();
        assert_eq!(result.output_text, "from doc");
        assert_eq!(result.raw, doc);
    }

    #[test]
    fn test_accumulated_text_beats_document_text() {
        let doc = json!({"output_text": "document text"});
        let result = fold_all(vec![
            delta(Some("m"), Some(0), "streamed"),
            StreamEvent::Completed {
                response: doc.as_object().cloned(),
            },
        ])
        .unwrap();
        assert_eq!(result.output_text, "streamed");
        assert_eq!(result.raw.get("output_text"), Some(&json!("document text")));
    }

    #[test]
    fn test_events_after_terminal_are_ignored() {
        let mut fold = ResponseFold::new();
        assert!(fold.push(delta(None, None, "a")).is_continue());
        assert!(fold
            .push(StreamEvent::Completed { response: None })
            .is_break());
        assert!(fold.push(delta(None, None, "b")).is_break());
        assert_eq!(fold.finish().unwrap().output_text, "a");
    }

    #[test]
    fn test_end_without_completed_keeps_text() {
        let result = fold_all(vec![delta(None, None, "only deltas")]).unwrap();
        assert_eq!(result.output_text, "only deltas");
        assert!(result.raw.is_empty());
    }

    #[test]
    fn test_empty_stream_is_an_error() {
        assert!(matches!(fold_all(Vec::new()), Err(RelayError::EmptyStream)));
        assert!(matches!(
            fold_all(vec![StreamEvent::Terminator]),
            Err(RelayError::EmptyStream)
        ));
    }

    #[test]
    fn test_completed_without_text_is_not_an_error() {
        let result = fold_all(vec![StreamEvent::Completed {
            response: json!({"id": "r", "output": []}).as_object().cloned(),
        }])
        .unwrap();
        assert_eq!(result.output_text, "");
    }

    #[tokio::test]
    async fn test_fold_stream_propagates_transport_error() {
        let events = futures_util::stream::iter(vec![
            Ok(delta(None, None, "a")),
            Err(RelayError::Transport("reset".to_string())),
        ]);
        let err = fold_stream(events).await.unwrap_err();
        assert!(matches!(err, RelayError::Transport(_)));
    }
}
