/// SSE (Server-Sent Events) line framing over an incrementally decoded byte stream.
///
/// Bytes are turned into text with [`Utf8ChunkDecoder`], which carries
/// incomplete multi-byte sequences over to the next chunk, and the text is
/// split into frames by [`SseParser`], which carries incomplete lines over.
use memchr::memchr_iter;

const REPLACEMENT_CHAR: char = '\u{FFFD}';

// ---------------------------------------------------------------------------
// SseFrame — one flushed frame
// ---------------------------------------------------------------------------

/// A flushed SSE frame: the last `event:` name seen (if any) and the joined
/// `data:` lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

// ---------------------------------------------------------------------------
// Utf8ChunkDecoder — streaming UTF-8 decoding
// ---------------------------------------------------------------------------

/// Incremental UTF-8 decoder.
///
/// A multi-byte character split across two chunks decodes exactly as if the
/// chunks had arrived together. Invalid sequences become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `chunk` and append the text to `out`.
    pub fn decode_into(&mut self, chunk: &[u8], out: &mut String) {
        let joined;
        let mut bytes: &[u8] = if self.pending.is_empty() {
            chunk
        } else {
            self.pending.extend_from_slice(chunk);
            joined = std::mem::take(&mut self.pending);
            &joined
        };

        loop {
            match std::str::from_utf8(bytes) {
                Ok(text) => {
                    out.push_str(text);
                    return;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    // Safety: valid_up_to is guaranteed to be a valid UTF-8 boundary.
                    let text = unsafe { std::str::from_utf8_unchecked(&bytes[..valid_up_to]) };
                    out.push_str(text);
                    match e.error_len() {
                        Some(invalid_len) => {
                            out.push(REPLACEMENT_CHAR);
                            bytes = &bytes[valid_up_to + invalid_len..];
                        }
                        None => {
                            // Truncated sequence at the end: wait for the next chunk.
                            self.pending.extend_from_slice(&bytes[valid_up_to..]);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Flush a dangling partial sequence at end of input.
    pub fn finish_into(&mut self, out: &mut String) {
        if self.pending.is_empty() {
            return;
        }
        out.push_str(&String::from_utf8_lossy(&self.pending));
        self.pending.clear();
    }
}

// ---------------------------------------------------------------------------
// SseParser — incremental SSE line parser
// ---------------------------------------------------------------------------

/// Incremental SSE line parser.
///
/// Feed it text chunks (split at arbitrary boundaries) and it yields
/// fully-assembled [`SseFrame`]s. All state is owned by the parser, so one
/// parser serves exactly one stream.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
    read_offset: usize,
    event_name: Option<String>,
    data_lines: Vec<String>,
}

impl SseParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed text and return any complete frames.
    pub fn feed(&mut self, chunk: &str) -> Vec<SseFrame> {
        let mut out = Vec::new();
        self.feed_into(chunk, &mut out);
        out
    }

    /// Feed text and append complete frames into a caller-provided buffer.
    ///
    /// Line rules:
    /// - `event:<name>` sets the event name for the next flush (trimmed)
    /// - `data:<payload>` appends a data line, one leading space stripped
    /// - an empty line flushes: data lines are joined with `\n`, and the
    ///   event name and data lines are reset even when nothing is emitted
    /// - anything else (comments, `id:`, `retry:`) is ignored
    pub fn feed_into(&mut self, chunk: &str, out: &mut Vec<SseFrame>) {
        self.buffer.push_str(chunk);
        let mut processed_up_to = self.read_offset;
        let scan_start = processed_up_to;
        let bytes = self.buffer.as_bytes();
        for rel_pos in memchr_iter(b'\n', &bytes[scan_start..]) {
            let line_end = scan_start + rel_pos;
            let mut line = &self.buffer[processed_up_to..line_end];
            if let Some(stripped) = line.strip_suffix('\r') {
                line = stripped;
            }
            Self::process_line(line, &mut self.event_name, &mut self.data_lines, out);
            processed_up_to = line_end + 1;
        }

        self.read_offset = processed_up_to;
        if self.read_offset == self.buffer.len() {
            self.buffer.clear();
            self.read_offset = 0;
            return;
        }
        let should_compact = self.read_offset > 0
            && (self.read_offset >= self.buffer.len() / 2 || self.read_offset >= 8 * 1024);
        if should_compact {
            self.buffer.drain(..self.read_offset);
            self.read_offset = 0;
        }
    }

    /// End of input: treat an unterminated last line as complete, then flush
    /// whatever is pending as if a blank line had arrived.
    pub fn finish_into(&mut self, out: &mut Vec<SseFrame>) {
        let tail = &self.buffer[self.read_offset..];
        let tail = tail.strip_suffix('\r').unwrap_or(tail);
        if !tail.is_empty() {
            Self::process_line(tail, &mut self.event_name, &mut self.data_lines, out);
        }
        self.buffer.clear();
        self.read_offset = 0;
        Self::process_line("", &mut self.event_name, &mut self.data_lines, out);
    }

    fn process_line(
        line: &str,
        event_name: &mut Option<String>,
        data_lines: &mut Vec<String>,
        out: &mut Vec<SseFrame>,
    ) {
        if line.is_empty() {
            let event = event_name.take();
            if !data_lines.is_empty() {
                out.push(SseFrame {
                    event,
                    data: data_lines.join("\n"),
                });
                data_lines.clear();
            }
            return;
        }

        if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            data_lines.push(value.to_string());
        } else if let Some(value) = line.strip_prefix("event:") {
            *event_name = Some(value.trim().to_string());
        }
    }
}
