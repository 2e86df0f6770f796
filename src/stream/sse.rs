//! # Incremental `text/event-stream` decoder.
//!
//! Bytes are pushed in arbitrary chunks; complete frames are popped once their
//! blank-line delimiter (`\n\n` or `\r\n\r\n`) has arrived.
//!
//! Per frame:
//! - `event:` sets the event name (last one wins);
//! - `data:` lines are joined with `\n`; the space after the colon is optional;
//! - lines starting with `:` are comments;
//! - other fields (`id:`, `retry:`) are ignored;
//! - a frame without `data:` lines is skipped.

/// One decoded server-sent event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SseFrame {
    /// Value of the `event:` field, if any. Absent means the default `message` event.
    pub event: Option<String>,
    pub data: String,
}

/// Default bound on a single frame.
pub const DEFAULT_MAX_FRAME: usize = 1024 * 1024;

/// Longest delimiter minus one; a delimiter may straddle two chunks by this much.
const OVERLAP: usize = 3;

/// Buffers raw bytes and yields complete frames.
///
/// A frame that grows past `max_frame` bytes is dropped with a warning; the
/// decoder then skips input up to the next delimiter and resumes there.
#[derive(Debug)]
pub struct SseDecoder {
    buf: Vec<u8>,
    /// Offset below which `buf` is known to hold no delimiter.
    scanned: usize,
    max_frame: usize,
    skipping: bool,
    oversized: u64,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_max_frame(DEFAULT_MAX_FRAME)
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder dropping frames larger than `max_frame` bytes (min 1).
    pub fn with_max_frame(max_frame: usize) -> Self {
        Self {
            buf: Vec::new(),
            scanned: 0,
            max_frame: max_frame.max(1),
            skipping: false,
            oversized: 0,
        }
    }

    /// Appends a chunk as received from the transport.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Bytes held for an incomplete frame.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Frames dropped for exceeding the size bound.
    pub fn oversized(&self) -> u64 {
        self.oversized
    }

    /// Pops the next complete frame, skipping frames that carry no data.
    pub fn next_frame(&mut self) -> Option<SseFrame> {
        loop {
            let Some((end, delim)) = find_delimiter(&self.buf, self.scanned) else {
                self.scanned = self.buf.len().saturating_sub(OVERLAP);
                if self.buf.len() > self.max_frame {
                    self.drop_oversized();
                }
                return None;
            };

            let raw: Vec<u8> = self.buf.drain(..end + delim).take(end).collect();
            self.scanned = 0;
            if self.skipping {
                self.skipping = false;
                continue;
            }
            if raw.len() > self.max_frame {
                self.oversized += 1;
                tracing::warn!(bytes = raw.len(), max = self.max_frame, "dropping oversized stream frame");
                continue;
            }
            if let Some(frame) = parse_frame(&String::from_utf8_lossy(&raw)) {
                return Some(frame);
            }
        }
    }

    /// Discards the unterminated frame, keeping only a possible partial delimiter.
    fn drop_oversized(&mut self) {
        if !self.skipping {
            self.skipping = true;
            self.oversized += 1;
            tracing::warn!(max = self.max_frame, "dropping oversized stream frame");
        }
        let keep_from = self.buf.len().saturating_sub(OVERLAP);
        self.buf.drain(..keep_from);
        self.scanned = 0;
    }
}

/// Earliest frame delimiter at or after `from`, as `(start, len)`.
fn find_delimiter(buf: &[u8], from: usize) -> Option<(usize, usize)> {
    let tail = buf.get(from..)?;
    let crlf = find(tail, b"\r\n\r\n").map(|i| (from + i, 4));
    let lf = find(tail, b"\n\n").map(|i| (from + i, 2));
    match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn parse_frame(raw: &str) -> Option<SseFrame> {
    let mut event = None;
    let mut data: Vec<&str> = Vec::new();

    for line in raw.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };
        match field {
            "event" => event = Some(value.to_string()),
            "data" => data.push(value),
            _ => {}
        }
    }

    if data.is_empty() {
        return None;
    }
    Some(SseFrame {
        event,
        data: data.join("\n"),
    })
}
