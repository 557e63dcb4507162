//! Incremental decoder for `text/event-stream` chat responses.
//!
//! Bytes are buffered until a `\n` arrives, so multi-byte UTF-8 sequences
//! and lines split across network chunks decode correctly.

use serde_json::Value;

use super::messages::extract_delta;

/// Literal payload that ends the stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Splits a byte stream into complete lines.
#[derive(Debug, Default)]
pub struct SseLineDecoder {
    buffer: Vec<u8>,
}

impl SseLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every line it completes (without the `\n`).
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.buffer[start..].iter().position(|&b| b == b'\n') {
            let end = start + pos;
            lines.push(String::from_utf8_lossy(&self.buffer[start..end]).into_owned());
            start = end + 1;
        }
        self.buffer.drain(..start);
        lines
    }

    /// Return the unterminated last line, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

/// Meaning of one decoded line.
#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    /// A non-empty text delta.
    Delta(String),
    /// A valid frame carrying no text (role header, finish reason).
    Empty,
    /// The terminal sentinel.
    Done,
    /// A data payload that is not valid JSON.
    Malformed { payload: String, error: String },
    /// Blank line, comment/keep-alive, or a non-data field.
    Ignored,
}

/// Classify one line of the event stream.
pub fn parse_event_line(line: &str) -> SseEvent {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return SseEvent::Ignored;
    }

    let payload = if let Some(data) = line.strip_prefix("data:") {
        data.trim()
    } else if line.starts_with('{') {
        // Some gateways drop the field name and send bare JSON lines.
        line
    } else {
        return SseEvent::Ignored;
    };

    if payload == DONE_SENTINEL {
        return SseEvent::Done;
    }

    match serde_json::from_str::<Value>(payload) {
        Ok(chunk) => match extract_delta(&chunk) {
            Some(text) => SseEvent::Delta(text.to_string()),
            None => SseEvent::Empty,
        },
        Err(e) => SseEvent::Malformed {
            payload: payload.to_string(),
            error: e.to_string(),
        },
    }
}
