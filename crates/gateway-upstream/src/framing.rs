//! Line framing for upstream event streams.
//!
//! Upstream bodies arrive in arbitrary chunks. [`LineBuffer`] reassembles them into
//! `\n`-terminated lines (a multi-byte character may be split across chunks), and
//! [`parse_line`] classifies each line.

use serde_json::Value;

/// Prefix of a data line
pub const DATA_PREFIX: &str = "data:";
/// Payload that ends an event stream
pub const DONE_MARKER: &str = "[DONE]";

/// Accumulates raw bytes and hands out complete lines
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    /// Append a chunk
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Next complete line without its terminator, if one is buffered
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        let end = self.buf.iter().position(|b| *b == b'\n')?;
        let mut line: Vec<u8> = self.buf.drain(..=end).collect();
        line.pop();
        Some(line)
    }
}

/// Classification of one upstream line
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// A data line carrying a JSON object
    Data(Value),
    /// The upstream terminal sentinel
    Done,
    /// Blank lines, comments, `event:` and other non-data fields
    Ignored,
    /// A data line that cannot be relayed
    Malformed(String),
}

/// Classify one line
pub fn parse_line(line: &[u8]) -> SseLine {
    let Ok(text) = std::str::from_utf8(line) else {
        return SseLine::Malformed("invalid UTF-8".to_string());
    };

    let Some(payload) = text.trim().strip_prefix(DATA_PREFIX) else {
        return SseLine::Ignored;
    };
    let payload = payload.trim();

    if payload == DONE_MARKER {
        return SseLine::Done;
    }
    if payload.is_empty() {
        return SseLine::Ignored;
    }

    match serde_json::from_str::<Value>(payload) {
        Ok(value @ Value::Object(_)) => SseLine::Data(value),
        Ok(_) => SseLine::Malformed("not a JSON object".to_string()),
        Err(e) => SseLine::Malformed(e.to_string()),
    }
}
