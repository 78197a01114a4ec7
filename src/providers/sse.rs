//! Incremental parser for `text/event-stream` responses.
//!
//! The streaming endpoint delivers one JSON document per SSE event. HTTP
//! chunk boundaries fall anywhere, so the parser buffers partial input and
//! only yields complete events (blocks terminated by a blank line).

/// Buffering SSE parser. Feed raw bytes, get complete `data:` payloads.
#[derive(Default)]
pub struct SseParser {
    buffer: String,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk from the HTTP body. Returns the `data:` payload of
    /// every event completed by this chunk, in order.
    ///
    /// Multi-line `data:` fields are joined with `\n` per the SSE spec.
    /// Comment lines (leading `:`) and other fields (`event:`, `id:`,
    /// `retry:`) are ignored — the endpoint only ever carries payloads in
    /// `data:`.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut payloads = Vec::new();
        while let Some(boundary) = self.find_boundary() {
            let (block_len, sep_len) = boundary;
            let block: String = self.buffer.drain(..block_len + sep_len).collect();

            let mut data_lines: Vec<&str> = Vec::new();
            for line in block[..block_len].lines() {
                if let Some(value) = line.strip_prefix("data:") {
                    data_lines.push(value.strip_prefix(' ').unwrap_or(value));
                }
            }
            if !data_lines.is_empty() {
                payloads.push(data_lines.join("\n"));
            }
        }
        payloads
    }

    /// Locate the next event boundary (`\n\n` or `\r\n\r\n`).
    fn find_boundary(&self) -> Option<(usize, usize)> {
        let lf = self.buffer.find("\n\n");
        let crlf = self.buffer.find("\r\n\r\n");
        match (lf, crlf) {
            (Some(a), Some(b)) if b < a => Some((b, 4)),
            (Some(a), _) => Some((a, 2)),
            (None, Some(b)) => Some((b, 4)),
            (None, None) => None,
        }
    }
}
