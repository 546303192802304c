// Incremental SSE frame decoder and matching encoder.
//
// The upstream runtime emits `data: <json>\n\n` events, but TCP hands the
// gateway arbitrary chunks: one event may arrive split across several chunks
// and one chunk may carry several events. The decoder buffers raw bytes,
// slices them into blank-line-terminated blocks, and decodes each block
// exactly once. Buffering happens at the byte level because a chunk boundary
// may fall inside a multi-byte UTF-8 character; text decoding only runs on
// completed blocks. Nothing is ever dropped — a block that is not a decodable
// data frame is carried through as raw text.

use serde_json::Value;

/// One decoded frame from the upstream stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    /// The frame text as received, terminator stripped.
    pub raw: String,
    /// The JSON payload that followed a `data: ` prefix, when decodable.
    /// `None` means the frame must be forwarded as-is.
    pub parsed: Option<Value>,
}

impl StreamEvent {
    fn from_block(block: &str) -> Self {
        let parsed = block
            .strip_prefix("data: ")
            .and_then(|payload| serde_json::from_str::<Value>(payload).ok());
        Self {
            raw: block.to_string(),
            parsed,
        }
    }
}

/// Incremental decoder over a sequence of byte chunks.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one chunk and return every frame it completes.
    ///
    /// A whitespace-only chunk is discarded when nothing is buffered; once a
    /// frame is in flight, whitespace may be its terminator and is kept.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        if self.buffer.is_empty() && chunk.iter().all(u8::is_ascii_whitespace) {
            return Vec::new();
        }
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        // The terminator bytes cannot occur inside a multi-byte UTF-8
        // character, so every drained block holds only whole characters.
        while let Some(pos) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let block: Vec<u8> = self.buffer.drain(..pos + 2).collect();
            let text = String::from_utf8_lossy(&block);
            let block = text.trim_end_matches('\n');
            if block.trim().is_empty() {
                continue;
            }
            frames.push(StreamEvent::from_block(block));
        }
        frames
    }

    /// Flush any trailing unterminated text as a final frame. Called once
    /// when the upstream stream ends.
    pub fn finish(self) -> Option<StreamEvent> {
        let text = String::from_utf8_lossy(&self.buffer);
        let block = text.trim_end_matches('\n');
        if block.trim().is_empty() {
            return None;
        }
        Some(StreamEvent::from_block(block))
    }
}

/// Serialize a (possibly mutated) payload back onto the wire.
pub fn encode_payload(payload: &Value) -> String {
    format!("data: {}\n\n", payload)
}

/// Forward a frame's original text, restoring the blank-line terminator.
pub fn encode_raw(raw: &str) -> String {
    format!("{}\n\n", raw)
}
