use engine_logging::{engine_debug, engine_warn};
use serde_json::{Map, Value};

/// A decoded JSON object believed to hold one status update.
pub type Frame = Map<String, Value>;

/// Incremental decoder turning an arbitrarily fragmented text stream into
/// JSON status frames.
///
/// A candidate frame runs from the first `{` in the buffer to the first `}`
/// in the buffer. Objects must therefore be flat: a nested object is sliced
/// at its inner closing brace, fails to parse and is dropped. A candidate
/// that fails to parse is consumed, never re-buffered.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: String,
    /// Bytes of a UTF-8 sequence split across chunk boundaries.
    partial_utf8: Vec<u8>,
    dropped: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds raw body bytes; returns every frame completed by this chunk.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let text = self.decode_utf8(chunk);
        self.push_str(&text)
    }

    /// Feeds already decoded text; returns every frame completed by this chunk.
    pub fn push_str(&mut self, chunk: &str) -> Vec<Frame> {
        self.buffer.push_str(chunk);
        let mut frames = Vec::new();

        loop {
            let Some(open) = self.buffer.find('{') else {
                // No frame can start in what is buffered, and any stray `}`
                // must survive until a `{` shows up.
                if !self.buffer.contains('}') {
                    self.buffer.clear();
                }
                break;
            };
            let Some(close) = self.buffer.find('}') else {
                break;
            };

            let end = close + 1;
            if open < close {
                let candidate = &self.buffer[open..end];
                match serde_json::from_str::<Frame>(candidate) {
                    Ok(frame) => frames.push(frame),
                    Err(err) => {
                        self.dropped += 1;
                        engine_warn!("Skipping invalid JSON frame {:?}: {}", candidate, err);
                    }
                }
            } else {
                self.dropped += 1;
                engine_warn!(
                    "Skipping unmatched closing brace in {:?}",
                    &self.buffer[..end]
                );
            }
            self.buffer.drain(..end);
        }

        frames
    }

    /// Text waiting for more input.
    pub fn remainder(&self) -> &str {
        &self.buffer
    }

    /// Number of candidate frames dropped so far.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Ends the stream, reporting anything that never formed a frame.
    pub fn finish(self) {
        let trailing = self.buffer.trim();
        if !trailing.is_empty() || !self.partial_utf8.is_empty() {
            engine_warn!(
                "Stream ended with undecoded data: {:?} (+{} bytes of partial UTF-8)",
                trailing,
                self.partial_utf8.len()
            );
        }
        engine_debug!("Frame decoder finished; {} frames dropped", self.dropped);
    }

    fn decode_utf8(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.partial_utf8);
        bytes.extend_from_slice(chunk);

        let mut text = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    // `valid_up_to` guarantees this prefix is UTF-8.
                    text.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match err.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.partial_utf8 = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        text
    }
}
