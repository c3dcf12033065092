use bytes::{Buf, BytesMut};
use std::mem;

const DEFAULT_CAPACITY: usize = 8192;

/// Incremental line splitter for a chunked byte stream.
///
/// Bytes are decoded as UTF-8 across `push` calls: a multi-byte character split
/// between two fragments is held back until its remaining bytes arrive.
/// Invalid sequences decode to U+FFFD and are left for the frame parser to
/// reject. Decoded text after the last newline stays pending until the next
/// push, or until [`ChunkBuffer::flush`] at end of stream.
#[derive(Debug)]
pub struct ChunkBuffer {
    /// Undecoded bytes; only ever an incomplete UTF-8 sequence between pushes
    undecoded: BytesMut,
    /// Decoded text not yet terminated by a newline
    pending: String,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            undecoded: BytesMut::with_capacity(4),
            pending: String::with_capacity(capacity),
        }
    }

    /// Feed a fragment and return every record it completes, in order.
    pub fn push(&mut self, fragment: &[u8]) -> Vec<String> {
        self.undecoded.extend_from_slice(fragment);
        self.decode();

        let Some(last_newline) = self.pending.rfind('\n') else {
            return Vec::new();
        };

        let rest = self.pending.split_off(last_newline + 1);
        let complete = mem::replace(&mut self.pending, rest);
        let records: Vec<String> = complete.lines().map(str::to_string).collect();

        tracing::trace!(
            records = records.len(),
            pending = self.pending.len(),
            "Split fragment into records"
        );
        records
    }

    /// Recover the final record when the stream ends without a trailing newline.
    pub fn flush(&mut self) -> Option<String> {
        if !self.undecoded.is_empty() {
            // Truncated multi-byte sequence at end of stream
            self.undecoded.clear();
            self.pending.push(char::REPLACEMENT_CHARACTER);
        }

        if self.pending.is_empty() {
            return None;
        }

        let mut record = mem::take(&mut self.pending);
        if record.ends_with('\r') {
            record.pop();
        }
        Some(record)
    }

    /// Number of decoded bytes waiting for a newline
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.undecoded.is_empty()
    }

    fn decode(&mut self) {
        loop {
            let (valid, invalid) = match std::str::from_utf8(&self.undecoded) {
                Ok(_) => (self.undecoded.len(), None),
                Err(e) => (e.valid_up_to(), Some(e.error_len())),
            };

            let decoded = self.undecoded.split_to(valid);
            self.pending.push_str(&String::from_utf8_lossy(&decoded));

            match invalid {
                // Everything decoded, or an incomplete sequence awaits more bytes
                None | Some(None) => return,
                Some(Some(len)) => {
                    self.undecoded.advance(len);
                    self.pending.push(char::REPLACEMENT_CHARACTER);
                }
            }
        }
    }
}

impl Default for ChunkBuffer {
    fn default() -> Self {
        Self::new()
    }
}
