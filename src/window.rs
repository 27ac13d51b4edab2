//! Sliding window history for LZ77 back-references.

use std::io::Write;

use crate::error::{InflateError, InflateResult};
use crate::inflate_tables::{MAX_DISTANCE, MAX_MATCH_LENGTH};

/// Default history size, one full back-reference distance
pub const WINDOW_SIZE: usize = MAX_DISTANCE;

/// Circular buffer holding the most recent output bytes
pub struct SlidingWindow {
    buffer: Vec<u8>,
    pos: usize,
    /// Bytes held, capped at capacity
    filled: usize,
    total_output: u64,
}

impl SlidingWindow {
    pub fn new() -> Self {
        Self {
            buffer: vec![0u8; WINDOW_SIZE],
            pos: 0,
            filled: 0,
            total_output: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> InflateResult<Self> {
        if capacity == 0 {
            return Err(InflateError::invalid_argument(
                "window capacity must be positive",
            ));
        }
        Ok(Self {
            buffer: vec![0u8; capacity],
            pos: 0,
            filled: 0,
            total_output: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes currently available for back-references
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Total bytes output so far
    pub fn total_output(&self) -> u64 {
        self.total_output
    }

    /// Append a byte to history without writing it anywhere
    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.buffer[self.pos] = byte;
        self.pos += 1;
        if self.pos == self.buffer.len() {
            self.pos = 0;
        }
        if self.filled < self.buffer.len() {
            self.filled += 1;
        }
        self.total_output += 1;
    }

    /// Output a literal byte
    #[inline]
    pub fn output_byte<W: Write>(&mut self, byte: u8, writer: &mut W) -> InflateResult<()> {
        self.push(byte);
        writer.write_all(&[byte])?;
        Ok(())
    }

    /// Output a run of literal bytes
    pub fn output_bytes<W: Write>(&mut self, bytes: &[u8], writer: &mut W) -> InflateResult<()> {
        for &byte in bytes {
            self.push(byte);
        }
        writer.write_all(bytes)?;
        Ok(())
    }

    /// Copy `length` bytes starting `distance` bytes back.
    ///
    /// Each byte is read relative to the cursor as it stands at that moment
    /// and pushed before the next one is read. When `distance < length` the
    /// copy therefore re-reads bytes it produced itself, which is how a short
    /// pattern repeats (`"AB"` copied at distance 2 for 5 bytes is `"ABABA"`).
    pub fn copy_match<W: Write>(
        &mut self,
        distance: usize,
        length: usize,
        writer: &mut W,
    ) -> InflateResult<()> {
        if distance == 0 || distance > self.filled {
            return Err(InflateError::InvalidBackReference {
                distance,
                length,
                available: self.filled,
            });
        }

        let capacity = self.buffer.len();
        let mut staged = [0u8; MAX_MATCH_LENGTH];
        let mut staged_len = 0;

        for _ in 0..length {
            let src = (self.pos + capacity - distance) % capacity;
            let byte = self.buffer[src];
            self.push(byte);

            staged[staged_len] = byte;
            staged_len += 1;
            if staged_len == staged.len() {
                writer.write_all(&staged)?;
                staged_len = 0;
            }
        }

        writer.write_all(&staged[..staged_len])?;
        Ok(())
    }
}

impl Default for SlidingWindow {
    fn default() -> Self {
        Self::new()
    }
}
