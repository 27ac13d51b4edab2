//! Bit-level reader over a pull-based byte source.
//!
//! DEFLATE packs header fields and extra bits starting at the least
//! significant bit of each byte, so that is the default order. The reader
//! holds at most one byte of lookahead: after the final block of a stream
//! the source is positioned exactly on the next unread byte, which is what
//! container formats need to find their trailer.

use std::io::{self, Read};

use crate::error::{InflateError, InflateResult};

/// Widest field `read_bits` will assemble in one call.
pub const MAX_FIELD_BITS: u8 = 16;

/// Order in which bits are taken out of each byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitOrder {
    /// Bit 0 first (DEFLATE)
    #[default]
    LsbFirst,
    /// Bit 7 first
    MsbFirst,
}

/// Bit reader for deflate streams
pub struct BitReader<R> {
    source: R,
    current: u8,
    // 8 means the current byte is used up and the next read pulls a new one
    bit_pos: u8,
    bits_consumed: u64,
    order: BitOrder,
}

impl<R: Read> BitReader<R> {
    pub fn new(source: R) -> Self {
        Self::with_order(source, BitOrder::LsbFirst)
    }

    pub fn with_order(source: R, order: BitOrder) -> Self {
        Self {
            source,
            current: 0,
            bit_pos: 8,
            bits_consumed: 0,
            order,
        }
    }

    /// Current bit position in stream
    #[inline]
    pub fn bit_position(&self) -> u64 {
        self.bits_consumed
    }

    /// True when the next read starts on a byte boundary
    #[inline]
    pub fn is_aligned(&self) -> bool {
        self.bit_pos == 8
    }

    /// Pull the next byte from the source, retrying interrupted reads.
    fn next_byte(&mut self) -> InflateResult<u8> {
        let mut byte = [0u8; 1];
        loop {
            match self.source.read(&mut byte) {
                Ok(0) => {
                    return Err(InflateError::UnexpectedEndOfInput {
                        bit_offset: self.bits_consumed,
                    })
                }
                Ok(_) => return Ok(byte[0]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Read a single bit
    #[inline]
    pub fn read_bit(&mut self) -> InflateResult<u8> {
        if self.bit_pos == 8 {
            self.current = self.next_byte()?;
            self.bit_pos = 0;
        }

        let shift = match self.order {
            BitOrder::LsbFirst => self.bit_pos,
            BitOrder::MsbFirst => 7 - self.bit_pos,
        };
        let bit = (self.current >> shift) & 1;
        self.bit_pos += 1;
        self.bits_consumed += 1;

        Ok(bit)
    }

    /// Read `count` bits (at most 16); the first bit read lands in bit 0 of the result.
    pub fn read_bits(&mut self, count: u8) -> InflateResult<u32> {
        if count > MAX_FIELD_BITS {
            return Err(InflateError::invalid_argument(format!(
                "cannot read {} bits at once (max {})",
                count, MAX_FIELD_BITS
            )));
        }

        let mut value = 0u32;
        for i in 0..count {
            value |= (self.read_bit()? as u32) << i;
        }
        Ok(value)
    }

    /// Align to next byte boundary
    pub fn align_to_byte(&mut self) {
        if self.bit_pos != 8 {
            self.bits_consumed += (8 - self.bit_pos) as u64;
            self.bit_pos = 8;
        }
    }

    /// Read a whole byte. Takes the fast path when aligned.
    pub fn read_byte(&mut self) -> InflateResult<u8> {
        if self.is_aligned() {
            let byte = self.next_byte()?;
            self.bits_consumed += 8;
            return Ok(byte);
        }
        self.read_bits(8).map(|v| v as u8)
    }

    /// Read a 16-bit little-endian value
    pub fn read_u16_le(&mut self) -> InflateResult<u16> {
        let lo = self.read_byte()? as u16;
        let hi = self.read_byte()? as u16;
        Ok(lo | (hi << 8))
    }

    /// Fill `buf` with whole bytes.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> InflateResult<()> {
        for byte in buf.iter_mut() {
            *byte = self.read_byte()?;
        }
        Ok(())
    }

    /// Give back the byte source. Bits left in a partially read byte are dropped.
    pub fn into_inner(self) -> R {
        self.source
    }
}
