//! DEFLATE block decoder (RFC 1951)
//!
//! A stream is a sequence of blocks, the last one flagged final. Each block
//! starts with a 3-bit header and is one of:
//!
//! - stored (BTYPE=00): byte-aligned LEN/NLEN followed by raw bytes
//! - fixed Huffman (BTYPE=01): the codes from RFC 1951 §3.2.6
//! - dynamic Huffman (BTYPE=10): code lengths sent in the block header,
//!   themselves Huffman coded with the code length alphabet
//!
//! # Architecture
//!
//! - `BitReader`: bit-level stream reading
//! - `CanonicalHuffmanTable`: symbol decoding
//! - `SlidingWindow`: the last 32KB of output, for back-references
//! - `DeflateDecoder`: the block state machine tying them together
//!
//! The decoder pulls input one byte at a time and never reads past the byte
//! holding the end-of-block code of the final block.

use std::fmt;
use std::io::{Read, Write};

use log::{debug, trace};

use crate::bit_reader::BitReader;
use crate::error::{InflateError, InflateResult};
use crate::huffman::CanonicalHuffmanTable;
use crate::inflate_tables::{
    fixed_dist_table, fixed_litlen_table, CODE_LENGTH_ORDER, DIST_EXTRA_BITS, DIST_START,
    END_OF_BLOCK, FIRST_LENGTH_SYMBOL, LEN_EXTRA_BITS, LEN_START, MAX_DISTANCE, MAX_MATCH_LENGTH,
    MIN_MATCH_LENGTH, NUM_DIST_CODES, NUM_FIXED_DIST_CODES, NUM_LITLEN_CODES,
};
use crate::window::SlidingWindow;

/// Chunk size for copying stored block payloads
const STORED_CHUNK_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Stored,
    FixedHuffman,
    DynamicHuffman,
}

impl BlockType {
    fn from_btype(btype: u32, bit_offset: u64) -> InflateResult<Self> {
        match btype {
            0 => Ok(BlockType::Stored),
            1 => Ok(BlockType::FixedHuffman),
            2 => Ok(BlockType::DynamicHuffman),
            _ => Err(InflateError::ReservedBlockType { bit_offset }),
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::Stored => write!(f, "stored"),
            BlockType::FixedHuffman => write!(f, "fixed"),
            BlockType::DynamicHuffman => write!(f, "dynamic"),
        }
    }
}

/// Where the decoder is in the block state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    ReadingHeader,
    Stored,
    FixedHuffman,
    DynamicHuffman,
    SymbolLoop,
    Done,
}

/// Recorded block boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSummary {
    /// Bit offset where the block header starts
    pub bit_offset: u64,
    /// Byte offset in decompressed output
    pub output_offset: u64,
    /// Bytes the block produced
    pub output_len: u64,
    pub block_type: BlockType,
    pub is_final: bool,
}

/// Main deflate decoder
pub struct DeflateDecoder<R> {
    reader: BitReader<R>,
    window: SlidingWindow,
    state: DecoderState,
    is_final: bool,
    /// Set once a block fails; the stream position is then meaningless
    failed: bool,
    blocks: Vec<BlockSummary>,
}

impl<R: Read> DeflateDecoder<R> {
    /// Create a new decoder
    pub fn new(source: R) -> Self {
        Self {
            reader: BitReader::new(source),
            window: SlidingWindow::new(),
            state: DecoderState::ReadingHeader,
            is_final: false,
            failed: false,
            blocks: Vec::new(),
        }
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == DecoderState::Done
    }

    /// Blocks decoded so far
    pub fn blocks(&self) -> &[BlockSummary] {
        &self.blocks
    }

    /// Current bit position
    pub fn bit_position(&self) -> u64 {
        self.reader.bit_position()
    }

    /// Total output bytes
    pub fn total_output(&self) -> u64 {
        self.window.total_output()
    }

    /// Give back the byte source, positioned after the last byte of the stream
    /// once decoding is done.
    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }

    /// Decode the deflate stream
    pub fn decode<W: Write>(&mut self, writer: &mut W) -> InflateResult<u64> {
        while !self.is_done() {
            self.decode_block(writer)?;
        }
        Ok(self.window.total_output())
    }

    /// Decode exactly one block.
    ///
    /// After an error the decoder keeps the state it failed in and refuses
    /// further blocks.
    pub fn decode_block<W: Write>(&mut self, writer: &mut W) -> InflateResult<BlockSummary> {
        if self.is_done() {
            return Err(InflateError::invalid_argument(
                "final block already decoded",
            ));
        }
        if self.failed {
            return Err(InflateError::invalid_argument(
                "decoder failed on an earlier block",
            ));
        }

        let result = self.read_block(writer);
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    fn read_block<W: Write>(&mut self, writer: &mut W) -> InflateResult<BlockSummary> {
        self.state = DecoderState::ReadingHeader;
        let bit_offset = self.reader.bit_position();
        let output_offset = self.window.total_output();

        self.is_final = self.reader.read_bit()? == 1;
        let block_type = BlockType::from_btype(self.reader.read_bits(2)?, bit_offset)?;
        debug!(
            "block at bit {}: {}{}",
            bit_offset,
            block_type,
            if self.is_final { " (final)" } else { "" }
        );

        match block_type {
            BlockType::Stored => {
                self.state = DecoderState::Stored;
                self.decode_stored_block(writer)?;
            }
            BlockType::FixedHuffman => {
                self.state = DecoderState::FixedHuffman;
                self.decode_huffman_block(writer, fixed_litlen_table(), Some(fixed_dist_table()))?;
            }
            BlockType::DynamicHuffman => {
                self.state = DecoderState::DynamicHuffman;
                let (litlen_table, dist_table) = self.read_dynamic_tables()?;
                self.decode_huffman_block(writer, &litlen_table, dist_table.as_ref())?;
            }
        }

        self.state = if self.is_final {
            DecoderState::Done
        } else {
            DecoderState::ReadingHeader
        };

        let summary = BlockSummary {
            bit_offset,
            output_offset,
            output_len: self.window.total_output() - output_offset,
            block_type,
            is_final: self.is_final,
        };
        self.blocks.push(summary.clone());
        Ok(summary)
    }

    /// Decode a stored block (BTYPE=00)
    fn decode_stored_block<W: Write>(&mut self, writer: &mut W) -> InflateResult<()> {
        self.reader.align_to_byte();

        let bit_offset = self.reader.bit_position();
        let len = self.reader.read_u16_le()?;
        let nlen = self.reader.read_u16_le()?;

        if len != !nlen {
            return Err(InflateError::MalformedStoredBlock {
                len,
                nlen,
                bit_offset,
            });
        }

        let mut buf = [0u8; STORED_CHUNK_SIZE];
        let mut remaining = len as usize;
        while remaining > 0 {
            let n = remaining.min(buf.len());
            self.reader.read_bytes(&mut buf[..n])?;
            self.window.output_bytes(&buf[..n], writer)?;
            remaining -= n;
        }

        Ok(())
    }

    /// Read the header of a dynamic block (BTYPE=10) and build its tables
    fn read_dynamic_tables(
        &mut self,
    ) -> InflateResult<(CanonicalHuffmanTable, Option<CanonicalHuffmanTable>)> {
        let hlit = self.reader.read_bits(5)? as usize + 257;
        let hdist = self.reader.read_bits(5)? as usize + 1;
        let hclen = self.reader.read_bits(4)? as usize + 4;
        trace!("dynamic header: HLIT={} HDIST={} HCLEN={}", hlit, hdist, hclen);

        if hlit > NUM_LITLEN_CODES {
            return Err(InflateError::malformed_dynamic_header(format!(
                "HLIT {} exceeds {}",
                hlit, NUM_LITLEN_CODES
            )));
        }
        if hdist > NUM_DIST_CODES {
            return Err(InflateError::malformed_dynamic_header(format!(
                "HDIST {} exceeds {}",
                hdist, NUM_DIST_CODES
            )));
        }

        // Read code length code lengths
        let mut codelen_lengths = [0u8; 19];
        for &symbol in CODE_LENGTH_ORDER.iter().take(hclen) {
            codelen_lengths[symbol] = self.reader.read_bits(3)? as u8;
        }
        let codelen_table = CanonicalHuffmanTable::new(&codelen_lengths)?;

        let lengths = self.read_code_lengths(&codelen_table, hlit + hdist)?;
        if lengths[END_OF_BLOCK as usize] == 0 {
            return Err(InflateError::malformed_dynamic_header(
                "end-of-block symbol has no code",
            ));
        }

        let litlen_table = CanonicalHuffmanTable::new(&lengths[..hlit])?;
        let dist_table = build_distance_table(&lengths[hlit..])?;
        Ok((litlen_table, dist_table))
    }

    /// Decode `count` run-length coded code lengths
    fn read_code_lengths(
        &mut self,
        codelen_table: &CanonicalHuffmanTable,
        count: usize,
    ) -> InflateResult<Vec<u8>> {
        let mut lengths = Vec::with_capacity(count);

        while lengths.len() < count {
            let symbol = codelen_table.decode_symbol(&mut self.reader)?;

            let (value, repeat) = match symbol {
                0..=15 => (symbol as u8, 1),
                16 => {
                    let prev = *lengths.last().ok_or_else(|| {
                        InflateError::malformed_dynamic_header(
                            "repeat code with no previous length",
                        )
                    })?;
                    (prev, 3 + self.reader.read_bits(2)? as usize)
                }
                17 => (0, 3 + self.reader.read_bits(3)? as usize),
                18 => (0, 11 + self.reader.read_bits(7)? as usize),
                _ => {
                    return Err(InflateError::malformed_dynamic_header(format!(
                        "invalid code length symbol {}",
                        symbol
                    )))
                }
            };

            if lengths.len() + repeat > count {
                return Err(InflateError::malformed_dynamic_header(format!(
                    "code lengths overrun: {} + {} exceeds {}",
                    lengths.len(),
                    repeat,
                    count
                )));
            }
            lengths.resize(lengths.len() + repeat, value);
        }

        Ok(lengths)
    }

    /// Decode a Huffman-coded block
    fn decode_huffman_block<W: Write>(
        &mut self,
        writer: &mut W,
        litlen_table: &CanonicalHuffmanTable,
        dist_table: Option<&CanonicalHuffmanTable>,
    ) -> InflateResult<()> {
        self.state = DecoderState::SymbolLoop;

        loop {
            let symbol = litlen_table.decode_symbol(&mut self.reader)?;

            if symbol < 256 {
                self.window.output_byte(symbol as u8, writer)?;
            } else if symbol == END_OF_BLOCK {
                break;
            } else {
                let length = self.read_length(symbol)?;

                let dist_table = dist_table.ok_or(InflateError::MissingDistanceCode {
                    bit_offset: self.reader.bit_position(),
                })?;
                let dist_symbol = dist_table.decode_symbol(&mut self.reader)?;
                let distance = self.read_distance(dist_symbol)?;

                self.window.copy_match(distance, length, writer)?;
            }
        }

        Ok(())
    }

    /// Match length for a length symbol, including its extra bits
    fn read_length(&mut self, symbol: u16) -> InflateResult<usize> {
        let bit_offset = self.reader.bit_position();
        let index = (symbol - FIRST_LENGTH_SYMBOL) as usize;
        let (base, extra) = match (LEN_START.get(index), LEN_EXTRA_BITS.get(index)) {
            (Some(&base), Some(&extra)) => (base as usize, extra),
            _ => return Err(InflateError::InvalidRunLength { symbol, bit_offset }),
        };

        let length = base + self.reader.read_bits(extra)? as usize;
        if !(MIN_MATCH_LENGTH..=MAX_MATCH_LENGTH).contains(&length) {
            return Err(InflateError::InvalidRunLength { symbol, bit_offset });
        }
        Ok(length)
    }

    /// Match distance for a distance symbol, including its extra bits
    fn read_distance(&mut self, symbol: u16) -> InflateResult<usize> {
        let bit_offset = self.reader.bit_position();
        let index = symbol as usize;
        let (base, extra) = match (DIST_START.get(index), DIST_EXTRA_BITS.get(index)) {
            (Some(&base), Some(&extra)) => (base as usize, extra),
            _ => return Err(InflateError::InvalidDistance { symbol, bit_offset }),
        };

        let distance = base + self.reader.read_bits(extra)? as usize;
        if !(1..=MAX_DISTANCE).contains(&distance) {
            return Err(InflateError::InvalidDistance { symbol, bit_offset });
        }
        Ok(distance)
    }
}

/// Build the distance table of a dynamic block.
///
/// RFC 1951 §3.2.7 allows two incomplete cases here. With no distance codes
/// at all the block may only hold literals, so there is no table. With a
/// single code it is sent as one bit; the other one-bit pattern is given to
/// symbol 31, which `read_distance` rejects.
fn build_distance_table(lengths: &[u8]) -> InflateResult<Option<CanonicalHuffmanTable>> {
    let mut used = lengths.iter().enumerate().filter(|&(_, &len)| len > 0);

    match (used.next(), used.next()) {
        (None, _) => {
            debug!("block has no distance codes");
            Ok(None)
        }
        (Some((symbol, &1)), None) => {
            debug!("block has a single distance code ({})", symbol);
            let mut padded = [0u8; NUM_FIXED_DIST_CODES];
            padded[..lengths.len()].copy_from_slice(lengths);
            padded[NUM_FIXED_DIST_CODES - 1] = 1;
            CanonicalHuffmanTable::new(&padded).map(Some)
        }
        _ => CanonicalHuffmanTable::new(lengths).map(Some),
    }
}

/// Decode a raw deflate stream from `source` into `writer`, returning the
/// number of bytes written.
pub fn inflate<R: Read, W: Write>(source: R, writer: &mut W) -> InflateResult<u64> {
    DeflateDecoder::new(source).decode(writer)
}

/// Decode a raw deflate stream held in memory.
pub fn inflate_to_vec(data: &[u8]) -> InflateResult<Vec<u8>> {
    let mut output = Vec::with_capacity(data.len().saturating_mul(4));
    inflate(data, &mut output)?;
    Ok(output)
}
