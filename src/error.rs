use std::fmt;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InflateError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Unexpected end of input at bit {bit_offset}")]
    UnexpectedEndOfInput { bit_offset: u64 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid code length {length} for symbol {symbol} (max {max_bits})")]
    InvalidCodeLength {
        symbol: usize,
        length: u8,
        max_bits: u8,
    },

    #[error("Illegal Huffman tree: {0}")]
    IllegalHuffmanTree(String),

    #[error("Corrupt Huffman stream: no symbol resolves at bit {bit_offset}")]
    CorruptHuffmanStream { bit_offset: u64 },

    #[error("Malformed stored block at bit {bit_offset}: LEN {len:#06x}, NLEN {nlen:#06x}")]
    MalformedStoredBlock { len: u16, nlen: u16, bit_offset: u64 },

    #[error("Invalid run length from length symbol {symbol} at bit {bit_offset}")]
    InvalidRunLength { symbol: u16, bit_offset: u64 },

    #[error("Invalid distance from distance symbol {symbol} at bit {bit_offset}")]
    InvalidDistance { symbol: u16, bit_offset: u64 },

    #[error("Invalid back-reference: distance {distance}, length {length}, only {available} bytes of history")]
    InvalidBackReference {
        distance: usize,
        length: usize,
        available: usize,
    },

    #[error("Length code without a distance code table at bit {bit_offset}")]
    MissingDistanceCode { bit_offset: u64 },

    #[error("Reserved block type at bit {bit_offset}")]
    ReservedBlockType { bit_offset: u64 },

    #[error("Malformed dynamic block header: {0}")]
    MalformedDynamicHeader(String),

    #[error("Invalid gzip header: {0}")]
    InvalidGzipHeader(String),

    #[error("Size mismatch: trailer says {expected} bytes, decoded {actual}")]
    SizeMismatch { expected: u32, actual: u32 },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl InflateError {
    pub fn invalid_argument<T: fmt::Display>(msg: T) -> Self {
        InflateError::InvalidArgument(msg.to_string())
    }

    pub fn illegal_huffman_tree<T: fmt::Display>(msg: T) -> Self {
        InflateError::IllegalHuffmanTree(msg.to_string())
    }

    pub fn malformed_dynamic_header<T: fmt::Display>(msg: T) -> Self {
        InflateError::MalformedDynamicHeader(msg.to_string())
    }

    pub fn invalid_gzip_header<T: fmt::Display>(msg: T) -> Self {
        InflateError::InvalidGzipHeader(msg.to_string())
    }

    pub fn parse<T: fmt::Display>(msg: T) -> Self {
        InflateError::Parse(msg.to_string())
    }

    /// Bit offset in the compressed stream where the error was detected, if known.
    pub fn bit_offset(&self) -> Option<u64> {
        match self {
            InflateError::UnexpectedEndOfInput { bit_offset }
            | InflateError::CorruptHuffmanStream { bit_offset }
            | InflateError::MalformedStoredBlock { bit_offset, .. }
            | InflateError::InvalidRunLength { bit_offset, .. }
            | InflateError::InvalidDistance { bit_offset, .. }
            | InflateError::MissingDistanceCode { bit_offset }
            | InflateError::ReservedBlockType { bit_offset } => Some(*bit_offset),
            _ => None,
        }
    }
}

pub type InflateResult<T> = Result<T, InflateError>;
