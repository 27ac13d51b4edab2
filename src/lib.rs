//! rinflate - a bit-exact DEFLATE (RFC 1951) decompressor
//!
//! The decoder reads its input strictly in order, one byte at a time, and
//! writes output in order as it is produced. Gzip (RFC 1952) framing is
//! layered on top in [`gzip`].
//!
//! ```no_run
//! let compressed: Vec<u8> = std::fs::read("data.deflate")?;
//! let output = rinflate::inflate_to_vec(&compressed)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#[cfg(test)]
#[macro_use]
mod test_utils;

pub mod bit_reader;
pub mod cli;
pub mod decompression;
pub mod deflate_decoder;
pub mod error;
pub mod gzip;
pub mod huffman;
pub mod inflate_tables;
pub mod utils;
pub mod window;

#[cfg(test)]
mod golden_tests;

pub use bit_reader::{BitOrder, BitReader};
pub use deflate_decoder::{
    inflate, inflate_to_vec, BlockSummary, BlockType, DecoderState, DeflateDecoder,
};
pub use error::{InflateError, InflateResult};
pub use gzip::{decompress_gzip, GzipHeader, GzipMember, GzipSummary, GzipTrailer};
pub use huffman::CanonicalHuffmanTable;
pub use window::SlidingWindow;
