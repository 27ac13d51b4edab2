//! Constant tables from RFC 1951 §3.2.5 - §3.2.7.

use std::sync::OnceLock;

use crate::huffman::CanonicalHuffmanTable;

/// End of block symbol
pub const END_OF_BLOCK: u16 = 256;

/// First length symbol
pub const FIRST_LENGTH_SYMBOL: u16 = 257;

/// Number of literal/length codes a dynamic header may declare
pub const NUM_LITLEN_CODES: usize = 286;

/// Number of distance codes a dynamic header may declare
pub const NUM_DIST_CODES: usize = 30;

/// Size of the fixed literal/length alphabet (two symbols are never used)
pub const NUM_FIXED_LITLEN_CODES: usize = 288;

/// Size of the fixed distance alphabet
pub const NUM_FIXED_DIST_CODES: usize = 32;

pub const MIN_MATCH_LENGTH: usize = 3;

pub const MAX_MATCH_LENGTH: usize = 258;

pub const MAX_DISTANCE: usize = 32 * 1024;

/// Extra bits for length codes
pub static LEN_EXTRA_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

/// Base lengths for length codes
pub static LEN_START: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258,
];

/// Extra bits for distance codes
pub static DIST_EXTRA_BITS: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// Base distances for distance codes
pub static DIST_START: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

/// Code length alphabet order for dynamic Huffman
pub static CODE_LENGTH_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Code lengths of the fixed literal/length code (BTYPE=01)
pub fn fixed_litlen_lengths() -> [u8; NUM_FIXED_LITLEN_CODES] {
    let mut lengths = [0u8; NUM_FIXED_LITLEN_CODES];
    lengths[..144].fill(8);
    lengths[144..256].fill(9);
    lengths[256..280].fill(7);
    lengths[280..].fill(8);
    lengths
}

/// Code lengths of the fixed distance code (BTYPE=01)
pub fn fixed_dist_lengths() -> [u8; NUM_FIXED_DIST_CODES] {
    [5u8; NUM_FIXED_DIST_CODES]
}

/// Shared fixed literal/length table, built on first use
pub fn fixed_litlen_table() -> &'static CanonicalHuffmanTable {
    static TABLE: OnceLock<CanonicalHuffmanTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        CanonicalHuffmanTable::new(&fixed_litlen_lengths())
            .expect("fixed literal/length code is complete")
    })
}

/// Shared fixed distance table, built on first use
pub fn fixed_dist_table() -> &'static CanonicalHuffmanTable {
    static TABLE: OnceLock<CanonicalHuffmanTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        CanonicalHuffmanTable::new(&fixed_dist_lengths()).expect("fixed distance code is complete")
    })
}
