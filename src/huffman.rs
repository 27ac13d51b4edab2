//! Canonical Huffman decoding tables (RFC 1951 §3.2.2).
//!
//! A table is derived purely from per-symbol code lengths. Codes of equal
//! length are consecutive and shorter codes precede longer ones, so the
//! whole code is known once the lengths are. Every `(length, code)` pair is
//! stored under the key `(1 << length) | code`; the leading 1 keeps codes of
//! different lengths apart, so a decoder can shift bits in one at a time and
//! probe the table after each bit.
//!
//! Construction rejects code sets that do not exactly fill the code space.
//! Because of that, decoding a symbol from a valid table always finishes
//! within the longest code length.

use std::io::Read;

use crate::bit_reader::BitReader;
use crate::error::{InflateError, InflateResult};

/// Maximum code length for DEFLATE Huffman codes
pub const MAX_CODE_BITS: u8 = 15;

/// Marks lookup slots that no code maps to
const UNUSED: u16 = u16::MAX;

/// Canonical Huffman code with a direct `(length, code)` lookup
#[derive(Debug, Clone)]
pub struct CanonicalHuffmanTable {
    /// Indexed by `(1 << len) | code`
    symbols: Vec<u16>,
    /// Code length per symbol, 0 = unused
    lengths: Vec<u8>,
    /// Canonical code per symbol (meaningless where the length is 0)
    codes: Vec<u16>,
    /// Longest code actually in use
    max_len: u8,
}

impl CanonicalHuffmanTable {
    /// Build a table for DEFLATE's 15-bit limit.
    pub fn new(lengths: &[u8]) -> InflateResult<Self> {
        Self::with_max_bits(lengths, MAX_CODE_BITS)
    }

    /// Build a table whose codes must exactly fill a `max_bits` code space.
    pub fn with_max_bits(lengths: &[u8], max_bits: u8) -> InflateResult<Self> {
        if max_bits == 0 || max_bits > MAX_CODE_BITS {
            return Err(InflateError::invalid_argument(format!(
                "max code length must be 1..={}, got {}",
                MAX_CODE_BITS, max_bits
            )));
        }
        if lengths.len() > UNUSED as usize {
            return Err(InflateError::invalid_argument(format!(
                "too many symbols: {}",
                lengths.len()
            )));
        }

        // Count codes of each length
        let mut bl_count = [0u32; MAX_CODE_BITS as usize + 1];
        for (symbol, &len) in lengths.iter().enumerate() {
            if len > max_bits {
                return Err(InflateError::InvalidCodeLength {
                    symbol,
                    length: len,
                    max_bits,
                });
            }
            if len > 0 {
                bl_count[len as usize] += 1;
            }
        }

        // First code of each length; the running code must never outgrow
        // the space available at its length.
        let mut next_code = [0u32; MAX_CODE_BITS as usize + 1];
        let mut code = 0u32;
        for bits in 1..=max_bits as usize {
            code = (code + bl_count[bits - 1]) << 1;
            next_code[bits] = code;
            if code + bl_count[bits] > 1 << bits {
                return Err(InflateError::illegal_huffman_tree(format!(
                    "over-full: {} codes of length {} do not fit",
                    bl_count[bits], bits
                )));
            }
        }
        let end = code + bl_count[max_bits as usize];
        if end != 1 << max_bits {
            return Err(InflateError::illegal_huffman_tree(format!(
                "under-full: codes cover {} of {} slots at length {}",
                end,
                1u32 << max_bits,
                max_bits
            )));
        }

        let max_len = *lengths.iter().max().unwrap_or(&0);
        let mut symbols = vec![UNUSED; 2usize << max_len];
        let mut codes = vec![0u16; lengths.len()];

        // Assign codes to symbols
        for (symbol, &len) in lengths.iter().enumerate() {
            if len > 0 {
                let code = next_code[len as usize];
                next_code[len as usize] += 1;
                codes[symbol] = code as u16;
                symbols[((1u32 << len) | code) as usize] = symbol as u16;
            }
        }

        Ok(Self {
            symbols,
            lengths: lengths.to_vec(),
            codes,
            max_len,
        })
    }

    /// Decode one symbol, reading its code most-significant bit first.
    pub fn decode_symbol<R: Read>(&self, reader: &mut BitReader<R>) -> InflateResult<u16> {
        let start = reader.bit_position();
        let mut key = 1usize;

        for _ in 0..self.max_len {
            key = (key << 1) | reader.read_bit()? as usize;
            let symbol = self.symbols[key];
            if symbol != UNUSED {
                return Ok(symbol);
            }
        }

        Err(InflateError::CorruptHuffmanStream { bit_offset: start })
    }

    /// Longest code length in use
    pub fn max_code_length(&self) -> u8 {
        self.max_len
    }

    /// Size of the alphabet the table was built for
    pub fn num_symbols(&self) -> usize {
        self.lengths.len()
    }

    /// Code length of `symbol`, 0 if unused or out of range
    pub fn code_length(&self, symbol: usize) -> u8 {
        self.lengths.get(symbol).copied().unwrap_or(0)
    }

    /// Canonical `(code, length)` of `symbol`, None if it has no code
    pub fn code(&self, symbol: usize) -> Option<(u16, u8)> {
        match self.code_length(symbol) {
            0 => None,
            len => Some((self.codes[symbol], len)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Pack Huffman codes MSB-first into DEFLATE's LSB-first byte order.
    fn pack_codes(table: &CanonicalHuffmanTable, symbols: &[usize]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut acc = 0u32;
        let mut nbits = 0u32;
        for &symbol in symbols {
            let (code, len) = table.code(symbol).unwrap();
            for i in (0..len).rev() {
                acc |= (((code >> i) & 1) as u32) << nbits;
                nbits += 1;
                if nbits == 8 {
                    out.push(acc as u8);
                    acc = 0;
                    nbits = 0;
                }
            }
        }
        if nbits > 0 {
            out.push(acc as u8);
        }
        out
    }

    #[test]
    fn test_rfc1951_example_codes() {
        // RFC 1951 §3.2.2: lengths (3, 3, 3, 3, 3, 2, 4, 4) for A..H
        let table = CanonicalHuffmanTable::new(&[3, 3, 3, 3, 3, 2, 4, 4]).unwrap();

        assert_eq!(table.code(0), Some((0b010, 3)));
        assert_eq!(table.code(1), Some((0b011, 3)));
        assert_eq!(table.code(4), Some((0b110, 3)));
        assert_eq!(table.code(5), Some((0b00, 2)));
        assert_eq!(table.code(6), Some((0b1110, 4)));
        assert_eq!(table.code(7), Some((0b1111, 4)));
        assert_eq!(table.max_code_length(), 4);
        assert_eq!(table.num_symbols(), 8);
    }

    #[test]
    fn test_decode_all_symbols() {
        let lengths = [3, 3, 3, 3, 3, 2, 4, 4];
        let table = CanonicalHuffmanTable::new(&lengths).unwrap();
        let message = [5, 0, 7, 6, 1, 2, 3, 4, 5, 5];
        let packed = pack_codes(&table, &message);

        let mut reader = BitReader::new(&packed[..]);
        for &expected in &message {
            assert_eq!(table.decode_symbol(&mut reader).unwrap() as usize, expected);
        }
    }

    #[test]
    fn test_two_symbol_code() {
        let table = CanonicalHuffmanTable::new(&[1, 1]).unwrap();
        // 0b10 in LSB-first order: first bit 0 -> symbol 0, second bit 1 -> symbol 1
        let data = [0b10u8];
        let mut reader = BitReader::new(&data[..]);
        assert_eq!(table.decode_symbol(&mut reader).unwrap(), 0);
        assert_eq!(table.decode_symbol(&mut reader).unwrap(), 1);
    }

    #[test]
    fn test_unused_symbols_are_skipped() {
        let table = CanonicalHuffmanTable::new(&[0, 1, 0, 2, 2]).unwrap();
        assert_eq!(table.code(0), None);
        assert_eq!(table.code(1), Some((0b0, 1)));
        assert_eq!(table.code(3), Some((0b10, 2)));
        assert_eq!(table.code(4), Some((0b11, 2)));
        assert_eq!(table.code(99), None);
    }

    #[test]
    fn test_under_full_rejected() {
        // One code of length 1 leaves half the space unused
        assert!(matches!(
            CanonicalHuffmanTable::new(&[1]),
            Err(InflateError::IllegalHuffmanTree(_))
        ));
        assert!(matches!(
            CanonicalHuffmanTable::new(&[2, 2, 2]),
            Err(InflateError::IllegalHuffmanTree(_))
        ));
    }

    #[test]
    fn test_all_zero_rejected() {
        assert!(matches!(
            CanonicalHuffmanTable::new(&[0, 0, 0]),
            Err(InflateError::IllegalHuffmanTree(_))
        ));
        assert!(matches!(
            CanonicalHuffmanTable::new(&[]),
            Err(InflateError::IllegalHuffmanTree(_))
        ));
    }

    #[test]
    fn test_over_full_rejected() {
        assert!(matches!(
            CanonicalHuffmanTable::new(&[1, 1, 1]),
            Err(InflateError::IllegalHuffmanTree(_))
        ));
        assert!(matches!(
            CanonicalHuffmanTable::new(&[1, 2, 2, 2]),
            Err(InflateError::IllegalHuffmanTree(_))
        ));
    }

    #[test]
    fn test_code_length_too_long() {
        let mut lengths = vec![1u8, 2, 3];
        lengths.push(16);
        match CanonicalHuffmanTable::new(&lengths) {
            Err(InflateError::InvalidCodeLength { symbol, length, .. }) => {
                assert_eq!(symbol, 3);
                assert_eq!(length, 16);
            }
            other => panic!("expected InvalidCodeLength, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_max_bits() {
        // Complete at 7 bits, the code length alphabet limit
        let table = CanonicalHuffmanTable::with_max_bits(&[1, 2, 3, 4, 5, 6, 7, 7], 7).unwrap();
        assert_eq!(table.max_code_length(), 7);

        assert!(matches!(
            CanonicalHuffmanTable::with_max_bits(&[8, 8], 7),
            Err(InflateError::InvalidCodeLength { .. })
        ));
        assert!(matches!(
            CanonicalHuffmanTable::with_max_bits(&[1, 1], 0),
            Err(InflateError::InvalidArgument(_))
        ));
        assert!(matches!(
            CanonicalHuffmanTable::with_max_bits(&[1, 1], 16),
            Err(InflateError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_max_length_codes() {
        // 1, 2, ..., 14, 15, 15 is the deepest complete code DEFLATE allows
        let mut lengths: Vec<u8> = (1..=15).collect();
        lengths.push(15);
        let table = CanonicalHuffmanTable::new(&lengths).unwrap();
        assert_eq!(table.code(15), Some((0x7FFF, 15)));

        let packed = pack_codes(&table, &[15, 0, 14]);
        let mut reader = BitReader::new(&packed[..]);
        assert_eq!(table.decode_symbol(&mut reader).unwrap(), 15);
        assert_eq!(table.decode_symbol(&mut reader).unwrap(), 0);
        assert_eq!(table.decode_symbol(&mut reader).unwrap(), 14);
        assert_eq!(reader.bit_position(), 15 + 1 + 15);
    }

    #[test]
    fn test_truncated_symbol_is_end_of_input() {
        let table = CanonicalHuffmanTable::new(&[1, 2, 3, 3]).unwrap();
        let data: [u8; 0] = [];
        let mut reader = BitReader::new(&data[..]);
        assert!(matches!(
            table.decode_symbol(&mut reader),
            Err(InflateError::UnexpectedEndOfInput { .. })
        ));
    }

    /// Turn arbitrary weights into a complete set of code lengths by
    /// building a Huffman tree over them.
    fn lengths_from_weights(weights: &[u32]) -> Vec<u8> {
        let mut nodes: Vec<(u64, Vec<usize>)> = weights
            .iter()
            .enumerate()
            .map(|(i, &w)| (w as u64 + 1, vec![i]))
            .collect();
        let mut lengths = vec![0u8; weights.len()];
        while nodes.len() > 1 {
            nodes.sort_by(|a, b| b.0.cmp(&a.0));
            let (wa, a) = nodes.pop().unwrap();
            let (wb, b) = nodes.pop().unwrap();
            for &s in a.iter().chain(b.iter()) {
                lengths[s] += 1;
            }
            nodes.push((wa + wb, a.into_iter().chain(b).collect()));
        }
        lengths
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]
        #[test]
        fn prop_complete_codes_roundtrip(
            weights in proptest::collection::vec(0u32..64, 2..40),
            picks in proptest::collection::vec(any::<prop::sample::Index>(), 1..64)
        ) {
            let lengths = lengths_from_weights(&weights);
            prop_assume!(lengths.iter().all(|&l| l <= MAX_CODE_BITS));

            let table = CanonicalHuffmanTable::new(&lengths).unwrap();
            let message: Vec<usize> = picks.iter().map(|ix| ix.index(lengths.len())).collect();
            let packed = pack_codes(&table, &message);

            let mut reader = BitReader::new(&packed[..]);
            for &expected in &message {
                prop_assert_eq!(table.decode_symbol(&mut reader).unwrap() as usize, expected);
            }
        }

        #[test]
        fn prop_dropping_a_code_makes_it_under_full(
            weights in proptest::collection::vec(0u32..64, 3..40),
            victim in any::<prop::sample::Index>()
        ) {
            let mut lengths = lengths_from_weights(&weights);
            prop_assume!(lengths.iter().all(|&l| l <= MAX_CODE_BITS));

            let victim = victim.index(lengths.len());
            lengths[victim] = 0;
            prop_assert!(CanonicalHuffmanTable::new(&lengths).is_err());
        }
    }
}
