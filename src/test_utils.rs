//! Helpers shared by the unit tests: a byte-slice assertion that points at
//! the first differing byte, and a bit writer for hand-assembling streams.

use crate::huffman::CanonicalHuffmanTable;

#[macro_export]
macro_rules! assert_slices_eq {
    ($left:expr, $right:expr) => {
        $crate::assert_slices_eq!($left, $right, "slices differ")
    };
    ($left:expr, $right:expr, $msg:expr) => {
        let left = &$left[..];
        let right = &$right[..];
        if left != right {
            if left.len() != right.len() {
                panic!(
                    "assertion failed: `(left == right)`: {}\n  left len: {},\n right len: {}",
                    $msg,
                    left.len(),
                    right.len()
                );
            }
            for (i, (a, b)) in left.iter().zip(right.iter()).enumerate() {
                if a != b {
                    let start = i.saturating_sub(16);
                    let end = (i + 16).min(left.len());
                    panic!(
                        "assertion failed: `(left == right)`: {}\n at index {}\n  left: {:02X?}\n right: {:02X?}\n context:\n left:  {:02X?}\n right: {:02X?}",
                        $msg, i, a, b, &left[start..end], &right[start..end]
                    );
                }
            }
        }
    };
}

/// LSB-first bit writer, the mirror image of `BitReader`.
#[derive(Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    acc: u32,
    nbits: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `count` bits of `value`, low bit first (header fields, extra bits).
    pub fn write_bits(&mut self, value: u32, count: u8) {
        for i in 0..count {
            self.push_bit((value >> i) & 1);
        }
    }

    /// Write a Huffman code, high bit first.
    pub fn write_code(&mut self, code: u16, len: u8) {
        for i in (0..len).rev() {
            self.push_bit(((code >> i) & 1) as u32);
        }
    }

    /// Write the code `table` assigns to `symbol`.
    pub fn write_symbol(&mut self, table: &CanonicalHuffmanTable, symbol: usize) {
        let (code, len) = table
            .code(symbol)
            .unwrap_or_else(|| panic!("symbol {} has no code", symbol));
        self.write_code(code, len);
    }

    /// Pad with zero bits up to the next byte boundary.
    pub fn align(&mut self) {
        while self.nbits != 0 {
            self.push_bit(0);
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        assert_eq!(self.nbits, 0, "write_bytes needs a byte boundary");
        self.bytes.extend_from_slice(bytes);
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.align();
        self.bytes
    }

    fn push_bit(&mut self, bit: u32) {
        self.acc |= bit << self.nbits;
        self.nbits += 1;
        if self.nbits == 8 {
            self.bytes.push(self.acc as u8);
            self.acc = 0;
            self.nbits = 0;
        }
    }
}

/// Write a dynamic block header (BTYPE=10) for the given code lengths.
///
/// The code length code gives each of the literal lengths 0..=15 a 4-bit
/// code and leaves the repeat symbols unused, so every length is sent as is.
pub fn write_dynamic_header(
    w: &mut BitWriter,
    is_final: bool,
    litlen_lengths: &[u8],
    dist_lengths: &[u8],
) {
    assert!(litlen_lengths.len() >= 257 && !dist_lengths.is_empty());

    w.write_bits(is_final as u32, 1);
    w.write_bits(2, 2);
    w.write_bits((litlen_lengths.len() - 257) as u32, 5);
    w.write_bits((dist_lengths.len() - 1) as u32, 5);
    w.write_bits(19 - 4, 4);

    let mut codelen_lengths = [4u8; 19];
    codelen_lengths[16] = 0;
    codelen_lengths[17] = 0;
    codelen_lengths[18] = 0;
    for &symbol in crate::inflate_tables::CODE_LENGTH_ORDER.iter() {
        w.write_bits(codelen_lengths[symbol] as u32, 3);
    }

    let codelen_table = CanonicalHuffmanTable::new(&codelen_lengths).unwrap();
    for &len in litlen_lengths.iter().chain(dist_lengths.iter()) {
        w.write_symbol(&codelen_table, len as usize);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bit_reader::BitReader;

    #[test]
    fn test_bit_writer_mirrors_reader() {
        let mut w = BitWriter::new();
        w.write_bits(1, 1);
        w.write_bits(0b10, 2);
        w.write_bits(0x1234, 16);
        w.write_code(0b110, 3);
        let bytes = w.finish();

        let mut r = BitReader::new(&bytes[..]);
        assert_eq!(r.read_bits(1).unwrap(), 1);
        assert_eq!(r.read_bits(2).unwrap(), 0b10);
        assert_eq!(r.read_bits(16).unwrap(), 0x1234);
        assert_eq!(r.read_bit().unwrap(), 1);
        assert_eq!(r.read_bit().unwrap(), 1);
        assert_eq!(r.read_bit().unwrap(), 0);
    }

    #[test]
    fn test_assert_slices_eq_passes_on_equal() {
        let left = vec![1u8, 2, 3];
        let right = [1u8, 2, 3];
        assert_slices_eq!(left, right);
    }

    #[test]
    #[should_panic(expected = "at index 1")]
    fn test_assert_slices_eq_reports_index() {
        let left = vec![1u8, 2, 3];
        let right = [1u8, 9, 3];
        assert_slices_eq!(left, right, "demo");
    }
}
