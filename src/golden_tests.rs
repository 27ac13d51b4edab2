//! Golden Tests: Byte-exact verification of decompression output
//!
//! Each case compresses known data with flate2 and checks that the decoder
//! reproduces it exactly, and agrees with flate2's own decoder.

use std::io::{Read, Write};

use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::deflate_decoder::{inflate_to_vec, BlockType, DeflateDecoder};

fn compress(data: &[u8], level: Compression) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), level);
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Reference output from flate2's decoder
fn reference_inflate(compressed: &[u8]) -> Vec<u8> {
    let mut output = Vec::new();
    flate2::read::DeflateDecoder::new(compressed)
        .read_to_end(&mut output)
        .expect("flate2 failed");
    output
}

fn check_golden(name: &str, original: &[u8], level: Compression) -> Vec<u8> {
    let compressed = compress(original, level);
    let reference = reference_inflate(&compressed);
    let output = inflate_to_vec(&compressed).expect("inflate failed");

    assert_eq!(output.len(), reference.len(), "{}: size mismatch", name);
    assert_slices_eq!(output, reference, name);
    assert_slices_eq!(output, original, name);
    compressed
}

/// Deterministic pseudo-random bytes (xorshift)
fn noise(len: usize, mut state: u32) -> Vec<u8> {
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state as u8
        })
        .collect()
}

#[test]
fn golden_simple_literals() {
    let original = b"Hello, World! This is a test of simple literal data.";
    check_golden("simple_literals", original, Compression::default());
}

#[test]
fn golden_rle_pattern() {
    let original: Vec<u8> = (0..10000).map(|i| (i % 256) as u8).collect();
    check_golden("rle_pattern", &original, Compression::default());
}

#[test]
fn golden_short_distance() {
    let original = b"abcabcabcabcabcabcabcabc".repeat(1000);
    check_golden("short_distance", &original, Compression::best());
}

#[test]
fn golden_long_distance() {
    // A random block repeated once the window has nearly filled
    let block = noise(20_000, 0x9E37_79B9);
    let mut original = block.clone();
    original.extend_from_slice(&noise(12_000, 7));
    original.extend_from_slice(&block);
    check_golden("long_distance", &original, Compression::best());
}

#[test]
fn golden_multi_block() {
    let original = b"Multi block test data. ".repeat(50_000);
    let compressed = check_golden("multi_block", &original, Compression::default());

    let mut decoder = DeflateDecoder::new(&compressed[..]);
    decoder.decode(&mut std::io::sink()).unwrap();
    let blocks = decoder.blocks();
    assert!(blocks.len() > 1, "expected several blocks, got {}", blocks.len());
    assert!(blocks.last().unwrap().is_final);
    assert!(blocks[..blocks.len() - 1].iter().all(|b| !b.is_final));

    let sum: u64 = blocks.iter().map(|b| b.output_len).sum();
    assert_eq!(sum, original.len() as u64);
}

#[test]
fn golden_binary() {
    let original = noise(100_000, 0xDEAD_BEEF);
    check_golden("binary", &original, Compression::default());
}

#[test]
fn golden_stored_blocks() {
    // Level 0 emits only stored blocks, each at most 65535 bytes
    let original = noise(200_000, 12345);
    let compressed = check_golden("stored", &original, Compression::none());

    let mut decoder = DeflateDecoder::new(&compressed[..]);
    decoder.decode(&mut std::io::sink()).unwrap();
    assert!(decoder
        .blocks()
        .iter()
        .all(|b| b.block_type == BlockType::Stored));
}

#[test]
fn golden_max_length_match() {
    let original = b"X".repeat(10000);
    check_golden("max_length_match", &original, Compression::best());
}

#[test]
fn golden_mixed_text_and_binary() {
    let mut original = Vec::new();
    for i in 0..200 {
        original.extend_from_slice(format!("line {} of the log file\n", i).as_bytes());
        original.extend_from_slice(&noise(64, i + 1));
    }
    for level in [1, 6, 9] {
        check_golden("mixed", &original, Compression::new(level));
    }
}
