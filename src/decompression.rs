//! File and stdin decompression driver
//!
//! Files are memory-mapped and decoded straight from the mapping; stdin is
//! read through a `BufReader`. Either way the input is handed to the gzip
//! member reader, or directly to the DEFLATE decoder with `--raw`.

use std::fs::{self, File};
use std::io::{self, stdin, stdout, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::{debug, info};
use memmap2::Mmap;

use crate::cli::InflateArgs;
use crate::deflate_decoder::DeflateDecoder;
use crate::error::{InflateError, InflateResult};
use crate::gzip::{decompress_gzip, GzipMember};
use crate::utils::{compression_ratio, format_percentage, format_size, output_path};

/// Buffer size for streaming input and output
const STREAM_BUFFER_SIZE: usize = 256 * 1024;

/// What a decoded input produced
#[derive(Debug, Default)]
pub struct DecodeOutcome {
    pub output_len: u64,
    /// Gzip members, empty for raw streams
    pub members: Vec<GzipMember>,
}

/// Decode a gzip stream, or a bare DEFLATE stream when `raw` is set.
pub fn decode_stream<R: BufRead, W: Write>(
    input: R,
    writer: &mut W,
    raw: bool,
) -> InflateResult<DecodeOutcome> {
    if raw {
        let mut decoder = DeflateDecoder::new(input);
        let output_len = decoder.decode(writer)?;
        debug!(
            "raw stream: {} blocks, {} bytes",
            decoder.blocks().len(),
            output_len
        );
        return Ok(DecodeOutcome {
            output_len,
            members: Vec::new(),
        });
    }

    let summary = decompress_gzip(input, writer)?;
    Ok(DecodeOutcome {
        output_len: summary.total_output,
        members: summary.members,
    })
}

pub fn decompress_file(filename: &str, args: &InflateArgs) -> InflateResult<i32> {
    if filename == "-" {
        return decompress_stdin(args);
    }

    let input_path = Path::new(filename);
    if !input_path.exists() {
        return Err(InflateError::FileNotFound(filename.to_string()));
    }
    if input_path.is_dir() {
        return Err(InflateError::invalid_argument(format!(
            "{} is a directory",
            filename
        )));
    }

    let input_file = File::open(input_path)?;
    let file_size = input_file.metadata()?.len();
    // Zero-length files cannot be mapped on every platform
    let mmap = if file_size == 0 {
        None
    } else {
        Some(unsafe { Mmap::map(&input_file)? })
    };
    let data: &[u8] = mmap.as_deref().unwrap_or(&[]);

    if args.list {
        let outcome = decode_stream(data, &mut io::sink(), args.raw)?;
        print_list_entry(filename, file_size, &outcome, args);
        return Ok(0);
    }

    if args.test {
        let outcome = decode_stream(data, &mut io::sink(), args.raw)?;
        if args.verbose {
            eprintln!("{}:\tOK ({})", filename, format_size(outcome.output_len));
        }
        return Ok(0);
    }

    if args.stdout {
        let stdout = stdout();
        let mut writer = BufWriter::with_capacity(STREAM_BUFFER_SIZE, stdout.lock());
        let outcome = decode_stream(data, &mut writer, args.raw)?;
        writer.flush()?;
        if args.verbose {
            print_decompression_stats(filename, file_size, outcome.output_len, None);
        }
        return Ok(0);
    }

    let output_path = output_path(input_path, &args.suffix).ok_or_else(|| {
        InflateError::invalid_argument(format!("{}: unknown suffix -- ignored", filename))
    })?;
    if output_path.exists() && !args.force {
        return Err(InflateError::invalid_argument(format!(
            "Output file {} already exists",
            output_path.display()
        )));
    }

    let result = write_output(data, &output_path, args.raw);
    match result {
        Ok(outcome) => {
            if args.verbose {
                print_decompression_stats(
                    filename,
                    file_size,
                    outcome.output_len,
                    Some(&output_path),
                );
            }
            drop(mmap);
            if !args.keep {
                fs::remove_file(input_path)?;
            }
            info!("{} -> {}", filename, output_path.display());
            Ok(0)
        }
        Err(e) => {
            if output_path.exists() {
                let _ = fs::remove_file(&output_path);
            }
            Err(e)
        }
    }
}

fn write_output(data: &[u8], output_path: &Path, raw: bool) -> InflateResult<DecodeOutcome> {
    let output_file = File::create(output_path)?;
    let mut writer = BufWriter::with_capacity(STREAM_BUFFER_SIZE, output_file);
    let outcome = decode_stream(data, &mut writer, raw)?;
    writer.flush()?;
    Ok(outcome)
}

pub fn decompress_stdin(args: &InflateArgs) -> InflateResult<i32> {
    let stdin = stdin();
    let input = BufReader::with_capacity(STREAM_BUFFER_SIZE, stdin.lock());

    if args.list || args.test {
        let outcome = decode_stream(input, &mut io::sink(), args.raw)?;
        if args.list {
            // Compressed size is unknown without reading the members twice
            print_list_entry("-", 0, &outcome, args);
        }
        return Ok(0);
    }

    let stdout = stdout();
    let mut output = BufWriter::with_capacity(STREAM_BUFFER_SIZE, stdout.lock());
    let outcome = decode_stream(input, &mut output, args.raw)?;
    output.flush()?;

    if args.verbose {
        eprintln!("stdin: {}", format_size(outcome.output_len));
    }
    Ok(0)
}

/// Column headings for `-l`
pub fn print_list_header(args: &InflateArgs) {
    if args.verbose {
        println!(
            "{:>10} {:<6} {:<24} {:>10} {:>19} {:>19} {:>6} uncompressed_name",
            "members", "type", "os", "mtime", "compressed", "uncompressed", "ratio"
        );
    } else {
        println!(
            "{:>19} {:>19} {:>6} uncompressed_name",
            "compressed", "uncompressed", "ratio"
        );
    }
}

fn print_list_entry(filename: &str, compressed: u64, outcome: &DecodeOutcome, args: &InflateArgs) {
    let first = outcome.members.first().map(|m| &m.header);
    let name = first
        .and_then(|h| h.filename_lossy())
        .or_else(|| {
            output_path(Path::new(filename), &args.suffix).map(|p| p.display().to_string())
        })
        .unwrap_or_else(|| filename.to_string());
    let ratio = compression_ratio(compressed, outcome.output_len);

    if args.verbose {
        println!(
            "{:>10} {:<6} {:<24} {:>10} {:>19} {:>19} {:>6} {}",
            outcome.members.len(),
            first.map(|h| h.content_type()).unwrap_or("binary"),
            first.map(|h| h.os_name()).unwrap_or("unknown"),
            first.map(|h| h.mtime).unwrap_or(0),
            compressed,
            outcome.output_len,
            ratio,
            name
        );
    } else {
        println!(
            "{:>19} {:>19} {:>6} {}",
            compressed, outcome.output_len, ratio, name
        );
    }
}

fn print_decompression_stats(
    filename: &str,
    input_size: u64,
    output_size: u64,
    output_path: Option<&Path>,
) {
    let saved = compression_ratio(input_size, output_size);
    match output_path {
        Some(path) => eprintln!(
            "{}:\t{} -- replaced with {} ({} -> {}, {} of original)",
            filename,
            saved,
            path.display(),
            format_size(input_size),
            format_size(output_size),
            format_percentage(input_size, output_size)
        ),
        None => eprintln!(
            "{}:\t{} ({} -> {})",
            filename,
            saved,
            format_size(input_size),
            format_size(output_size)
        ),
    }
}
