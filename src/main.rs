//! rinflate - a gunzip-style front end for the rinflate DEFLATE decoder

use std::process;

use rinflate::cli::InflateArgs;
use rinflate::decompression;
use rinflate::error::InflateError;

const VERSION: &str = concat!("rinflate ", env!("CARGO_PKG_VERSION"));

fn main() {
    let result = run();

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("rinflate: {}", e);
            process::exit(1);
        }
    }
}

fn run() -> Result<i32, InflateError> {
    let args = InflateArgs::parse()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(args.log_level().to_string()),
    )
    .format_timestamp(None)
    .init();

    if args.version {
        println!("{}", VERSION);
        return Ok(0);
    }

    if args.help {
        print_help();
        return Ok(0);
    }

    if args.list {
        decompression::print_list_header(&args);
    }

    if args.files.is_empty() {
        return decompression::decompress_stdin(&args);
    }

    let mut exit_code = 0;
    for file in &args.files {
        match decompression::decompress_file(file, &args) {
            Ok(code) => {
                if code != 0 {
                    exit_code = code;
                }
            }
            Err(e) => {
                if !args.quiet {
                    eprintln!("rinflate: {}: {}", file, e);
                }
                exit_code = 1;
            }
        }
    }

    Ok(exit_code)
}

fn print_help() {
    println!("Usage: rinflate [OPTION]... [FILE]...");
    println!();
    println!("Decompress gzip FILEs in place (FILE.gz becomes FILE).");
    println!("With no FILE, or when FILE is -, read standard input.");
    println!();
    println!("Options:");
    println!("  -c, --stdout      Write to stdout, keep original files");
    println!("  -k, --keep        Keep original files");
    println!("  -f, --force       Overwrite existing output files");
    println!("  -t, --test        Test compressed file integrity");
    println!("  -l, --list        List compressed file contents");
    println!("  -S, --suffix SUF  Use suffix SUF instead of .gz");
    println!("      --raw         Input is a raw DEFLATE stream (no gzip header)");
    println!("  -q, --quiet       Suppress warnings");
    println!("  -v, --verbose     Verbose output (repeat for more)");
    println!("  -h, --help        Show this help");
    println!("  -V, --version     Show version");
    println!();
    println!("Default options can be set in the RINFLATE environment variable.");
    println!("RUST_LOG overrides the log level chosen by -q/-v.");
}
