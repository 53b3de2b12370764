//! ferroflate CLI
//!
//! A Pure Rust DEFLATE/zlib compression utility.

use clap::{Parser, Subcommand};
use ferroflate::{Framing, compress_with_level, decompress};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ferroflate")]
#[command(author, version, about = "Pure Rust DEFLATE/zlib compression utility")]
#[command(long_about = "
ferroflate compresses and decompresses files using the DEFLATE
compressed data format (RFC 1951), either bare or inside a zlib
container with an Adler-32 integrity check (RFC 1950).

Examples:
  ferroflate compress input.txt output.zz
  ferroflate compress --level 9 input.txt output.zz
  ferroflate compress --raw input.txt output.deflate
  ferroflate decompress output.zz restored.txt
  ferroflate decompress --raw output.deflate restored.txt
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file
    #[command(alias = "c")]
    Compress {
        /// File to compress
        input: PathBuf,

        /// Destination for the compressed stream
        output: PathBuf,

        /// Compression level (0 = stored, 1 = fastest, 9 = best)
        #[arg(short, long, default_value_t = 6)]
        level: u8,

        /// Emit a bare DEFLATE stream without the zlib container
        #[arg(short, long)]
        raw: bool,

        /// Show size statistics
        #[arg(short, long)]
        verbose: bool,
    },

    /// Decompress a file
    #[command(alias = "d")]
    Decompress {
        /// File to decompress
        input: PathBuf,

        /// Destination for the restored bytes
        output: PathBuf,

        /// Treat the input as a bare DEFLATE stream
        #[arg(short, long)]
        raw: bool,

        /// Show size statistics
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compress {
            input,
            output,
            level,
            raw,
            verbose,
        } => cmd_compress(&input, &output, level, raw, verbose),
        Commands::Decompress {
            input,
            output,
            raw,
            verbose,
        } => cmd_decompress(&input, &output, raw, verbose),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn framing_for(raw: bool) -> Framing {
    if raw { Framing::Raw } else { Framing::Zlib }
}

fn cmd_compress(
    input: &PathBuf,
    output: &PathBuf,
    level: u8,
    raw: bool,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let compressed = compress_with_level(&data, framing_for(raw), level)?;
    fs::write(output, &compressed)?;

    if verbose {
        let ratio = if compressed.is_empty() {
            0.0
        } else {
            data.len() as f64 / compressed.len() as f64
        };
        println!(
            "{} -> {}: {} -> {} bytes ({:.2}x, level {})",
            input.display(),
            output.display(),
            data.len(),
            compressed.len(),
            ratio,
            level
        );
    }

    Ok(())
}

fn cmd_decompress(
    input: &PathBuf,
    output: &PathBuf,
    raw: bool,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let decompressed = decompress(&data, framing_for(raw))?;
    fs::write(output, &decompressed)?;

    if verbose {
        println!(
            "{} -> {}: {} -> {} bytes",
            input.display(),
            output.display(),
            data.len(),
            decompressed.len()
        );
    }

    Ok(())
}
