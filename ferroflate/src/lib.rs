//! DEFLATE (RFC 1951) and zlib (RFC 1950) compression.
//!
//! A from-scratch implementation of the DEFLATE compressed data format
//! and its zlib container: LZ77 match finding over a 32 KiB window,
//! canonical Huffman coding with fixed and dynamic tables, and Adler-32
//! integrity checking.
//!
//! # Example
//!
//! ```
//! use ferroflate::{Framing, compress, decompress};
//!
//! let data = b"hello hello hello hello";
//! let compressed = compress(data, Framing::Zlib).unwrap();
//! let restored = decompress(&compressed, Framing::Zlib).unwrap();
//! assert_eq!(restored, data);
//! ```
//!
//! Raw DEFLATE streams (no header or checksum) use [`Framing::Raw`],
//! or the [`deflate`] and [`inflate`] functions directly.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod deflate;
pub mod huffman;
pub mod inflate;
pub mod lz77;
pub mod tables;
pub mod zlib;

pub use deflate::{Deflater, deflate, deflate_with_level};
pub use ferroflate_core::error::{FlateError, Result};
pub use inflate::{Inflater, inflate};
pub use zlib::{zlib_compress, zlib_decompress};

/// Default compression level.
pub const DEFAULT_LEVEL: u8 = 6;

/// Stream container selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// zlib container: header, DEFLATE stream, Adler-32 trailer.
    #[default]
    Zlib,
    /// Bare DEFLATE stream.
    Raw,
}

/// Compress `data` at the default level.
pub fn compress(data: &[u8], framing: Framing) -> Result<Vec<u8>> {
    compress_with_level(data, framing, DEFAULT_LEVEL)
}

/// Compress `data` at an explicit level (0 = stored, 1 = fastest,
/// 9 = best; values above 9 are clamped).
pub fn compress_with_level(data: &[u8], framing: Framing, level: u8) -> Result<Vec<u8>> {
    match framing {
        Framing::Zlib => zlib_compress(data, level),
        Framing::Raw => deflate_with_level(data, level),
    }
}

/// Decompress `data`, expecting the given framing.
pub fn decompress(data: &[u8], framing: Framing) -> Result<Vec<u8>> {
    match framing {
        Framing::Zlib => zlib_decompress(data),
        Framing::Raw => inflate(data),
    }
}
