//! # Ferroflate Core
//!
//! Core components for the ferroflate DEFLATE/zlib codec.
//!
//! This crate provides the building blocks the codec layer is assembled
//! from:
//!
//! - [`bitstream`]: LSB-first bit-level I/O for Huffman codes and headers
//! - [`checksum`]: Adler-32 for the zlib trailer
//! - [`window`]: decoder output buffer with validated back-references
//! - [`error`]: error types
//!
//! ## Example
//!
//! ```rust
//! use ferroflate_core::bitstream::BitReader;
//! use ferroflate_core::checksum::adler32;
//! use std::io::Cursor;
//!
//! let data = vec![0xAB, 0xCD];
//! let mut reader = BitReader::new(Cursor::new(data));
//! let bits = reader.read_bits(12).unwrap();
//! assert_eq!(bits, 0xDAB);
//!
//! assert_eq!(adler32(b"Hello"), 0x058C01F5);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bitstream;
pub mod checksum;
pub mod error;
pub mod window;

// Re-exports for convenience
pub use bitstream::{BitReader, BitWriter};
pub use checksum::{Adler32, adler32};
pub use error::{FlateError, Result};
pub use window::OutputWindow;
