//! Error types for ferroflate operations.
//!
//! Every way a compressed stream can be rejected maps to exactly one
//! variant of [`FlateError`], so callers can distinguish a truncated
//! stream from an invalid code table or a bad checksum.

use std::io;
use thiserror::Error;

/// The main error type for ferroflate operations.
#[derive(Debug, Error)]
pub enum FlateError {
    /// I/O error from underlying reader/writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stream ended before the decoder was done with it.
    #[error("Unexpected end of stream: expected {expected} more bytes")]
    UnexpectedEof {
        /// Number of bytes that were expected but not available.
        expected: usize,
    },

    /// A transmitted set of Huffman code lengths does not describe a
    /// usable prefix code.
    #[error("Invalid code table: {message}")]
    InvalidCodeTable {
        /// Description of the violation.
        message: String,
    },

    /// Structural corruption inside a DEFLATE block.
    #[error("Malformed block at bit {bit_position}: {message}")]
    MalformedBlock {
        /// Bit position where the corruption was detected.
        bit_position: u64,
        /// Description of the corruption.
        message: String,
    },

    /// Invalid container header (zlib CMF/FLG).
    #[error("Invalid header: {message}")]
    InvalidHeader {
        /// Description of the header error.
        message: String,
    },

    /// Adler-32 trailer does not match the decompressed data.
    #[error("Checksum mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Checksum value stored in the stream.
        expected: u32,
        /// Checksum computed from the decompressed data.
        computed: u32,
    },
}

/// Result type alias for ferroflate operations.
pub type Result<T> = std::result::Result<T, FlateError>;

impl FlateError {
    /// Create an unexpected end-of-stream error.
    pub fn unexpected_eof(expected: usize) -> Self {
        Self::UnexpectedEof { expected }
    }

    /// Create an invalid code table error.
    pub fn invalid_code_table(message: impl Into<String>) -> Self {
        Self::InvalidCodeTable {
            message: message.into(),
        }
    }

    /// Create a malformed block error.
    pub fn malformed_block(bit_position: u64, message: impl Into<String>) -> Self {
        Self::MalformedBlock {
            bit_position,
            message: message.into(),
        }
    }

    /// Create an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Create a checksum mismatch error.
    pub fn checksum_mismatch(expected: u32, computed: u32) -> Self {
        Self::ChecksumMismatch { expected, computed }
    }
}
