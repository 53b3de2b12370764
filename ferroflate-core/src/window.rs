//! Decoder output buffer that doubles as the back-reference window.
//!
//! DEFLATE back-references reach at most 32 KiB into previously produced
//! output. Since the codec returns the whole decompressed buffer anyway,
//! the output `Vec` itself serves as the window; the only invariant to
//! enforce is that a match never reaches past the bytes produced so far.

use crate::error::{FlateError, Result};

/// Maximum back-reference distance for DEFLATE (32 KiB).
pub const MAX_DISTANCE: usize = 32768;

/// Growable output buffer with validated back-reference copies.
#[derive(Debug, Default)]
pub struct OutputWindow {
    data: Vec<u8>,
}

impl OutputWindow {
    /// Create an empty output window.
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Create an output window with a capacity hint.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes produced so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether no bytes have been produced yet.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a single literal byte.
    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.data.push(byte);
    }

    /// Append a run of literal bytes (stored blocks).
    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Copy `length` bytes starting `distance` bytes back.
    ///
    /// Overlapping copies repeat the source region, which is how DEFLATE
    /// encodes runs (e.g. distance 1 replicates the last byte).
    pub fn copy_match(&mut self, distance: usize, length: usize, bit_position: u64) -> Result<()> {
        if distance == 0 || distance > self.data.len() || distance > MAX_DISTANCE {
            return Err(FlateError::malformed_block(
                bit_position,
                format!(
                    "back-reference distance {} exceeds {} reachable bytes",
                    distance,
                    self.data.len().min(MAX_DISTANCE)
                ),
            ));
        }

        let start = self.data.len() - distance;
        self.data.reserve(length);
        for i in 0..length {
            let byte = self.data[start + (i % distance)];
            self.data.push(byte);
        }

        Ok(())
    }

    /// Borrow the produced output.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Take ownership of the produced output.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_then_match() {
        let mut window = OutputWindow::new();
        window.extend_from_slice(b"abc");
        window.copy_match(3, 3, 0).unwrap();
        assert_eq!(window.as_slice(), b"abcabc");
    }

    #[test]
    fn test_overlapping_copy() {
        let mut window = OutputWindow::new();
        window.push(b'x');
        window.copy_match(1, 5, 0).unwrap();
        assert_eq!(window.as_slice(), b"xxxxxx");
    }

    #[test]
    fn test_partial_overlap() {
        let mut window = OutputWindow::new();
        window.extend_from_slice(b"ab");
        window.copy_match(2, 5, 0).unwrap();
        assert_eq!(window.as_slice(), b"abababa");
    }

    #[test]
    fn test_distance_too_far() {
        let mut window = OutputWindow::new();
        window.extend_from_slice(b"ab");
        let err = window.copy_match(3, 1, 0).unwrap_err();
        assert!(matches!(err, FlateError::MalformedBlock { .. }));
    }

    #[test]
    fn test_distance_into_empty_output() {
        let mut window = OutputWindow::new();
        let err = window.copy_match(1, 1, 0).unwrap_err();
        assert!(matches!(err, FlateError::MalformedBlock { .. }));
    }

    #[test]
    fn test_distance_beyond_window_limit() {
        let mut window = OutputWindow::with_capacity(MAX_DISTANCE + 16);
        window.extend_from_slice(&vec![0u8; MAX_DISTANCE + 16]);
        window.copy_match(MAX_DISTANCE, 4, 0).unwrap();
        let err = window.copy_match(MAX_DISTANCE + 1, 4, 0).unwrap_err();
        assert!(matches!(err, FlateError::MalformedBlock { .. }));
    }
}
