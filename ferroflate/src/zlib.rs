//! zlib framing (RFC 1950).
//!
//! Wraps a DEFLATE stream in a two-byte header and a big-endian
//! Adler-32 trailer. The header's FCHECK bits make the CMF/FLG pair a
//! multiple of 31; FLEVEL advertises the compression level and is
//! ignored on decode. Preset dictionaries (FDICT) are not supported.

use crate::deflate::Deflater;
use crate::inflate::Inflater;
use ferroflate_core::error::{FlateError, Result};
use ferroflate_core::{Adler32, BitReader, adler32};

/// Compression method: DEFLATE.
const CM_DEFLATE: u8 = 8;

/// CMF byte for DEFLATE with a 32 KiB window (CINFO=7).
const CMF: u8 = 0x78;

/// FLEVEL advertisement for a compression level (RFC 1950 Section 2.2).
fn flevel(level: u8) -> u8 {
    match level {
        0..=2 => 0, // fastest
        3..=5 => 1, // fast
        6 => 2,     // default
        _ => 3,     // maximum
    }
}

/// Compress `data` into a zlib stream at the given level.
pub fn zlib_compress(data: &[u8], level: u8) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(data.len() / 2 + 64);

    let mut flg = flevel(level) << 6;
    let header = u16::from(CMF) << 8 | u16::from(flg);
    flg |= (31 - (header % 31) as u8) % 31;
    output.push(CMF);
    output.push(flg);

    Deflater::new(level).compress(data, &mut output)?;

    let checksum = adler32(data);
    output.extend_from_slice(&checksum.to_be_bytes());
    Ok(output)
}

/// Decompress a zlib stream, verifying header and checksum.
pub fn zlib_decompress(data: &[u8]) -> Result<Vec<u8>> {
    // 2 header bytes, at least 1 DEFLATE byte, 4 trailer bytes
    if data.len() < 7 {
        return Err(FlateError::unexpected_eof(7 - data.len()));
    }

    let cmf = data[0];
    let flg = data[1];

    if cmf & 0x0F != CM_DEFLATE {
        return Err(FlateError::invalid_header(format!(
            "unsupported compression method {}",
            cmf & 0x0F
        )));
    }
    if cmf >> 4 > 7 {
        return Err(FlateError::invalid_header(format!(
            "window size exponent {} exceeds 32 KiB",
            cmf >> 4
        )));
    }
    if (u16::from(cmf) << 8 | u16::from(flg)) % 31 != 0 {
        return Err(FlateError::invalid_header("header check bits failed"));
    }
    if flg & 0x20 != 0 {
        return Err(FlateError::invalid_header(
            "preset dictionaries are not supported",
        ));
    }

    let mut reader = BitReader::new(&data[2..]);
    let decompressed = Inflater::new().decompress(&mut reader)?;

    let mut trailer = [0u8; 4];
    reader.read_bytes(&mut trailer)?;
    let expected = u32::from_be_bytes(trailer);

    let mut hasher = Adler32::new();
    hasher.update(&decompressed);
    let computed = hasher.finish();

    if computed != expected {
        return Err(FlateError::checksum_mismatch(expected, computed));
    }

    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let data = b"zlib framed payload, repeated payload, framed payload";
        let compressed = zlib_compress(data, 6).unwrap();
        assert_eq!(zlib_decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_header_divisible_by_31() {
        for level in 0..=9 {
            let compressed = zlib_compress(b"check", level).unwrap();
            let header = u16::from(compressed[0]) << 8 | u16::from(compressed[1]);
            assert_eq!(header % 31, 0, "level {level}");
            assert_eq!(compressed[0], 0x78);
        }
    }

    #[test]
    fn test_flevel_advertised() {
        assert_eq!(zlib_compress(b"x", 1).unwrap()[1] >> 6, 0);
        assert_eq!(zlib_compress(b"x", 4).unwrap()[1] >> 6, 1);
        assert_eq!(zlib_compress(b"x", 6).unwrap()[1] >> 6, 2);
        assert_eq!(zlib_compress(b"x", 9).unwrap()[1] >> 6, 3);
    }

    #[test]
    fn test_corrupted_checksum() {
        let mut compressed = zlib_compress(b"payload under test", 6).unwrap();
        let last = compressed.len() - 1;
        compressed[last] ^= 0xFF;
        let err = zlib_decompress(&compressed).unwrap_err();
        assert!(matches!(err, FlateError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_wrong_compression_method() {
        let err = zlib_decompress(&[0x79, 0x00, 0, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, FlateError::InvalidHeader { .. }));
    }

    #[test]
    fn test_bad_check_bits() {
        // CMF 0x78 with FLG 0x00: 0x7800 % 31 != 0
        let err = zlib_decompress(&[0x78, 0x00, 0, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, FlateError::InvalidHeader { .. }));
    }

    #[test]
    fn test_preset_dictionary_rejected() {
        // CMF 0x78, FLG with FDICT set and valid FCHECK
        let mut flg = 0x20u8;
        let header = u16::from(0x78u8) << 8 | u16::from(flg);
        flg |= (31 - (header % 31) as u8) % 31;
        let err = zlib_decompress(&[0x78, flg, 0, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, FlateError::InvalidHeader { .. }));
    }

    #[test]
    fn test_truncated_trailer() {
        let compressed = zlib_compress(b"short", 6).unwrap();
        let err = zlib_decompress(&compressed[..compressed.len() - 2]).unwrap_err();
        assert!(matches!(err, FlateError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_short_input() {
        let err = zlib_decompress(&[0x78, 0x9C]).unwrap_err();
        assert!(matches!(err, FlateError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_empty_payload() {
        let compressed = zlib_compress(b"", 6).unwrap();
        assert_eq!(zlib_decompress(&compressed).unwrap(), b"");
        // Adler-32 of nothing is 1
        assert_eq!(&compressed[compressed.len() - 4..], &[0, 0, 0, 1]);
    }
}
