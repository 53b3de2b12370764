//! DEFLATE block decoding (RFC 1951).
//!
//! Walks the block sequence until a block with BFINAL set has been
//! consumed, dispatching on BTYPE. Trailing bits in the final byte are
//! ignored; trailing whole bytes are left unread for the caller's
//! framing layer.

use crate::huffman::{DISTANCE_ALPHABET_SIZE, END_OF_BLOCK, HuffmanTree, LITLEN_ALPHABET_SIZE};
use crate::tables::{
    CODE_LENGTH_ORDER, decode_distance, decode_length, fixed_distance_tree, fixed_litlen_tree,
};
use ferroflate_core::error::{FlateError, Result};
use ferroflate_core::{BitReader, OutputWindow};
use std::io::Read;

/// DEFLATE decompressor.
#[derive(Debug, Default)]
pub struct Inflater {
    _private: (),
}

impl Inflater {
    /// Create a decompressor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decompress a complete DEFLATE stream from a byte slice.
    pub fn decompress_to_vec(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut reader = BitReader::new(data);
        self.decompress(&mut reader)
    }

    /// Decompress a complete DEFLATE stream from a bit reader, leaving
    /// the reader positioned at the first byte after the stream.
    pub fn decompress<R: Read>(&self, reader: &mut BitReader<R>) -> Result<Vec<u8>> {
        let mut window = OutputWindow::new();

        loop {
            let bfinal = reader.read_bit()?;
            let btype = reader.read_bits(2)?;

            match btype {
                0b00 => read_stored_block(reader, &mut window)?,
                0b01 => {
                    read_huffman_block(reader, &mut window, fixed_litlen_tree(), fixed_distance_tree())?;
                }
                0b10 => {
                    let (litlen_tree, dist_tree) = read_dynamic_header(reader)?;
                    read_huffman_block(reader, &mut window, &litlen_tree, &dist_tree)?;
                }
                _ => {
                    return Err(FlateError::malformed_block(
                        reader.bit_position(),
                        "reserved block type 3",
                    ));
                }
            }

            if bfinal {
                break;
            }
        }

        reader.align_to_byte();
        Ok(window.into_vec())
    }
}

/// Decompress a complete DEFLATE stream.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    Inflater::new().decompress_to_vec(data)
}

/// Stored block: align, LEN, one's-complement NLEN, raw bytes.
fn read_stored_block<R: Read>(reader: &mut BitReader<R>, window: &mut OutputWindow) -> Result<()> {
    reader.align_to_byte();

    let mut header = [0u8; 4];
    reader.read_bytes(&mut header)?;
    let len = u16::from_le_bytes([header[0], header[1]]);
    let nlen = u16::from_le_bytes([header[2], header[3]]);

    if len != !nlen {
        return Err(FlateError::malformed_block(
            reader.bit_position(),
            format!("stored block length check failed: LEN={len:#06x} NLEN={nlen:#06x}"),
        ));
    }

    let mut buf = vec![0u8; len as usize];
    reader.read_bytes(&mut buf)?;
    window.extend_from_slice(&buf);
    Ok(())
}

/// Decode symbols against a pair of Huffman trees until end-of-block.
fn read_huffman_block<R: Read>(
    reader: &mut BitReader<R>,
    window: &mut OutputWindow,
    litlen_tree: &HuffmanTree,
    dist_tree: &HuffmanTree,
) -> Result<()> {
    loop {
        let symbol = litlen_tree.decode(reader)?;

        match symbol {
            0..=255 => window.push(symbol as u8),
            END_OF_BLOCK => return Ok(()),
            257..=285 => {
                let extra_bits = crate::tables::LENGTH_EXTRA_BITS[(symbol - 257) as usize];
                let extra = reader.read_bits(extra_bits)? as u16;
                let length = decode_length(symbol, extra);

                let dist_symbol = dist_tree.decode(reader)?;
                if dist_symbol as usize >= DISTANCE_ALPHABET_SIZE {
                    return Err(FlateError::malformed_block(
                        reader.bit_position(),
                        format!("invalid distance code {dist_symbol}"),
                    ));
                }
                let dextra_bits = crate::tables::DISTANCE_EXTRA_BITS[dist_symbol as usize];
                let dextra = reader.read_bits(dextra_bits)? as u16;
                let distance = decode_distance(dist_symbol, dextra);

                window.copy_match(distance as usize, length as usize, reader.bit_position())?;
            }
            _ => {
                return Err(FlateError::malformed_block(
                    reader.bit_position(),
                    format!("invalid literal/length code {symbol}"),
                ));
            }
        }
    }
}

/// Parse a dynamic block header into its two Huffman trees
/// (RFC 1951 Section 3.2.7).
fn read_dynamic_header<R: Read>(reader: &mut BitReader<R>) -> Result<(HuffmanTree, HuffmanTree)> {
    let hlit = reader.read_bits(5)? as usize + 257;
    let hdist = reader.read_bits(5)? as usize + 1;
    let hclen = reader.read_bits(4)? as usize + 4;

    if hlit > LITLEN_ALPHABET_SIZE {
        return Err(FlateError::malformed_block(
            reader.bit_position(),
            format!("HLIT {hlit} exceeds {LITLEN_ALPHABET_SIZE} literal/length codes"),
        ));
    }
    if hdist > DISTANCE_ALPHABET_SIZE {
        return Err(FlateError::malformed_block(
            reader.bit_position(),
            format!("HDIST {hdist} exceeds {DISTANCE_ALPHABET_SIZE} distance codes"),
        ));
    }

    let mut cl_lengths = [0u8; 19];
    for &symbol in CODE_LENGTH_ORDER.iter().take(hclen) {
        cl_lengths[symbol] = reader.read_bits(3)? as u8;
    }
    let cl_tree = HuffmanTree::from_code_lengths(&cl_lengths)?;

    let lengths = read_encoded_lengths(reader, &cl_tree, hlit + hdist)?;

    let litlen_lengths = &lengths[..hlit];
    if litlen_lengths[256] == 0 {
        return Err(FlateError::invalid_code_table(
            "end-of-block symbol has no code",
        ));
    }

    let litlen_tree = HuffmanTree::from_code_lengths(litlen_lengths)?;
    let dist_tree = HuffmanTree::from_code_lengths(&lengths[hlit..])?;
    Ok((litlen_tree, dist_tree))
}

/// Decode `total` code lengths using the code length tree, expanding
/// the repeat codes 16, 17 and 18.
fn read_encoded_lengths<R: Read>(
    reader: &mut BitReader<R>,
    cl_tree: &HuffmanTree,
    total: usize,
) -> Result<Vec<u8>> {
    let mut lengths = Vec::with_capacity(total);

    while lengths.len() < total {
        let symbol = cl_tree.decode(reader)?;
        match symbol {
            0..=15 => lengths.push(symbol as u8),
            16 => {
                let Some(&previous) = lengths.last() else {
                    return Err(FlateError::malformed_block(
                        reader.bit_position(),
                        "repeat code with no previous length",
                    ));
                };
                let count = reader.read_bits(2)? as usize + 3;
                for _ in 0..count {
                    lengths.push(previous);
                }
            }
            17 => {
                let count = reader.read_bits(3)? as usize + 3;
                lengths.extend(std::iter::repeat_n(0u8, count));
            }
            18 => {
                let count = reader.read_bits(7)? as usize + 11;
                lengths.extend(std::iter::repeat_n(0u8, count));
            }
            _ => {
                return Err(FlateError::malformed_block(
                    reader.bit_position(),
                    format!("invalid code length symbol {symbol}"),
                ));
            }
        }
    }

    if lengths.len() != total {
        return Err(FlateError::malformed_block(
            reader.bit_position(),
            format!(
                "code length run overflows table: got {}, expected {total}",
                lengths.len()
            ),
        ));
    }

    Ok(lengths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deflate::{deflate, deflate_with_level};
    use ferroflate_core::BitWriter;

    #[test]
    fn test_stored_block() {
        // BFINAL=1 BTYPE=00, LEN=5, payload "hello"
        let mut data = vec![0x01, 0x05, 0x00, 0xFA, 0xFF];
        data.extend_from_slice(b"hello");
        assert_eq!(inflate(&data).unwrap(), b"hello");
    }

    #[test]
    fn test_stored_block_bad_nlen() {
        let mut data = vec![0x01, 0x05, 0x00, 0x00, 0x00];
        data.extend_from_slice(b"hello");
        let err = inflate(&data).unwrap_err();
        assert!(matches!(err, FlateError::MalformedBlock { .. }));
    }

    #[test]
    fn test_reserved_block_type() {
        // BFINAL=1 BTYPE=11
        let data = vec![0b0000_0111];
        let err = inflate(&data).unwrap_err();
        assert!(matches!(err, FlateError::MalformedBlock { .. }));
    }

    #[test]
    fn test_fixed_block_hand_built() {
        // "A" as literal 65 (code 0x41 + 0x30 = 0x71, 8 bits) then EOB
        let mut buf = Vec::new();
        {
            let mut bits = BitWriter::new(&mut buf);
            bits.write_bits(1, 1).unwrap(); // BFINAL
            bits.write_bits(0b01, 2).unwrap(); // BTYPE fixed

            let codes = crate::huffman::canonical_codes(&crate::tables::fixed_litlen_lengths());
            bits.write_bits(codes[65].code as u32, codes[65].length).unwrap();
            bits.write_bits(codes[256].code as u32, codes[256].length).unwrap();
            bits.flush().unwrap();
        }
        assert_eq!(inflate(&buf).unwrap(), b"A");
    }

    #[test]
    fn test_truncated_stream() {
        let compressed = deflate(b"some data that will be cut short").unwrap();
        for cut in 0..compressed.len() {
            let err = inflate(&compressed[..cut]).unwrap_err();
            assert!(
                matches!(
                    err,
                    FlateError::UnexpectedEof { .. } | FlateError::MalformedBlock { .. }
                ),
                "cut at {cut} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_distance_beyond_output() {
        // Fixed block: literal 'a' then a match of length 3 at distance 4,
        // which reaches past the single byte produced so far
        let mut buf = Vec::new();
        {
            let mut bits = BitWriter::new(&mut buf);
            bits.write_bits(1, 1).unwrap();
            bits.write_bits(0b01, 2).unwrap();

            let codes = crate::huffman::canonical_codes(&crate::tables::fixed_litlen_lengths());
            let dcodes = crate::huffman::canonical_codes(&crate::tables::fixed_distance_lengths());
            bits.write_bits(codes[b'a' as usize].code as u32, codes[b'a' as usize].length)
                .unwrap();
            // Length code 257 (length 3), distance code 3 (distance 4)
            bits.write_bits(codes[257].code as u32, codes[257].length).unwrap();
            bits.write_bits(dcodes[3].code as u32, dcodes[3].length).unwrap();
            bits.write_bits(codes[256].code as u32, codes[256].length).unwrap();
            bits.flush().unwrap();
        }
        let err = inflate(&buf).unwrap_err();
        assert!(matches!(err, FlateError::MalformedBlock { .. }));
    }

    #[test]
    fn test_oversubscribed_dynamic_header() {
        // Dynamic block whose code length table assigns 1 bit to three
        // symbols, an impossible prefix code
        let mut buf = Vec::new();
        {
            let mut bits = BitWriter::new(&mut buf);
            bits.write_bits(1, 1).unwrap();
            bits.write_bits(0b10, 2).unwrap();
            bits.write_bits(0, 5).unwrap(); // HLIT = 257
            bits.write_bits(0, 5).unwrap(); // HDIST = 1
            bits.write_bits(15, 4).unwrap(); // HCLEN = 19
            for _ in 0..3 {
                bits.write_bits(1, 3).unwrap(); // lengths 1,1,1
            }
            for _ in 3..19 {
                bits.write_bits(0, 3).unwrap();
            }
            bits.flush().unwrap();
        }
        let err = inflate(&buf).unwrap_err();
        assert!(matches!(err, FlateError::InvalidCodeTable { .. }));
    }

    #[test]
    fn test_missing_end_of_block_code() {
        // Dynamic header where symbol 256 gets length 0
        let mut buf = Vec::new();
        {
            let mut bits = BitWriter::new(&mut buf);
            bits.write_bits(1, 1).unwrap();
            bits.write_bits(0b10, 2).unwrap();
            bits.write_bits(0, 5).unwrap(); // HLIT = 257
            bits.write_bits(0, 5).unwrap(); // HDIST = 1
            bits.write_bits(15, 4).unwrap(); // HCLEN = 19

            // Code length code: symbol 0 -> 1 bit, symbol 18 -> 1 bit
            for &sym in CODE_LENGTH_ORDER.iter() {
                let len = if sym == 0 || sym == 18 { 1u32 } else { 0 };
                bits.write_bits(len, 3).unwrap();
            }
            // Canonical: symbol 0 = code 0, symbol 18 = code 1
            // 257 literal lengths of zero: 138 + 119
            bits.write_bits(1, 1).unwrap(); // 18
            bits.write_bits(127, 7).unwrap(); // 138 zeros
            bits.write_bits(1, 1).unwrap(); // 18
            bits.write_bits(108, 7).unwrap(); // 119 zeros
            bits.write_bits(0, 1).unwrap(); // one more zero (dist table)
            bits.flush().unwrap();
        }
        let err = inflate(&buf).unwrap_err();
        assert!(matches!(err, FlateError::InvalidCodeTable { .. }));
    }

    #[test]
    fn test_multiple_stored_blocks() {
        let data: Vec<u8> = (0..70_000u32).map(|i| (i * 7 % 256) as u8).collect();
        let compressed = deflate_with_level(&data, 0).unwrap();
        assert_eq!(inflate(&compressed).unwrap(), data);
    }

    #[test]
    fn test_repeat_code_without_previous() {
        // Dynamic header whose first code length symbol is 16
        let mut buf = Vec::new();
        {
            let mut bits = BitWriter::new(&mut buf);
            bits.write_bits(1, 1).unwrap();
            bits.write_bits(0b10, 2).unwrap();
            bits.write_bits(0, 5).unwrap();
            bits.write_bits(0, 5).unwrap();
            bits.write_bits(15, 4).unwrap();

            // Symbols 0 and 16 get 1-bit codes; canonical assignment
            // goes by symbol value, so 0 takes code 0 and 16 takes code 1
            for &sym in CODE_LENGTH_ORDER.iter() {
                let len = if sym == 16 || sym == 0 { 1u32 } else { 0 };
                bits.write_bits(len, 3).unwrap();
            }
            bits.write_bits(1, 1).unwrap(); // symbol 16 first
            bits.write_bits(0, 2).unwrap(); // repeat count
            bits.flush().unwrap();
        }
        let err = inflate(&buf).unwrap_err();
        assert!(matches!(err, FlateError::MalformedBlock { .. }));
    }
}
