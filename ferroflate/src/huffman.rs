//! Canonical Huffman coding for DEFLATE.
//!
//! DEFLATE transmits only code lengths; both sides reconstruct the same
//! canonical codes from them (RFC 1951 Section 3.2.2). Codes of equal
//! length are consecutive in symbol order, and shorter codes sort before
//! longer ones. Bits on the wire are the code MSB-first, which in the
//! LSB-first bit stream means each code is emitted reversed.
//!
//! # Alphabets
//!
//! - **Literal/Length**: 0-285 (0-255 literals, 256 end-of-block, 257-285 lengths)
//! - **Distance**: 0-29
//! - **Code Length**: 0-18 (for transmitting the other two tables)

use ferroflate_core::BitReader;
use ferroflate_core::error::{FlateError, Result};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::io::Read;

/// Maximum code length in DEFLATE (15 bits).
pub const MAX_CODE_LENGTH: usize = 15;

/// Size of the literal/length alphabet (0-285).
pub const LITLEN_ALPHABET_SIZE: usize = 286;

/// Size of the distance alphabet (0-29).
pub const DISTANCE_ALPHABET_SIZE: usize = 30;

/// Size of the code length alphabet (0-18).
pub const CODELEN_ALPHABET_SIZE: usize = 19;

/// End of block symbol.
pub const END_OF_BLOCK: u16 = 256;

/// A Huffman code ready for LSB-first emission.
///
/// `code` holds the canonical code already bit-reversed, so it can be
/// handed to `BitWriter::write_bits` directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct HuffmanCode {
    /// The code bits, reversed for LSB-first output.
    pub code: u16,
    /// Number of bits in the code (0 = symbol unused).
    pub length: u8,
}

/// A Huffman tree for decoding.
///
/// Uses a direct lookup table for codes up to `FAST_BITS` long and falls
/// back to bit-by-bit traversal for longer codes.
#[derive(Debug, Clone)]
pub struct HuffmanTree {
    /// Direct lookup table: indexed by the next `fast_bits` stream bits,
    /// entry is (symbol, code_length) or (0, 0) for longer codes.
    fast_table: Vec<(u16, u8)>,
    /// Number of bits for fast lookup.
    fast_bits: u8,
    /// Maximum code length in this tree.
    max_code_length: u8,
    /// Symbols ordered by (length, canonical code), for the slow path.
    symbols: Vec<u16>,
    /// First canonical code of each length.
    base_codes: [u32; MAX_CODE_LENGTH + 1],
    /// Start of each length's run in `symbols`.
    symbol_offsets: [u16; MAX_CODE_LENGTH + 1],
}

impl HuffmanTree {
    /// Number of bits for the fast lookup table.
    const FAST_BITS: u8 = 9;

    /// Build a Huffman tree from code lengths.
    ///
    /// A length of 0 means the symbol is not used. The length set must
    /// describe a complete prefix code; over-subscribed sets are always
    /// rejected, and incomplete sets are rejected unless at most one
    /// symbol is coded (the one-code distance tables zlib emits).
    pub fn from_code_lengths(code_lengths: &[u8]) -> Result<Self> {
        if code_lengths.is_empty() {
            return Err(FlateError::invalid_code_table("empty code length set"));
        }

        // Count codes of each length
        let mut bl_count = [0u32; MAX_CODE_LENGTH + 1];
        let mut max_length = 0u8;
        let mut coded_symbols = 0u32;

        for &len in code_lengths {
            if len > 0 {
                if len as usize > MAX_CODE_LENGTH {
                    return Err(FlateError::invalid_code_table(format!(
                        "code length {} exceeds maximum {}",
                        len, MAX_CODE_LENGTH
                    )));
                }
                bl_count[len as usize] += 1;
                max_length = max_length.max(len);
                coded_symbols += 1;
            }
        }

        if max_length == 0 {
            // No coded symbols at all. Such a table is transmitted for a
            // distance alphabet when a block contains no matches; any
            // attempt to decode with it fails.
            return Ok(Self {
                fast_table: vec![(0, 0); 1 << Self::FAST_BITS],
                fast_bits: Self::FAST_BITS,
                max_code_length: 0,
                symbols: Vec::new(),
                base_codes: [0; MAX_CODE_LENGTH + 1],
                symbol_offsets: [0; MAX_CODE_LENGTH + 1],
            });
        }

        // Kraft check: `left` tracks unused code space per length
        let mut left = 1i64;
        for bits in 1..=MAX_CODE_LENGTH {
            left <<= 1;
            left -= bl_count[bits] as i64;
            if left < 0 {
                return Err(FlateError::invalid_code_table(
                    "over-subscribed code length set",
                ));
            }
        }
        if left > 0 && coded_symbols > 1 {
            return Err(FlateError::invalid_code_table(
                "incomplete code length set",
            ));
        }

        // First canonical code of each length (RFC 1951 algorithm)
        let mut next_code = [0u32; MAX_CODE_LENGTH + 1];
        let mut code = 0u32;
        for bits in 1..=max_length as usize {
            code = (code + bl_count[bits - 1]) << 1;
            next_code[bits] = code;
        }

        // Slow-path structures: symbols grouped by length
        let mut symbols = vec![0u16; coded_symbols as usize];
        let mut symbol_offsets = [0u16; MAX_CODE_LENGTH + 1];
        let mut base_codes = [0u32; MAX_CODE_LENGTH + 1];

        let mut offset = 0u16;
        for bits in 1..=max_length as usize {
            symbol_offsets[bits] = offset;
            base_codes[bits] = next_code[bits];
            offset += bl_count[bits] as u16;
        }
        if (max_length as usize) < MAX_CODE_LENGTH {
            symbol_offsets[max_length as usize + 1] = offset;
        }

        let mut current_code = next_code;
        let fast_bits = Self::FAST_BITS.min(max_length);
        let fast_table_size = 1usize << fast_bits;
        let mut fast_table = vec![(0u16, 0u8); fast_table_size];

        for (symbol, &len) in code_lengths.iter().enumerate() {
            if len == 0 {
                continue;
            }
            let len = len as usize;
            let code = current_code[len];
            current_code[len] += 1;

            let idx = symbol_offsets[len] as usize + (code - base_codes[len]) as usize;
            symbols[idx] = symbol as u16;

            // Fast table: fill every index whose low bits spell this code
            if len <= fast_bits as usize {
                let reversed = Self::reverse_bits(code as u16, len as u8);
                let fill_count = 1usize << (fast_bits as usize - len);
                for i in 0..fill_count {
                    let index = reversed as usize | (i << len);
                    fast_table[index] = (symbol as u16, len as u8);
                }
            }
        }

        Ok(Self {
            fast_table,
            fast_bits,
            max_code_length: max_length,
            symbols,
            base_codes,
            symbol_offsets,
        })
    }

    /// Reverse the low `length` bits of a code.
    fn reverse_bits(mut code: u16, length: u8) -> u16 {
        let mut reversed = 0u16;
        for _ in 0..length {
            reversed = (reversed << 1) | (code & 1);
            code >>= 1;
        }
        reversed
    }

    /// Decode a symbol from the bit stream. Hot path.
    #[inline]
    pub fn decode<R: Read>(&self, reader: &mut BitReader<R>) -> Result<u16> {
        if self.max_code_length == 0 {
            return Err(FlateError::malformed_block(
                reader.bit_position(),
                "symbol from an empty code table",
            ));
        }

        // Fast lookup handles the vast majority of symbols. If fewer
        // than fast_bits remain in the stream, peek fails and the slow
        // path consumes bit-by-bit instead.
        match reader.peek_bits(self.fast_bits) {
            Ok(bits) => {
                let (symbol, len) = self.fast_table[bits as usize];
                if len > 0 {
                    reader.skip_bits(len)?;
                    return Ok(symbol);
                }
                self.decode_slow(reader)
            }
            Err(_) => self.decode_slow(reader),
        }
    }

    /// Bit-by-bit decoding for long codes and near-EOF positions.
    fn decode_slow<R: Read>(&self, reader: &mut BitReader<R>) -> Result<u16> {
        let mut code = 0u32;

        for len in 1..=self.max_code_length as usize {
            let bit = reader.read_bits(1)?;
            code = (code << 1) | bit;

            let count = if len < MAX_CODE_LENGTH {
                self.symbol_offsets[len + 1] - self.symbol_offsets[len]
            } else {
                self.symbols.len() as u16 - self.symbol_offsets[len]
            };

            if count > 0 && code >= self.base_codes[len] {
                let idx = code - self.base_codes[len];
                if idx < count as u32 {
                    let symbol_idx = self.symbol_offsets[len] as usize + idx as usize;
                    return Ok(self.symbols[symbol_idx]);
                }
            }
        }

        Err(FlateError::malformed_block(
            reader.bit_position(),
            "unresolvable Huffman code",
        ))
    }
}

/// Builder producing length-limited Huffman code lengths from
/// symbol frequencies.
#[derive(Debug)]
pub struct HuffmanBuilder {
    frequencies: Vec<u32>,
    max_length: u8,
}

/// Tree node used during frequency merging.
#[derive(Debug)]
struct MergeNode {
    symbol: Option<u16>,
    left: usize,
    right: usize,
}

impl HuffmanBuilder {
    /// Create a new builder for `alphabet_size` symbols with codes
    /// limited to `max_length` bits.
    pub fn new(alphabet_size: usize, max_length: u8) -> Self {
        Self {
            frequencies: vec![0; alphabet_size],
            max_length,
        }
    }

    /// Add occurrences of a symbol.
    pub fn add_count(&mut self, symbol: u16, count: u32) {
        if (symbol as usize) < self.frequencies.len() {
            self.frequencies[symbol as usize] += count;
        }
    }

    /// Build code lengths from the accumulated frequencies.
    ///
    /// Returns one length per symbol; 0 means the symbol is unused. For
    /// two or more used symbols the result is a complete prefix code no
    /// longer than `max_length` bits.
    pub fn build_lengths(&self) -> Vec<u8> {
        let n = self.frequencies.len();
        let mut lengths = vec![0u8; n];

        let used: Vec<(u16, u32)> = self
            .frequencies
            .iter()
            .enumerate()
            .filter_map(|(i, &f)| (f > 0).then_some((i as u16, f)))
            .collect();

        match used.len() {
            0 => return lengths,
            1 => {
                // A lone symbol still needs one bit on the wire
                lengths[used[0].0 as usize] = 1;
                return lengths;
            }
            _ => {}
        }

        let depths = Self::merge_depths(&used);

        // Group symbols into a bl_count histogram, clamping depths to
        // the limit, then re-assign lengths deepest-first so the rarest
        // symbols take the longest codes.
        let max_len = self.max_length;
        let mut order: Vec<usize> = (0..used.len()).collect();
        order.sort_by(|&a, &b| {
            depths[b]
                .cmp(&depths[a])
                .then_with(|| used[a].1.cmp(&used[b].1))
                .then_with(|| used[b].0.cmp(&used[a].0))
        });

        let mut limited: Vec<u8> = order
            .iter()
            .map(|&i| depths[i].min(max_len as u16) as u8)
            .collect();
        Self::repair_kraft(&mut limited, max_len);

        for (&symbol_idx, &len) in order.iter().zip(limited.iter()) {
            lengths[used[symbol_idx].0 as usize] = len;
        }

        lengths
    }

    /// Compute raw Huffman tree depths by merging the two least frequent
    /// subtrees until one remains.
    fn merge_depths(used: &[(u16, u32)]) -> Vec<u16> {
        let mut nodes: Vec<MergeNode> = used
            .iter()
            .map(|&(sym, _)| MergeNode {
                symbol: Some(sym),
                left: 0,
                right: 0,
            })
            .collect();

        let mut heap: BinaryHeap<Reverse<(u64, usize)>> = used
            .iter()
            .enumerate()
            .map(|(i, &(_, f))| Reverse((f as u64, i)))
            .collect();

        while heap.len() > 1 {
            let Reverse((freq_a, a)) = heap.pop().unwrap();
            let Reverse((freq_b, b)) = heap.pop().unwrap();

            let parent = nodes.len();
            nodes.push(MergeNode {
                symbol: None,
                left: a,
                right: b,
            });
            heap.push(Reverse((freq_a + freq_b, parent)));
        }

        let root = heap.pop().unwrap().0.1;

        let mut depths = vec![0u16; used.len()];
        let mut stack = vec![(root, 0u16)];
        while let Some((idx, depth)) = stack.pop() {
            if nodes[idx].symbol.is_some() {
                depths[idx] = depth.max(1);
            } else {
                stack.push((nodes[idx].left, depth + 1));
                stack.push((nodes[idx].right, depth + 1));
            }
        }

        depths
    }

    /// Adjust a clamped, deepest-first length list until its Kraft sum
    /// is exactly `2^max_len`, which guarantees a complete prefix code.
    fn repair_kraft(lengths: &mut [u8], max_len: u8) {
        let limit = 1u64 << max_len;
        let mut sum: u64 = lengths.iter().map(|&l| 1u64 << (max_len - l)).sum();

        // Over budget: demote the deepest code still below the limit.
        // The alphabets here (19 and 286 symbols, limits 7 and 15) always
        // leave such a code while the sum is over.
        while sum > limit {
            let idx = (0..lengths.len())
                .filter(|&i| lengths[i] < max_len)
                .max_by_key(|&i| lengths[i])
                .expect("length-limited set cannot be saturated while over budget");
            sum -= 1u64 << (max_len - lengths[idx] - 1);
            lengths[idx] += 1;
        }

        // Under budget (possible after an overshooting demotion): promote
        // deepest codes until exact. The gap is always a multiple of the
        // smallest remaining contribution, so this converges precisely.
        while sum < limit {
            let idx = (0..lengths.len())
                .filter(|&i| lengths[i] > 1)
                .max_by_key(|&i| lengths[i])
                .expect("incomplete set must contain a code longer than one bit");
            sum += 1u64 << (max_len - lengths[idx]);
            lengths[idx] -= 1;
        }
    }
}

/// Generate canonical, LSB-first-ready codes from code lengths.
///
/// Symbols with length 0 keep the default zero entry.
pub fn canonical_codes(lengths: &[u8]) -> Vec<HuffmanCode> {
    let mut codes = vec![HuffmanCode::default(); lengths.len()];

    let mut bl_count = [0u32; MAX_CODE_LENGTH + 1];
    for &len in lengths {
        if len > 0 {
            bl_count[len as usize] += 1;
        }
    }

    let mut next_code = [0u16; MAX_CODE_LENGTH + 1];
    let mut code = 0u16;
    for bits in 1..=MAX_CODE_LENGTH {
        code = (code + bl_count[bits - 1] as u16) << 1;
        next_code[bits] = code;
    }

    for (symbol, &len) in lengths.iter().enumerate() {
        if len > 0 {
            let assigned = next_code[len as usize];
            next_code[len as usize] += 1;
            codes[symbol] = HuffmanCode {
                code: HuffmanTree::reverse_bits(assigned, len),
                length: len,
            };
        }
    }

    codes
}
