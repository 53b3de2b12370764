//! DEFLATE block encoding (RFC 1951).
//!
//! Input is tokenized by the LZ77 matcher, then emitted as whichever of
//! the three block types costs the fewest bits: stored (type 0), fixed
//! Huffman (type 1), or dynamic Huffman (type 2). The whole input goes
//! into a single compressed block; only stored output is split, since
//! stored blocks cap at 65535 bytes of payload.

use crate::huffman::{
    CODELEN_ALPHABET_SIZE, DISTANCE_ALPHABET_SIZE, END_OF_BLOCK, HuffmanBuilder, HuffmanCode,
    LITLEN_ALPHABET_SIZE, canonical_codes,
};
use crate::lz77::{Lz77Encoder, Token};
use crate::tables::{
    CODE_LENGTH_ORDER, distance_to_code, fixed_distance_lengths, fixed_litlen_lengths,
    length_to_code,
};
use ferroflate_core::BitWriter;
use ferroflate_core::error::Result;
use std::io::Write;

/// Maximum payload of a single stored block.
const MAX_STORED_BLOCK: usize = 65535;

/// Block type bits (BTYPE).
const BTYPE_STORED: u32 = 0b00;
const BTYPE_FIXED: u32 = 0b01;
const BTYPE_DYNAMIC: u32 = 0b10;

/// One entry in the run-length-encoded code length stream: a code
/// length symbol (0-18) plus its extra bits.
#[derive(Debug, Clone, Copy)]
struct ClSymbol {
    symbol: u8,
    extra_bits: u8,
    extra_value: u8,
}

/// DEFLATE compressor.
///
/// Level 0 emits stored blocks only; levels 1-9 trade match-finding
/// effort for density.
#[derive(Debug)]
pub struct Deflater {
    matcher: Lz77Encoder,
    level: u8,
}

impl Deflater {
    /// Create a compressor for the given level (clamped to 0-9).
    pub fn new(level: u8) -> Self {
        let level = level.min(9);
        Self {
            matcher: Lz77Encoder::with_level(level),
            level,
        }
    }

    /// Compress `data` into a freshly allocated DEFLATE stream.
    pub fn compress_to_vec(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(data.len() / 2 + 64);
        self.compress(data, &mut output)?;
        Ok(output)
    }

    /// Compress `data`, writing the DEFLATE stream to `writer`.
    pub fn compress<W: Write>(&mut self, data: &[u8], writer: &mut W) -> Result<()> {
        let mut bits = BitWriter::new(writer);

        if self.level == 0 {
            write_stored_blocks(&mut bits, data)?;
        } else {
            self.write_compressed(&mut bits, data)?;
        }

        bits.flush()?;
        Ok(())
    }

    /// Tokenize and emit the cheapest of the three block types.
    fn write_compressed<W: Write>(&mut self, bits: &mut BitWriter<W>, data: &[u8]) -> Result<()> {
        let tokens = self.matcher.compress(data);

        let (litlen_freqs, dist_freqs) = count_frequencies(&tokens);
        let plan = DynamicPlan::build(&litlen_freqs, &dist_freqs);

        let fixed_cost = fixed_block_cost(&tokens);
        let dynamic_cost = plan.total_cost(&tokens);
        let stored_cost = stored_block_cost(data.len());

        if stored_cost < fixed_cost && stored_cost < dynamic_cost {
            write_stored_blocks(bits, data)
        } else if dynamic_cost < fixed_cost {
            write_dynamic_block(bits, &tokens, &plan)
        } else {
            write_fixed_block(bits, &tokens)
        }
    }
}

/// Compress with the default level (6).
pub fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    Deflater::new(6).compress_to_vec(data)
}

/// Compress with an explicit level (0-9).
pub fn deflate_with_level(data: &[u8], level: u8) -> Result<Vec<u8>> {
    Deflater::new(level).compress_to_vec(data)
}

/// Emit `data` as stored blocks, splitting at the 65535-byte cap.
/// Empty input becomes a single empty final block.
fn write_stored_blocks<W: Write>(bits: &mut BitWriter<W>, data: &[u8]) -> Result<()> {
    let mut chunks = data.chunks(MAX_STORED_BLOCK);
    let count = chunks.len().max(1);

    for index in 0..count {
        let chunk = chunks.next().unwrap_or(&[]);

        bits.write_bit(index + 1 == count)?;
        bits.write_bits(BTYPE_STORED, 2)?;
        bits.align_to_byte()?;

        let len = chunk.len() as u16;
        bits.write_bytes(&len.to_le_bytes())?;
        bits.write_bytes(&(!len).to_le_bytes())?;
        bits.write_bytes(chunk)?;
    }

    Ok(())
}

/// Tally literal/length and distance symbol frequencies, including the
/// mandatory end-of-block symbol.
fn count_frequencies(tokens: &[Token]) -> (Vec<u32>, Vec<u32>) {
    let mut litlen_freqs = vec![0u32; LITLEN_ALPHABET_SIZE];
    let mut dist_freqs = vec![0u32; DISTANCE_ALPHABET_SIZE];

    for token in tokens {
        match *token {
            Token::Literal(byte) => litlen_freqs[byte as usize] += 1,
            Token::Match { length, distance } => {
                let (code, _, _) = length_to_code(length);
                litlen_freqs[code as usize] += 1;
                let (dcode, _, _) = distance_to_code(distance);
                dist_freqs[dcode as usize] += 1;
            }
        }
    }

    litlen_freqs[END_OF_BLOCK as usize] += 1;
    (litlen_freqs, dist_freqs)
}

/// Everything needed to emit (or cost) a dynamic block: the two code
/// tables, their run-length encoding, and the header field widths.
#[derive(Debug)]
struct DynamicPlan {
    litlen_lengths: Vec<u8>,
    dist_lengths: Vec<u8>,
    cl_lengths: Vec<u8>,
    cl_stream: Vec<ClSymbol>,
    hlit: usize,
    hdist: usize,
    hclen: usize,
}

impl DynamicPlan {
    fn build(litlen_freqs: &[u32], dist_freqs: &[u32]) -> Self {
        let mut litlen_builder = HuffmanBuilder::new(LITLEN_ALPHABET_SIZE, 15);
        for (symbol, &freq) in litlen_freqs.iter().enumerate() {
            litlen_builder.add_count(symbol as u16, freq);
        }
        let litlen_lengths = litlen_builder.build_lengths();

        // A block with no matches still needs a well-formed distance
        // table; one phantom code keeps it decodable.
        let mut dist_builder = HuffmanBuilder::new(DISTANCE_ALPHABET_SIZE, 15);
        if dist_freqs.iter().all(|&f| f == 0) {
            dist_builder.add_count(0, 1);
        } else {
            for (symbol, &freq) in dist_freqs.iter().enumerate() {
                dist_builder.add_count(symbol as u16, freq);
            }
        }
        let dist_lengths = dist_builder.build_lengths();

        let lit_count = last_nonzero(&litlen_lengths).max(257);
        let dist_count = last_nonzero(&dist_lengths).max(1);

        let cl_stream = rle_code_lengths(&litlen_lengths[..lit_count], &dist_lengths[..dist_count]);

        let mut cl_builder = HuffmanBuilder::new(CODELEN_ALPHABET_SIZE, 7);
        for entry in &cl_stream {
            cl_builder.add_count(entry.symbol as u16, 1);
        }
        let cl_lengths = cl_builder.build_lengths();

        let cl_count = CODE_LENGTH_ORDER
            .iter()
            .rposition(|&sym| cl_lengths[sym] > 0)
            .map_or(4, |pos| (pos + 1).max(4));

        Self {
            litlen_lengths,
            dist_lengths,
            cl_lengths,
            cl_stream,
            hlit: lit_count - 257,
            hdist: dist_count - 1,
            hclen: cl_count - 4,
        }
    }

    /// Exact bit cost of the block: header, code length stream, body.
    fn total_cost(&self, tokens: &[Token]) -> usize {
        let mut cost = 3 + 5 + 5 + 4; // BFINAL/BTYPE + HLIT + HDIST + HCLEN
        cost += 3 * (self.hclen + 4);

        for entry in &self.cl_stream {
            cost += self.cl_lengths[entry.symbol as usize] as usize + entry.extra_bits as usize;
        }

        cost += body_cost(tokens, &self.litlen_lengths, &self.dist_lengths);
        cost
    }
}

/// Index just past the last nonzero length.
fn last_nonzero(lengths: &[u8]) -> usize {
    lengths
        .iter()
        .rposition(|&len| len > 0)
        .map_or(0, |pos| pos + 1)
}

/// Run-length encode the concatenated code length tables using symbols
/// 16 (repeat previous 3-6), 17 (3-10 zeros) and 18 (11-138 zeros).
fn rle_code_lengths(litlen: &[u8], dist: &[u8]) -> Vec<ClSymbol> {
    let mut combined = Vec::with_capacity(litlen.len() + dist.len());
    combined.extend_from_slice(litlen);
    combined.extend_from_slice(dist);

    let mut stream = Vec::new();
    let mut i = 0usize;

    while i < combined.len() {
        let value = combined[i];
        let mut run = 1usize;
        while i + run < combined.len() && combined[i + run] == value {
            run += 1;
        }

        if value == 0 {
            let mut remaining = run;
            while remaining >= 11 {
                let take = remaining.min(138);
                stream.push(ClSymbol {
                    symbol: 18,
                    extra_bits: 7,
                    extra_value: (take - 11) as u8,
                });
                remaining -= take;
            }
            if remaining >= 3 {
                stream.push(ClSymbol {
                    symbol: 17,
                    extra_bits: 3,
                    extra_value: (remaining - 3) as u8,
                });
                remaining = 0;
            }
            for _ in 0..remaining {
                stream.push(ClSymbol {
                    symbol: 0,
                    extra_bits: 0,
                    extra_value: 0,
                });
            }
        } else {
            stream.push(ClSymbol {
                symbol: value,
                extra_bits: 0,
                extra_value: 0,
            });
            let mut remaining = run - 1;
            while remaining >= 3 {
                let take = remaining.min(6);
                stream.push(ClSymbol {
                    symbol: 16,
                    extra_bits: 2,
                    extra_value: (take - 3) as u8,
                });
                remaining -= take;
            }
            for _ in 0..remaining {
                stream.push(ClSymbol {
                    symbol: value,
                    extra_bits: 0,
                    extra_value: 0,
                });
            }
        }

        i += run;
    }

    stream
}

/// Bit cost of the token stream under the given code lengths, with the
/// closing end-of-block symbol.
fn body_cost(tokens: &[Token], litlen_lengths: &[u8], dist_lengths: &[u8]) -> usize {
    let mut cost = 0usize;

    for token in tokens {
        match *token {
            Token::Literal(byte) => cost += litlen_lengths[byte as usize] as usize,
            Token::Match { length, distance } => {
                let (code, extra_bits, _) = length_to_code(length);
                cost += litlen_lengths[code as usize] as usize + extra_bits as usize;
                let (dcode, dextra_bits, _) = distance_to_code(distance);
                cost += dist_lengths[dcode as usize] as usize + dextra_bits as usize;
            }
        }
    }

    cost + litlen_lengths[END_OF_BLOCK as usize] as usize
}

/// Bit cost of storing `len` bytes, assuming worst-case alignment
/// padding per block.
fn stored_block_cost(len: usize) -> usize {
    let blocks = len.div_ceil(MAX_STORED_BLOCK).max(1);
    blocks * (3 + 7 + 32) + len * 8
}

/// Bit cost of the token stream under the fixed code tables.
fn fixed_block_cost(tokens: &[Token]) -> usize {
    let litlen_lengths = fixed_litlen_lengths();
    let dist_lengths = fixed_distance_lengths();
    3 + body_cost(tokens, &litlen_lengths, &dist_lengths)
}

/// Emit the token stream followed by end-of-block.
fn write_tokens<W: Write>(
    bits: &mut BitWriter<W>,
    tokens: &[Token],
    litlen_codes: &[HuffmanCode],
    dist_codes: &[HuffmanCode],
) -> Result<()> {
    for token in tokens {
        match *token {
            Token::Literal(byte) => {
                let code = litlen_codes[byte as usize];
                debug_assert!(code.length > 0);
                bits.write_bits(code.code as u32, code.length)?;
            }
            Token::Match { length, distance } => {
                let (symbol, extra_bits, extra_value) = length_to_code(length);
                let code = litlen_codes[symbol as usize];
                debug_assert!(code.length > 0);
                bits.write_bits(code.code as u32, code.length)?;
                if extra_bits > 0 {
                    bits.write_bits(extra_value as u32, extra_bits)?;
                }

                let (dsymbol, dextra_bits, dextra_value) = distance_to_code(distance);
                let dcode = dist_codes[dsymbol as usize];
                debug_assert!(dcode.length > 0);
                bits.write_bits(dcode.code as u32, dcode.length)?;
                if dextra_bits > 0 {
                    bits.write_bits(dextra_value as u32, dextra_bits)?;
                }
            }
        }
    }

    let eob = litlen_codes[END_OF_BLOCK as usize];
    bits.write_bits(eob.code as u32, eob.length)?;
    Ok(())
}

/// Emit a single final fixed-Huffman block.
fn write_fixed_block<W: Write>(bits: &mut BitWriter<W>, tokens: &[Token]) -> Result<()> {
    bits.write_bit(true)?;
    bits.write_bits(BTYPE_FIXED, 2)?;

    let litlen_codes = canonical_codes(&fixed_litlen_lengths());
    let dist_codes = canonical_codes(&fixed_distance_lengths());
    write_tokens(bits, tokens, &litlen_codes, &dist_codes)
}

/// Emit a single final dynamic-Huffman block.
fn write_dynamic_block<W: Write>(
    bits: &mut BitWriter<W>,
    tokens: &[Token],
    plan: &DynamicPlan,
) -> Result<()> {
    bits.write_bit(true)?;
    bits.write_bits(BTYPE_DYNAMIC, 2)?;

    bits.write_bits(plan.hlit as u32, 5)?;
    bits.write_bits(plan.hdist as u32, 5)?;
    bits.write_bits(plan.hclen as u32, 4)?;

    for &symbol in CODE_LENGTH_ORDER.iter().take(plan.hclen + 4) {
        bits.write_bits(plan.cl_lengths[symbol] as u32, 3)?;
    }

    let cl_codes = canonical_codes(&plan.cl_lengths);
    for entry in &plan.cl_stream {
        let code = cl_codes[entry.symbol as usize];
        debug_assert!(code.length > 0);
        bits.write_bits(code.code as u32, code.length)?;
        if entry.extra_bits > 0 {
            bits.write_bits(entry.extra_value as u32, entry.extra_bits)?;
        }
    }

    let litlen_codes = canonical_codes(&plan.litlen_lengths);
    let dist_codes = canonical_codes(&plan.dist_lengths);
    write_tokens(bits, tokens, &litlen_codes, &dist_codes)
}
