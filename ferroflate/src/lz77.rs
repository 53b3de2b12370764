//! LZ77 sliding-window match finding.
//!
//! Scans the input for back-references into the previous 32 KiB and
//! emits a token stream of literals and (length, distance) matches.
//! Matches are 3 to 258 bytes; when several candidates share the best
//! length the nearest one wins, since nearer distances take fewer extra
//! bits to encode.
//!
//! Candidate positions are tracked with hash chains: `head` maps a
//! 3-byte hash to the most recent position, `prev` links each position
//! to the previous one with the same hash.

/// Sliding window size (32 KiB).
pub const WINDOW_SIZE: usize = 32768;

/// Minimum match length worth encoding.
pub const MIN_MATCH: usize = 3;

/// Maximum match length.
pub const MAX_MATCH: usize = 258;

/// Number of hash buckets.
const HASH_SIZE: usize = 32768;
const HASH_MASK: usize = HASH_SIZE - 1;

/// A single LZ77 token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// A literal byte.
    Literal(u8),
    /// A back-reference: copy `length` bytes from `distance` bytes back.
    Match {
        /// Match length (3-258).
        length: u16,
        /// Match distance (1-32768).
        distance: u16,
    },
}

/// Effort parameters for one compression level: how many chain links to
/// follow, when a match is good enough to stop searching, and whether
/// to defer a match in favor of a possibly longer one at the next byte.
#[derive(Debug, Clone, Copy)]
struct LevelConfig {
    max_chain: usize,
    good_length: usize,
    lazy: bool,
}

const LEVELS: [LevelConfig; 10] = [
    // Level 0 never reaches the matcher (stored blocks only)
    LevelConfig { max_chain: 0, good_length: MAX_MATCH + 1, lazy: false },
    LevelConfig { max_chain: 4, good_length: 8, lazy: false },
    LevelConfig { max_chain: 8, good_length: 16, lazy: false },
    LevelConfig { max_chain: 16, good_length: 32, lazy: false },
    LevelConfig { max_chain: 32, good_length: 32, lazy: false },
    LevelConfig { max_chain: 64, good_length: 64, lazy: true },
    LevelConfig { max_chain: 128, good_length: 128, lazy: true },
    LevelConfig { max_chain: 256, good_length: MAX_MATCH, lazy: true },
    LevelConfig { max_chain: 1024, good_length: MAX_MATCH, lazy: true },
    LevelConfig { max_chain: 4096, good_length: MAX_MATCH, lazy: true },
];

/// Hash-chain LZ77 encoder.
#[derive(Debug)]
pub struct Lz77Encoder {
    config: LevelConfig,
    /// Most recent position for each hash bucket, -1 when empty.
    head: Vec<i32>,
    /// Previous position with the same hash, indexed by position & (WINDOW_SIZE - 1).
    prev: Vec<i32>,
}

impl Lz77Encoder {
    /// Create an encoder tuned for the given compression level (1-9).
    pub fn with_level(level: u8) -> Self {
        let config = LEVELS[level.clamp(1, 9) as usize];
        Self {
            config,
            head: vec![-1; HASH_SIZE],
            prev: vec![-1; WINDOW_SIZE],
        }
    }

    /// Hash of the 3 bytes at `pos`.
    #[inline]
    fn hash(data: &[u8], pos: usize) -> usize {
        let h = (data[pos] as u32)
            .wrapping_mul(506_832_829)
            .wrapping_add((data[pos + 1] as u32).wrapping_mul(2_654_435_761))
            .wrapping_add((data[pos + 2] as u32).wrapping_mul(374_761_393));
        ((h ^ (h >> 15)) as usize) & HASH_MASK
    }

    #[inline]
    fn insert(&mut self, data: &[u8], pos: usize) {
        if pos + MIN_MATCH > data.len() {
            return;
        }
        let h = Self::hash(data, pos);
        self.prev[pos & (WINDOW_SIZE - 1)] = self.head[h];
        self.head[h] = pos as i32;
    }

    /// Find the best match at `pos`, preferring nearer candidates on
    /// equal length.
    fn find_match(&self, data: &[u8], pos: usize) -> Option<(usize, usize)> {
        if pos + MIN_MATCH > data.len() {
            return None;
        }

        let max_len = MAX_MATCH.min(data.len() - pos);
        let h = Self::hash(data, pos);

        let mut best_len = 0usize;
        let mut best_dist = 0usize;
        let mut candidate = self.head[h];
        let mut chain_left = self.config.max_chain;

        while candidate >= 0 && chain_left > 0 {
            let cpos = candidate as usize;
            let dist = pos - cpos;
            if dist > WINDOW_SIZE {
                break;
            }

            // Strict improvement keeps the first (nearest) candidate of
            // each length; chains are walked most recent first.
            if best_len < max_len && data[cpos + best_len] == data[pos + best_len] {
                let mut len = 0usize;
                while len < max_len && data[cpos + len] == data[pos + len] {
                    len += 1;
                }
                if len > best_len {
                    best_len = len;
                    best_dist = dist;
                    if len >= max_len || len >= self.config.good_length {
                        break;
                    }
                }
            }

            candidate = self.prev[cpos & (WINDOW_SIZE - 1)];
            chain_left -= 1;
        }

        (best_len >= MIN_MATCH).then_some((best_len, best_dist))
    }

    /// Tokenize `data` into literals and matches.
    pub fn compress(&mut self, data: &[u8]) -> Vec<Token> {
        self.head.fill(-1);
        self.prev.fill(-1);

        let mut tokens = Vec::new();
        let mut pos = 0usize;

        while pos < data.len() {
            let Some((len, dist)) = self.find_match(data, pos) else {
                tokens.push(Token::Literal(data[pos]));
                self.insert(data, pos);
                pos += 1;
                continue;
            };

            if self.config.lazy && len < MAX_MATCH && pos + 1 < data.len() {
                // Deferred matching: a longer match starting one byte
                // later is worth a literal's cost.
                self.insert(data, pos);
                if let Some((next_len, _)) = self.find_match(data, pos + 1) {
                    if next_len > len {
                        tokens.push(Token::Literal(data[pos]));
                        pos += 1;
                        continue;
                    }
                }
                tokens.push(Token::Match {
                    length: len as u16,
                    distance: dist as u16,
                });
                for p in pos + 1..pos + len {
                    self.insert(data, p);
                }
                pos += len;
            } else {
                tokens.push(Token::Match {
                    length: len as u16,
                    distance: dist as u16,
                });
                for p in pos..pos + len {
                    self.insert(data, p);
                }
                pos += len;
            }
        }

        tokens
    }
}

/// Expand a token stream back into bytes, validating the matcher
/// independently of the bit-level codec.
#[cfg(test)]
pub fn expand(tokens: &[Token]) -> Vec<u8> {
    let mut out = Vec::new();
    for token in tokens {
        match *token {
            Token::Literal(byte) => out.push(byte),
            Token::Match { length, distance } => {
                let start = out.len() - distance as usize;
                for i in 0..length as usize {
                    let byte = out[start + (i % distance as usize)];
                    out.push(byte);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(data: &[u8], level: u8) {
        let mut encoder = Lz77Encoder::with_level(level);
        let tokens = encoder.compress(data);
        assert_eq!(expand(&tokens), data);
    }

    #[test]
    fn test_empty_input() {
        let mut encoder = Lz77Encoder::with_level(6);
        assert!(encoder.compress(&[]).is_empty());
    }

    #[test]
    fn test_short_input_all_literals() {
        let mut encoder = Lz77Encoder::with_level(6);
        let tokens = encoder.compress(b"ab");
        assert_eq!(
            tokens,
            vec![Token::Literal(b'a'), Token::Literal(b'b')]
        );
    }

    #[test]
    fn test_repeated_pattern_finds_match() {
        let mut encoder = Lz77Encoder::with_level(6);
        let tokens = encoder.compress(b"abcabcabc");

        assert!(tokens
            .iter()
            .any(|t| matches!(t, Token::Match { distance: 3, .. })));
        assert_eq!(expand(&tokens), b"abcabcabc");
    }

    #[test]
    fn test_overlapping_match_run() {
        // 100 'a's: one literal then an overlapping distance-1 match
        let data = vec![b'a'; 100];
        let mut encoder = Lz77Encoder::with_level(6);
        let tokens = encoder.compress(&data);

        assert_eq!(tokens[0], Token::Literal(b'a'));
        assert!(matches!(
            tokens[1],
            Token::Match { distance: 1, length } if length == 99
        ));
    }

    #[test]
    fn test_nearest_match_wins_on_ties() {
        // "abcd" appears at 0 and 4; the scan at 8 must pick distance 4
        let data = b"abcdabcdabcd";
        let mut encoder = Lz77Encoder::with_level(9);
        let tokens = encoder.compress(data);

        for token in &tokens {
            if let Token::Match { distance, .. } = token {
                assert_eq!(*distance, 4);
            }
        }
        assert_eq!(expand(&tokens), data);
    }

    #[test]
    fn test_match_length_capped() {
        let data = vec![b'x'; 1000];
        let mut encoder = Lz77Encoder::with_level(9);
        let tokens = encoder.compress(&data);

        for token in &tokens {
            if let Token::Match { length, .. } = token {
                assert!(*length as usize <= MAX_MATCH);
            }
        }
        assert_eq!(expand(&tokens), data);
    }

    #[test]
    fn test_roundtrip_all_levels() {
        let mut data = Vec::new();
        for i in 0..2000u32 {
            data.push((i % 251) as u8);
            if i % 7 == 0 {
                data.extend_from_slice(b"repeated chunk ");
            }
        }
        for level in 1..=9 {
            roundtrip(&data, level);
        }
    }

    #[test]
    fn test_long_distance_match() {
        // Same 64-byte chunk separated by ~30000 bytes of filler
        let chunk: Vec<u8> = (0..64u8).collect();
        let mut data = chunk.clone();
        let mut state = 0x2545_F491u32;
        for _ in 0..30_000 {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            data.push((state >> 24) as u8 | 0x80);
        }
        data.extend_from_slice(&chunk);

        roundtrip(&data, 9);
    }

    #[test]
    fn test_lazy_prefers_longer_follow_up() {
        // At 'b' a 3-byte match exists, but deferring one byte gives a
        // 4-byte match; level 9 should take the longer one.
        let data = b"bcd0abcde0abcde";
        roundtrip(data, 9);

        let mut encoder = Lz77Encoder::with_level(9);
        let tokens = encoder.compress(data);
        let best = tokens
            .iter()
            .filter_map(|t| match t {
                Token::Match { length, .. } => Some(*length),
                _ => None,
            })
            .max()
            .unwrap_or(0);
        assert!(best >= 5);
    }
}
