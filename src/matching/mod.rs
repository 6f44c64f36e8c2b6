//! The fuzzy-matching engine: locates a `pattern` in `text` near an
//! expected location `loc`, tolerating a bounded number of errors
//! (spec.md §4.2), via the bit-parallel Bitap algorithm.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Configuration and entry point for the fuzzy-matching engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    /// How closely a match must resemble `pattern` to count, from `0.0`
    /// (perfection required) to `1.0` (anything matches).
    pub threshold: f64,
    /// How far from `loc` a match can drift before the distance penalty
    /// dominates the score. `0` means only an exact-location match
    /// counts (distance contributes nothing unless non-zero).
    pub distance: u32,
    /// Longest pattern [`Match::bitap`] will accept, in chars. The
    /// algorithm packs one bit of state per pattern char into a
    /// fixed-width integer, so this also bounds that integer's width.
    pub max_bits: u32,
}

impl Default for Match {
    fn default() -> Self {
        Match {
            threshold: 0.5,
            distance: 1000,
            max_bits: 32,
        }
    }
}

impl Match {
    /// Locates `pattern` in `text` near char offset `loc`. Tries an exact
    /// match at `loc` first, then falls back to [`Match::bitap`]. Returns
    /// `-1` if nothing scores within `self.threshold`.
    pub fn main(&self, text: &str, pattern: &str, loc: usize) -> Result<i64> {
        let text_chars: Vec<char> = text.chars().collect();
        let loc = loc.min(text_chars.len());

        if text == pattern {
            return Ok(0);
        }
        if text_chars.is_empty() {
            return Ok(-1);
        }

        let pattern_chars: Vec<char> = pattern.chars().collect();
        if loc + pattern_chars.len() <= text_chars.len()
            && text_chars[loc..loc + pattern_chars.len()] == pattern_chars[..]
        {
            return Ok(loc as i64);
        }

        self.bitap(text, pattern, loc)
    }

    /// Runs the bit-parallel Bitap search directly, bypassing the
    /// exact-match fast path `main` tries first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PatternTooLong`] if `pattern` has more chars than
    /// `self.max_bits`, or [`Error::InvalidInput`] if `pattern` is empty.
    pub fn bitap(&self, text: &str, pattern: &str, loc: usize) -> Result<i64> {
        let pattern_chars: Vec<char> = pattern.chars().collect();
        if pattern_chars.is_empty() {
            return Err(Error::InvalidInput("pattern must not be empty"));
        }
        if pattern_chars.len() as u32 > self.max_bits {
            return Err(Error::PatternTooLong {
                pattern_len: pattern_chars.len(),
                max_bits: self.max_bits,
            });
        }

        let text_chars: Vec<char> = text.chars().collect();
        let alphabet = self.alphabet(&pattern_chars);
        let pattern_len = pattern_chars.len();

        let mut score_threshold = self.threshold;
        if let Some(best) = find_from(&text_chars, &pattern_chars, loc) {
            score_threshold = score_threshold.min(self.score(0, best, loc, pattern_len));
            if let Some(best) = find_last_within(&text_chars, &pattern_chars, loc + pattern_len) {
                score_threshold = score_threshold.min(self.score(0, best, loc, pattern_len));
            }
        }

        let match_mask: u32 = 1 << (pattern_len - 1);
        let mut best_loc: i64 = -1;

        let mut bin_max = pattern_len + text_chars.len();
        let mut bin_mid = bin_max;
        let mut last_rd: Vec<u32> = Vec::new();

        for d in 0..pattern_len {
            let mut bin_min = 0usize;
            bin_max = bin_mid;
            while bin_min < bin_max {
                if self.score(d, loc + bin_mid, loc, pattern_len) <= score_threshold {
                    bin_min = bin_mid;
                } else {
                    bin_max = bin_mid;
                }
                bin_mid = (bin_max - bin_min) / 2 + bin_min;
            }
            bin_max = bin_mid;

            let mut start = 1usize.max(loc.saturating_sub(bin_mid) + 1);
            let finish = (loc + bin_mid).min(text_chars.len()) + pattern_len;

            let mut rd = vec![0u32; finish + 2];
            rd[finish + 1] = (1u32 << d) - 1;

            let mut j = finish as isize;
            while j >= start as isize {
                let jx = j as usize;
                let char_match = if text_chars.len() <= jx - 1 {
                    0
                } else {
                    *alphabet.get(&text_chars[jx - 1]).unwrap_or(&0)
                };
                rd[jx] = if d == 0 {
                    ((rd[jx + 1] << 1) | 1) & char_match
                } else {
                    (((rd[jx + 1] << 1) | 1) & char_match)
                        | (((last_rd[jx + 1] | last_rd[jx]) << 1) | 1)
                        | last_rd[jx + 1]
                };
                if rd[jx] & match_mask != 0 {
                    let score = self.score(d, jx - 1, loc, pattern_len);
                    if score <= score_threshold {
                        score_threshold = score;
                        best_loc = (jx - 1) as i64;
                        if best_loc as usize > loc {
                            start = (2 * loc as i64 - best_loc).max(1) as usize;
                        } else {
                            break;
                        }
                    }
                }
                j -= 1;
            }

            if self.score(d + 1, loc, loc, pattern_len) > score_threshold {
                break;
            }
            last_rd = rd;
        }

        Ok(best_loc)
    }

    /// Computes the per-char bitmask alphabet Bitap uses to test a text
    /// char against every position it could occupy in `pattern`.
    pub(crate) fn alphabet(&self, pattern: &[char]) -> HashMap<char, u32> {
        let mut s = HashMap::with_capacity(pattern.len());
        for &c in pattern {
            s.entry(c).or_insert(0u32);
        }
        for (i, &c) in pattern.iter().enumerate() {
            *s.get_mut(&c).unwrap() |= 1 << (pattern.len() - i - 1);
        }
        s
    }

    /// Blends edit-distance accuracy (`e` errors over `pattern_len`
    /// chars) with how far `x` drifted from the expected `loc`, scaled
    /// by `self.distance`. Lower is better; `0.0` is a perfect match.
    fn score(&self, e: usize, x: usize, loc: usize, pattern_len: usize) -> f64 {
        let accuracy = e as f64 / pattern_len as f64;
        let proximity = (loc as i64 - x as i64).unsigned_abs() as f64;
        if self.distance == 0 {
            return if proximity > 0.0 { 1.0 } else { accuracy };
        }
        accuracy + proximity / self.distance as f64
    }
}

fn find_from(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

fn find_last_within(haystack: &[char], needle: &[char], end: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(end.min(haystack.len()));
    }
    let end = end.min(haystack.len());
    if end < needle.len() {
        return None;
    }
    haystack[..end]
        .windows(needle.len())
        .rposition(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_short_circuits() {
        let m = Match::default();
        assert_eq!(m.main("abcdef", "abcdef", 1000).unwrap(), 0);
    }

    #[test]
    fn finds_fuzzy_match_near_loc() {
        let m = Match::default();
        let found = m.main("fa_mily test", "_mily", 5).unwrap();
        assert_eq!(found, 2);
    }

    #[test]
    fn zero_threshold_rejects_any_drift() {
        let m = Match {
            threshold: 0.0,
            ..Default::default()
        };
        assert_eq!(m.main("abcdefghijk", "efghi", 4).unwrap(), 4);
        assert_eq!(m.main("abcdefghijk", "efghi", 1).unwrap(), -1);
    }

    #[test]
    fn rejects_oversized_pattern() {
        let m = Match {
            max_bits: 4,
            ..Default::default()
        };
        let err = m.bitap("hello world", "hello", 0).unwrap_err();
        assert!(matches!(err, Error::PatternTooLong { .. }));
    }

    #[test]
    fn rejects_empty_pattern() {
        let m = Match::default();
        let err = m.bitap("hello", "", 0).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn no_match_returns_negative_one() {
        let m = Match::default();
        assert_eq!(m.main("I am the very model", "xyz123", 0).unwrap(), -1);
    }

    #[test]
    fn literal_scenario_bitap_distant_exact_match() {
        let m = Match {
            distance: 100,
            threshold: 0.5,
            ..Default::default()
        };
        assert_eq!(m.bitap("abcdefghijk", "efxhi", 0).unwrap(), 4);
        assert_eq!(m.bitap("abcdefghijk", "bxy", 1).unwrap(), -1);
    }
}
