//! The patch engine: turns a diff into a sequence of context-bearing
//! [`Hunk`]s that can be serialized, transmitted, and later re-applied
//! even against text that has since drifted (spec.md §4.3).

mod text;

use crate::diff::{chars, from_chars, Diff, DiffOp, Op, Script};
use crate::error::{Error, Result};
use crate::matching::Match;

/// One context-bearing edit hunk.
///
/// `start1`/`start2` are `None` until the hunk has been anchored to a
/// position in the original/new text; every [`Hunk`] returned by
/// [`Patch::make_from_texts`] (or any other `make_*` entry point) is
/// anchored. `length1`/`length2` count chars spanned in the original and
/// new text respectively, including context.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Hunk {
    /// Char offset this hunk starts at in the original text, once
    /// anchored.
    pub start1: Option<i64>,
    /// Char offset this hunk starts at in the new text, once anchored.
    pub start2: Option<i64>,
    /// Chars spanned in the original text, including context.
    pub length1: usize,
    /// Chars spanned in the new text, including context.
    pub length2: usize,
    /// The hunk's own edit script, including its leading/trailing
    /// context equalities.
    pub diffs: Script,
}

/// Configuration and entry point for the patch engine.
///
/// Wraps a [`Diff`] and a [`Match`] engine: patch construction re-diffs
/// and cleans up internally, and patch application relocates each hunk
/// fuzzily before rewriting the text it anchors to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Patch {
    /// Above this fraction of chars needing to change to relocate a
    /// large hunk, [`Patch::apply`] gives up on that hunk rather than
    /// risk corrupting the text.
    pub delete_threshold: f64,
    /// Chars of unchanged context kept on each side of a hunk's edits.
    pub margin: u32,
    /// Used by [`Patch::make_from_texts`] to build the initial diff and
    /// by [`Patch::apply`] to re-diff a hunk against drifted text.
    pub diff: Diff,
    /// Used by [`Patch::apply`] to relocate each hunk.
    pub matching: Match,
}

impl Default for Patch {
    fn default() -> Self {
        Patch {
            delete_threshold: 0.5,
            margin: 4,
            diff: Diff::default(),
            matching: Match::default(),
        }
    }
}

impl Patch {
    /// Diffs `text1` against `text2` (with line-mode enabled, then
    /// cleaned up semantically and for efficiency) and builds hunks from
    /// the result.
    pub fn make_from_texts(&self, text1: &str, text2: &str) -> Vec<Hunk> {
        let mut diffs = self.diff.main(text1, text2, true);
        if diffs.len() > 2 {
            Diff::cleanup_semantic(&mut diffs);
            self.diff.cleanup_efficiency(&mut diffs);
        }
        self.make_from_diffs(text1, &diffs)
    }

    /// Builds hunks directly from an already-computed script, recovering
    /// `text1` from it.
    pub fn make_from_script(&self, script: &Script) -> Vec<Hunk> {
        let text1 = Diff::text1(script);
        self.make_from_diffs(&text1, script)
    }

    /// Builds hunks from a script and the `text1` it was computed
    /// against, without re-diffing or cleaning up.
    pub fn make_from_diffs(&self, text1: &str, diffs: &Script) -> Vec<Hunk> {
        if diffs.is_empty() {
            return Vec::new();
        }

        let margin2 = 2 * self.margin as usize;
        let mut patches = Vec::new();
        let mut patch = Hunk::default();
        let mut char_count1 = 0usize;
        let mut char_count2 = 0usize;
        let mut prepatch_text = chars(text1);
        let mut postpatch_text = prepatch_text.clone();

        for (i, d) in diffs.iter().enumerate() {
            let diff_len = d.len();

            if patch.diffs.is_empty() && d.op != Op::Equal {
                patch.start1 = Some(char_count1 as i64);
                patch.start2 = Some(char_count2 as i64);
            }

            match d.op {
                Op::Insert => {
                    patch.length2 += diff_len;
                    patch.diffs.push(d.clone());
                    let ins = chars(&d.text);
                    postpatch_text.splice(char_count2..char_count2, ins);
                }
                Op::Delete => {
                    patch.length1 += diff_len;
                    patch.diffs.push(d.clone());
                    postpatch_text.splice(char_count2..char_count2 + diff_len, std::iter::empty());
                }
                Op::Equal => {
                    if diff_len <= margin2 && !patch.diffs.is_empty() && i + 1 != diffs.len() {
                        patch.diffs.push(d.clone());
                        patch.length1 += diff_len;
                        patch.length2 += diff_len;
                    } else if diff_len >= margin2 && !patch.diffs.is_empty() {
                        self.add_context(&mut patch, &from_chars(&prepatch_text))
                            .expect("hunk anchored by the loop above");
                        patches.push(std::mem::take(&mut patch));
                        prepatch_text = postpatch_text.clone();
                        char_count1 = char_count2;
                    }
                }
            }

            if d.op != Op::Insert {
                char_count1 += diff_len;
            }
            if d.op != Op::Delete {
                char_count2 += diff_len;
            }
        }

        if !patch.diffs.is_empty() {
            self.add_context(&mut patch, &from_chars(&prepatch_text))
                .expect("hunk anchored by the loop above");
            patches.push(patch);
        }
        patches
    }

    /// Widens `patch` with up to [`Patch::margin`] chars of unchanged
    /// context from `text` on each side, expanding the context further
    /// (up to `max_bits - 2*margin`) if the hunk's own span isn't unique
    /// within `text`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PatchNotInitialized`] if `patch.start1`/`start2`
    /// are `None`.
    pub fn add_context(&self, patch: &mut Hunk, text: &str) -> Result<()> {
        let (start1, start2) = match (patch.start1, patch.start2) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(Error::PatchNotInitialized),
        };

        let text_chars = chars(text);
        if text_chars.is_empty() {
            return Ok(());
        }

        let margin = self.margin as i64;
        let max_bits = self.matching.max_bits as i64;

        let mut pattern = substring(&text_chars, start2, start2 + patch.length1 as i64);
        let mut padding = 0i64;

        while index_of(&text_chars, &pattern) != last_index_of(&text_chars, &pattern)
            && (pattern.len() as i64) < max_bits - margin - margin
        {
            padding += margin;
            pattern = substring(
                &text_chars,
                start2 - padding,
                start2 + patch.length1 as i64 + padding,
            );
        }
        padding += margin;

        let prefix = substring(&text_chars, start2 - padding, start2);
        if !prefix.is_empty() {
            patch.diffs.insert(0, DiffOp::new(Op::Equal, from_chars(&prefix)));
        }
        let suffix = substring(
            &text_chars,
            start2 + patch.length1 as i64,
            start2 + patch.length1 as i64 + padding,
        );
        if !suffix.is_empty() {
            patch.diffs.push(DiffOp::new(Op::Equal, from_chars(&suffix)));
        }

        patch.start1 = Some(start1 - prefix.len() as i64);
        patch.start2 = Some(start2 - prefix.len() as i64);
        patch.length1 += prefix.len() + suffix.len();
        patch.length2 += prefix.len() + suffix.len();

        Ok(())
    }

    /// Prepends/appends a run of distinct unprintable chars to every
    /// hunk's edge context so that [`Patch::apply`] always has *some*
    /// context to anchor against, even at the very start/end of the
    /// text. Returns the padding string used, which must be stripped
    /// back off the result.
    pub fn add_padding(&self, patches: &mut [Hunk]) -> String {
        let padding_len = self.margin as i64;
        let null_padding: String = (1..=padding_len)
            .map(|x| char::from_u32(x as u32).expect("margin is far below the surrogate range"))
            .collect();

        for p in patches.iter_mut() {
            p.start1 = p.start1.map(|s| s + padding_len);
            p.start2 = p.start2.map(|s| s + padding_len);
        }

        if let Some(first) = patches.first_mut() {
            let needs_prefix = first.diffs.first().map_or(true, |d| d.op != Op::Equal);
            if needs_prefix {
                first.diffs.insert(0, DiffOp::new(Op::Equal, null_padding.clone()));
                first.start1 = first.start1.map(|s| s - padding_len);
                first.start2 = first.start2.map(|s| s - padding_len);
                first.length1 += padding_len as usize;
                first.length2 += padding_len as usize;
            } else {
                let existing = first.diffs[0].len();
                if padding_len as usize > existing {
                    let extra = padding_len as usize - existing;
                    let prefix: String = null_padding.chars().skip(existing).collect();
                    first.diffs[0].text = format!("{prefix}{}", first.diffs[0].text);
                    first.start1 = first.start1.map(|s| s - extra as i64);
                    first.start2 = first.start2.map(|s| s - extra as i64);
                    first.length1 += extra;
                    first.length2 += extra;
                }
            }
        }

        if let Some(last) = patches.last_mut() {
            let needs_suffix = last.diffs.last().map_or(true, |d| d.op != Op::Equal);
            if needs_suffix {
                last.diffs.push(DiffOp::new(Op::Equal, null_padding.clone()));
                last.length1 += padding_len as usize;
                last.length2 += padding_len as usize;
            } else {
                let n = last.diffs.len() - 1;
                let existing = last.diffs[n].len();
                if padding_len as usize > existing {
                    let extra = padding_len as usize - existing;
                    let suffix: String = null_padding.chars().take(extra).collect();
                    last.diffs[n].text.push_str(&suffix);
                    last.length1 += extra;
                    last.length2 += extra;
                }
            }
        }

        null_padding
    }

    /// Splits any hunk whose `length1` exceeds `self.matching.max_bits`
    /// into several smaller hunks, each carrying its own rolling
    /// context, so that [`Patch::apply`]'s Bitap relocation can address
    /// every hunk directly.
    pub fn split_max(&self, patches: &mut Vec<Hunk>) {
        let patch_size = self.matching.max_bits as usize;
        let margin = self.margin as usize;
        let mut x = 0usize;

        while x < patches.len() {
            if patches[x].length1 <= patch_size {
                x += 1;
                continue;
            }

            let mut bigpatch = patches.remove(x);
            let mut start1 = bigpatch.start1.unwrap_or(0);
            let mut start2 = bigpatch.start2.unwrap_or(0);
            let mut precontext: Vec<char> = Vec::new();
            let mut insert_at = x;

            while !bigpatch.diffs.is_empty() {
                let mut patch = Hunk::default();
                let mut empty = true;
                patch.start1 = Some(start1 - precontext.len() as i64);
                patch.start2 = Some(start2 - precontext.len() as i64);
                if !precontext.is_empty() {
                    patch.length1 = precontext.len();
                    patch.length2 = precontext.len();
                    patch.diffs.push(DiffOp::new(Op::Equal, from_chars(&precontext)));
                }

                while !bigpatch.diffs.is_empty()
                    && patch.length1 < patch_size.saturating_sub(margin)
                {
                    let diff_op = bigpatch.diffs[0].op;
                    let diff_chars = chars(&bigpatch.diffs[0].text);

                    if diff_op == Op::Insert {
                        patch.length2 += diff_chars.len();
                        start2 += diff_chars.len() as i64;
                        patch.diffs.push(bigpatch.diffs.remove(0));
                        empty = false;
                    } else if diff_op == Op::Delete
                        && patch.diffs.len() == 1
                        && patch.diffs[0].op == Op::Equal
                        && diff_chars.len() > 2 * patch_size
                    {
                        patch.length1 += diff_chars.len();
                        start1 += diff_chars.len() as i64;
                        empty = false;
                        patch.diffs.push(DiffOp::new(diff_op, from_chars(&diff_chars)));
                        bigpatch.diffs.remove(0);
                    } else {
                        let budget = patch_size.saturating_sub(margin).saturating_sub(patch.length1);
                        let take = budget.min(diff_chars.len());
                        let piece = &diff_chars[..take];
                        patch.length1 += piece.len();
                        start1 += piece.len() as i64;
                        if diff_op == Op::Equal {
                            patch.length2 += piece.len();
                            start2 += piece.len() as i64;
                        } else {
                            empty = false;
                        }
                        patch.diffs.push(DiffOp::new(diff_op, from_chars(piece)));
                        if piece.len() == diff_chars.len() {
                            bigpatch.diffs.remove(0);
                        } else {
                            bigpatch.diffs[0].text = from_chars(&diff_chars[piece.len()..]);
                        }
                    }
                }

                let precontext_src = chars(&Diff::text2(&patch.diffs));
                let keep = margin.min(precontext_src.len());
                precontext = precontext_src[precontext_src.len() - keep..].to_vec();

                let postcontext_src = chars(&Diff::text1(&bigpatch.diffs));
                let take = margin.min(postcontext_src.len());
                let postcontext = &postcontext_src[..take];
                if !postcontext.is_empty() {
                    patch.length1 += postcontext.len();
                    patch.length2 += postcontext.len();
                    let extend_last = patch.diffs.last().map_or(false, |d| d.op == Op::Equal);
                    if extend_last {
                        patch.diffs.last_mut().unwrap().text.push_str(&from_chars(postcontext));
                    } else {
                        patch.diffs.push(DiffOp::new(Op::Equal, from_chars(postcontext)));
                    }
                }

                if !empty {
                    patches.insert(insert_at, patch);
                    insert_at += 1;
                }
            }
            x = insert_at;
        }
    }

    /// Returns an independent copy of every hunk (and its own tuples),
    /// so the caller can hand `patches` to [`Patch::apply`] without
    /// losing their own list: `apply` already deep-copies internally,
    /// but other callers composing hunks manually may still want this.
    pub fn deep_copy(patches: &[Hunk]) -> Vec<Hunk> {
        patches.to_vec()
    }

    /// Applies `patches` to `text`, fuzzily relocating each hunk near
    /// its recorded position. Returns the patched text and, per hunk,
    /// whether it could be applied.
    pub fn apply(&self, patches: &[Hunk], text: &str) -> (String, Vec<bool>) {
        if patches.is_empty() {
            return (text.to_string(), Vec::new());
        }

        let mut patches = Self::deep_copy(patches);
        let null_padding = self.add_padding(&mut patches);
        let pad_len = null_padding.chars().count();
        self.split_max(&mut patches);

        let mut text_chars = chars(&format!("{null_padding}{text}{null_padding}"));
        let max_bits = self.matching.max_bits as usize;
        let mut delta: i64 = 0;
        let mut results = Vec::with_capacity(patches.len());

        for p in &patches {
            let start2 = p.start2.unwrap_or(0);
            let expected_loc = (start2 + delta).max(0) as usize;
            let text1 = Diff::text1(&p.diffs);
            let text1_chars = chars(&text1);

            let mut start_loc: i64 = -1;
            let mut end_loc: i64 = -1;

            if text1_chars.len() > max_bits {
                let head = from_chars(&text1_chars[..max_bits]);
                start_loc = self
                    .matching
                    .main(&from_chars(&text_chars), &head, expected_loc)
                    .unwrap_or(-1);
                if start_loc != -1 {
                    let tail = from_chars(&text1_chars[text1_chars.len() - max_bits..]);
                    let tail_expected = expected_loc + text1_chars.len() - max_bits;
                    end_loc = self
                        .matching
                        .main(&from_chars(&text_chars), &tail, tail_expected)
                        .unwrap_or(-1);
                    if end_loc == -1 || start_loc >= end_loc {
                        start_loc = -1;
                    }
                }
            } else {
                start_loc = self
                    .matching
                    .main(&from_chars(&text_chars), &text1, expected_loc)
                    .unwrap_or(-1);
            }

            if start_loc == -1 {
                results.push(false);
                delta -= p.length2 as i64 - p.length1 as i64;
                continue;
            }

            results.push(true);
            delta = start_loc - expected_loc as i64;
            let start_loc_u = start_loc as usize;

            let text2_end = if end_loc == -1 {
                (start_loc_u + text1_chars.len()).min(text_chars.len())
            } else {
                ((end_loc as usize) + max_bits).min(text_chars.len())
            };
            let text2_chars = text_chars[start_loc_u..text2_end].to_vec();

            if text1_chars == text2_chars {
                let ins_chars = chars(&Diff::text2(&p.diffs));
                text_chars.splice(
                    start_loc_u..(start_loc_u + text1_chars.len()).min(text_chars.len()),
                    ins_chars,
                );
            } else {
                let mut sub_diffs = self.diff.main(&text1, &from_chars(&text2_chars), false);
                let too_dirty = text1_chars.len() > max_bits
                    && (Diff::levenshtein(&sub_diffs) as f64 / text1_chars.len() as f64)
                        > self.delete_threshold;
                if too_dirty {
                    *results.last_mut().unwrap() = false;
                } else {
                    Diff::cleanup_semantic_lossless(&mut sub_diffs);
                    let mut index1 = 0usize;
                    for m in &p.diffs {
                        if m.op != Op::Equal {
                            let index2 = Diff::x_index(&sub_diffs, index1);
                            if m.op == Op::Insert {
                                let at = (start_loc_u + index2).min(text_chars.len());
                                text_chars.splice(at..at, chars(&m.text));
                            } else if m.op == Op::Delete {
                                let to = Diff::x_index(&sub_diffs, index1 + m.len());
                                let from = (start_loc_u + index2).min(text_chars.len());
                                let to = (start_loc_u + to).min(text_chars.len());
                                text_chars.splice(from..to, std::iter::empty());
                            }
                        }
                        if m.op != Op::Delete {
                            index1 += m.len();
                        }
                    }
                }
            }
        }

        let result_text = from_chars(&text_chars[pad_len..text_chars.len() - pad_len]);
        (result_text, results)
    }

    /// Serializes `patches` to the unified-diff-like patch-text format
    /// (spec.md §6).
    ///
    /// # Errors
    ///
    /// Returns [`Error::PatchNotInitialized`] if any hunk is unanchored;
    /// an unanchored hunk has no `@@ -start1,length1 +start2,length2 @@`
    /// header to emit.
    pub fn to_text(patches: &[Hunk]) -> Result<String> {
        text::to_text(patches)
    }

    /// Parses the format produced by [`Patch::to_text`].
    pub fn from_text(patch_text: &str) -> Result<Vec<Hunk>> {
        text::from_text(patch_text)
    }
}

fn substring(s: &[char], start: i64, end: i64) -> Vec<char> {
    let len = s.len() as i64;
    let mut start = start.clamp(0, len);
    let mut end = end.clamp(0, len);
    if start > end {
        std::mem::swap(&mut start, &mut end);
    }
    s[start as usize..end as usize].to_vec()
}

fn index_of(hay: &[char], needle: &[char]) -> usize {
    if needle.is_empty() {
        return 0;
    }
    if needle.len() > hay.len() {
        return usize::MAX;
    }
    hay.windows(needle.len())
        .position(|w| w == needle)
        .unwrap_or(usize::MAX)
}

fn last_index_of(hay: &[char], needle: &[char]) -> usize {
    if needle.is_empty() {
        return hay.len();
    }
    if needle.len() > hay.len() {
        return usize::MAX;
    }
    hay.windows(needle.len())
        .rposition(|w| w == needle)
        .unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_then_apply_round_trips() {
        let patcher = Patch::default();
        let text1 = "The quick brown fox jumps over the lazy dog.";
        let text2 = "The quick brown fox leaps over the lazy dog.";
        let patches = patcher.make_from_texts(text1, text2);
        let (result, results) = patcher.apply(&patches, text1);
        assert_eq!(result, text2);
        assert!(results.iter().all(|&ok| ok));
    }

    #[test]
    fn apply_tolerates_surrounding_drift() {
        let patcher = Patch::default();
        let text1 = "The quick brown fox jumps over the lazy dog.";
        let text2 = "The quick brown fox leaps over the lazy dog.";
        let patches = patcher.make_from_texts(text1, text2);

        let drifted = format!("Once upon a time. {text1} The end.");
        let (result, results) = patcher.apply(&patches, &drifted);
        assert!(results.iter().all(|&ok| ok));
        assert!(result.contains("leaps over the lazy dog"));
    }

    #[test]
    fn apply_on_unrelated_text_fails_gracefully() {
        let patcher = Patch::default();
        let patches = patcher.make_from_texts("hello world", "hello there");
        let (result, results) = patcher.apply(&patches, "completely unrelated content");
        assert!(!results.iter().all(|&ok| ok) || result == "completely unrelated content");
    }

    #[test]
    fn deep_copy_is_independent_of_the_original() {
        let patcher = Patch::default();
        let patches = patcher.make_from_texts("hello world", "hello there");
        let mut copy = Patch::deep_copy(&patches);
        copy[0].diffs.push(DiffOp::new(Op::Equal, "extra"));
        assert_ne!(copy[0].diffs.len(), patches[0].diffs.len());
    }

    #[test]
    fn add_context_rejects_unanchored_hunk() {
        let patcher = Patch::default();
        let mut hunk = Hunk::default();
        let err = patcher.add_context(&mut hunk, "some text").unwrap_err();
        assert!(matches!(err, Error::PatchNotInitialized));
    }

    #[test]
    fn split_max_respects_pattern_length() {
        let patcher = Patch {
            matching: Match {
                max_bits: 32,
                ..Default::default()
            },
            ..Default::default()
        };
        let text1 = "a".repeat(100);
        let text2 = format!("{}X{}", "a".repeat(50), "a".repeat(49));
        let mut patches = patcher.make_from_texts(&text1, &text2);
        patcher.split_max(&mut patches);
        for p in &patches {
            assert!(p.length1 <= 32);
        }
    }
}
