//! The diff engine: computes and reshapes edit scripts between two strings.
//!
//! A diff is represented as an ordered [`Vec<DiffOp>`], each tuple pairing
//! an [`Op`] with the `char` span it applies to. See the crate-level docs
//! for the three-engine overview.

use std::time::{Duration, Instant};

mod bisect;
mod cleanup;
mod delta;
mod lines;

pub(crate) use lines::{chars_to_lines, lines_to_chars};

/// One of the three edit kinds a [`DiffOp`] can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Characters present in `text1` but not `text2`.
    Delete,
    /// Characters present in `text2` but not `text1`.
    Insert,
    /// Characters common to both `text1` and `text2`.
    Equal,
}

/// A single `(op, text)` pair in an edit script.
///
/// `text` is always a contiguous run of `char`s; see [`SPEC_FULL.md`]'s
/// Unicode-atom decision for why this crate indexes by `char` rather than
/// UTF-16 code unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOp {
    /// The edit kind.
    pub op: Op,
    /// The affected text span.
    pub text: String,
}

impl DiffOp {
    pub(crate) fn new(op: Op, text: impl Into<String>) -> Self {
        DiffOp {
            op,
            text: text.into(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// An edit script: an ordered sequence of [`DiffOp`]s.
pub type Script = Vec<DiffOp>;

pub(crate) fn chars(s: &str) -> Vec<char> {
    s.chars().collect()
}

pub(crate) fn from_chars(cs: &[char]) -> String {
    cs.iter().collect()
}

/// Configuration and entry point for the diff engine.
///
/// Mirrors the teacher's small, `Copy`, `Default`-able config structs
/// (e.g. `ContextSize`/`UnifiedDiffConfig`) rather than a single
/// stringly-typed settings bag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diff {
    /// Number of seconds [`Diff::main`] may spend before returning a
    /// coarse, non-minimal script. `0.0` means no timeout.
    pub timeout: f64,
    /// Cost of an edit operation in terms of equivalent characters, used
    /// by [`Diff::cleanup_efficiency`] to decide whether merging small
    /// edits is worthwhile.
    pub edit_cost: u32,
}

impl Default for Diff {
    fn default() -> Self {
        Diff {
            timeout: 1.0,
            edit_cost: 4,
        }
    }
}

impl Diff {
    fn deadline(&self) -> Option<Instant> {
        if self.timeout <= 0.0 {
            None
        } else {
            Some(Instant::now() + Duration::from_secs_f64(self.timeout))
        }
    }

    /// Computes the edit script transforming `text1` into `text2`, then
    /// runs [`Diff::cleanup_merge`] on the result.
    ///
    /// Equal inputs return `[(Equal, text1)]`, or an empty script if both
    /// are empty. Otherwise the common prefix/suffix is stripped, the
    /// remaining middle is handed to [`Diff::compute`], and the stripped
    /// pieces are re-wrapped as equalities.
    pub fn main(&self, text1: &str, text2: &str, checklines: bool) -> Script {
        let deadline = self.deadline();
        let mut script = self.main_with_deadline(text1, text2, checklines, deadline);
        cleanup::cleanup_merge(&mut script);
        script
    }

    fn main_with_deadline(
        &self,
        text1: &str,
        text2: &str,
        checklines: bool,
        deadline: Option<Instant>,
    ) -> Script {
        if text1 == text2 {
            return if text1.is_empty() {
                Vec::new()
            } else {
                vec![DiffOp::new(Op::Equal, text1)]
            };
        }

        let c1 = chars(text1);
        let c2 = chars(text2);

        let prefix_len = common_prefix_chars(&c1, &c2);
        let (c1_mid, c2_mid) = (&c1[prefix_len..], &c2[prefix_len..]);
        let suffix_len = common_suffix_chars(c1_mid, c2_mid);
        let c1_mid = &c1_mid[..c1_mid.len() - suffix_len];
        let c2_mid = &c2_mid[..c2_mid.len() - suffix_len];

        let mut script = self.compute(c1_mid, c2_mid, checklines, deadline);

        if prefix_len > 0 {
            script.insert(0, DiffOp::new(Op::Equal, from_chars(&c1[..prefix_len])));
        }
        if suffix_len > 0 {
            script.push(DiffOp::new(
                Op::Equal,
                from_chars(&c1[c1.len() - suffix_len..]),
            ));
        }
        script
    }

    /// Computes an edit script for `text1`/`text2` with no common
    /// prefix/suffix assumed to have been stripped by the caller. Prefer
    /// [`Diff::main`] unless you are implementing a cleanup pass.
    pub(crate) fn compute(
        &self,
        text1: &[char],
        text2: &[char],
        checklines: bool,
        deadline: Option<Instant>,
    ) -> Script {
        if text1.is_empty() {
            return vec![DiffOp::new(Op::Insert, from_chars(text2))];
        }
        if text2.is_empty() {
            return vec![DiffOp::new(Op::Delete, from_chars(text1))];
        }

        let (long, short, swapped) = if text1.len() > text2.len() {
            (text1, text2, false)
        } else {
            (text2, text1, true)
        };

        if let Some(i) = find_subsequence(long, short) {
            let op = if swapped { Op::Delete } else { Op::Insert };
            let mut script = Vec::with_capacity(3);
            if i > 0 {
                script.push(DiffOp::new(op, from_chars(&long[..i])));
            }
            script.push(DiffOp::new(Op::Equal, from_chars(short)));
            if i + short.len() < long.len() {
                script.push(DiffOp::new(op, from_chars(&long[i + short.len()..])));
            }
            return script;
        }

        if short.len() == 1 {
            return vec![
                DiffOp::new(Op::Delete, from_chars(text1)),
                DiffOp::new(Op::Insert, from_chars(text2)),
            ];
        }

        // half-match is skipped under an infinite deadline: it can yield
        // a non-minimal (but still valid) diff.
        if self.timeout > 0.0 {
            if let Some(hm) = half_match(text1, text2) {
                let diff_a = self.compute(hm.text1_a, hm.text2_a, checklines, deadline);
                let diff_b = self.compute(hm.text1_b, hm.text2_b, checklines, deadline);
                let mut script = diff_a;
                script.push(DiffOp::new(Op::Equal, from_chars(hm.common_mid)));
                script.extend(diff_b);
                return script;
            }
        }

        if checklines && text1.len() > 100 && text2.len() > 100 {
            return self.line_mode(text1, text2, deadline);
        }

        bisect::bisect(self, text1, text2, deadline)
    }

    fn line_mode(&self, text1: &[char], text2: &[char], deadline: Option<Instant>) -> Script {
        let encoded = lines::lines_to_chars(text1, text2);
        let mut script = self.compute(&encoded.text1, &encoded.text2, false, deadline);
        lines::chars_to_lines(&mut script, &encoded.line_array);
        cleanup::cleanup_semantic(&mut script);
        rediff_adjacent_edits(self, &mut script, deadline);
        script
    }

    /// Reconstructs `text1` from a script.
    pub fn text1(script: &[DiffOp]) -> String {
        script
            .iter()
            .filter(|d| d.op != Op::Insert)
            .map(|d| d.text.as_str())
            .collect()
    }

    /// Reconstructs `text2` from a script.
    pub fn text2(script: &[DiffOp]) -> String {
        script
            .iter()
            .filter(|d| d.op != Op::Delete)
            .map(|d| d.text.as_str())
            .collect()
    }

    /// Maps a char offset in `text1` to the corresponding offset in
    /// `text2`. If `loc` falls inside a deletion, returns the offset
    /// where that deletion begins in `text2`.
    pub fn x_index(script: &[DiffOp], loc: usize) -> usize {
        let mut chars1 = 0usize;
        let mut chars2 = 0usize;
        let mut last_chars1 = 0usize;
        let mut last_chars2 = 0usize;
        let mut last_op = None;
        for d in script {
            if d.op != Op::Insert {
                chars1 += d.len();
            }
            if d.op != Op::Delete {
                chars2 += d.len();
            }
            if chars1 > loc {
                last_op = Some(d.op);
                break;
            }
            last_chars1 = chars1;
            last_chars2 = chars2;
        }
        if last_op == Some(Op::Delete) {
            return last_chars2;
        }
        last_chars2 + (loc - last_chars1)
    }

    /// Number of edit characters in `script`, where a delete+insert pair
    /// counts as `max(|del|, |ins|)` substitutions.
    pub fn levenshtein(script: &[DiffOp]) -> usize {
        let mut levenshtein = 0usize;
        let mut insertions = 0usize;
        let mut deletions = 0usize;
        for d in script {
            match d.op {
                Op::Insert => insertions += d.len(),
                Op::Delete => deletions += d.len(),
                Op::Equal => {
                    levenshtein += insertions.max(deletions);
                    insertions = 0;
                    deletions = 0;
                }
            }
        }
        levenshtein + insertions.max(deletions)
    }

    /// Runs [`Diff::cleanup_merge`], `cleanup_semantic` and friends are
    /// exposed individually; see each method's docs.
    pub fn cleanup_merge(script: &mut Script) {
        cleanup::cleanup_merge(script)
    }

    /// Eliminates coincidental tiny equalities, converting them into
    /// delete+insert pairs to produce a semantically meaningful diff.
    pub fn cleanup_semantic(script: &mut Script) {
        cleanup::cleanup_semantic(script)
    }

    /// Shifts single edits bounded by equalities toward the nearest
    /// logical boundary (line break, sentence end, word break).
    pub fn cleanup_semantic_lossless(script: &mut Script) {
        cleanup::cleanup_semantic_lossless(script)
    }

    /// Reduces the number of edits for machine-processing efficiency
    /// using `self.edit_cost` as the threshold.
    pub fn cleanup_efficiency(&self, script: &mut Script) {
        cleanup::cleanup_efficiency(script, self.edit_cost)
    }

    /// Serializes `script` to the compact delta format (spec.md §6).
    pub fn to_delta(script: &[DiffOp]) -> String {
        delta::to_delta(script)
    }

    /// Parses a delta produced by [`Diff::to_delta`] back into a script,
    /// validating it against `text1`.
    pub fn from_delta(text1: &str, delta: &str) -> crate::error::Result<Script> {
        delta::from_delta(text1, delta)
    }

    /// Renders `script` as a minimal pretty-printed HTML fragment using
    /// `<ins>`/`<del>`/`<span>` tags. Kept for public-API completeness;
    /// not otherwise exercised by the engines in this crate.
    pub fn pretty_html(script: &[DiffOp]) -> String {
        let mut html = String::new();
        for d in script {
            let escaped = d
                .text
                .replace('&', "&amp;")
                .replace('<', "&lt;")
                .replace('>', "&gt;")
                .replace('\n', "&para;<br>");
            match d.op {
                Op::Insert => {
                    html.push_str("<ins>");
                    html.push_str(&escaped);
                    html.push_str("</ins>");
                }
                Op::Delete => {
                    html.push_str("<del>");
                    html.push_str(&escaped);
                    html.push_str("</del>");
                }
                Op::Equal => {
                    html.push_str("<span>");
                    html.push_str(&escaped);
                    html.push_str("</span>");
                }
            }
        }
        html
    }

    /// Finds a substring of at least half the longer side's length
    /// common to both `text1` and `text2`. Public for testability; used
    /// internally by [`Diff::compute`].
    pub fn half_match(text1: &str, text2: &str) -> Option<(String, String, String, String, String)> {
        let c1 = chars(text1);
        let c2 = chars(text2);
        half_match(&c1, &c2).map(|hm| {
            (
                from_chars(hm.text1_a),
                from_chars(hm.text1_b),
                from_chars(hm.text2_a),
                from_chars(hm.text2_b),
                from_chars(hm.common_mid),
            )
        })
    }

    /// Runs the Myers bisection directly, bypassing the substring/
    /// half-match/line-mode fast paths `main` normally tries first.
    pub fn bisect(&self, text1: &str, text2: &str) -> Script {
        let c1 = chars(text1);
        let c2 = chars(text2);
        bisect::bisect(self, &c1, &c2, self.deadline())
    }
}

/// Length of the longest common prefix of `a` and `b`, in chars.
pub fn common_prefix(a: &str, b: &str) -> usize {
    common_prefix_chars(&chars(a), &chars(b))
}

/// Length of the longest common suffix of `a` and `b`, in chars.
pub fn common_suffix(a: &str, b: &str) -> usize {
    common_suffix_chars(&chars(a), &chars(b))
}

/// Length of the longest run that is both a suffix of `a` and a prefix of
/// `b` (no Unicode ligature folding — `"fi"`/`"\u{fb01}i"` overlap by 0).
pub fn common_overlap(a: &str, b: &str) -> usize {
    let a = chars(a);
    let b = chars(b);
    common_overlap_chars(&a, &b)
}

pub(crate) fn common_prefix_chars(a: &[char], b: &[char]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

pub(crate) fn common_suffix_chars(a: &[char], b: &[char]) -> usize {
    a.iter().rev().zip(b.iter().rev()).take_while(|(x, y)| x == y).count()
}

pub(crate) fn common_overlap_chars(a: &[char], b: &[char]) -> usize {
    let a_len = a.len();
    let b_len = b.len();
    if a_len == 0 || b_len == 0 {
        return 0;
    }
    let (a, b) = if a_len > b_len { (&a[a_len - b_len..], b) } else { (a, &b[..a_len]) };
    let min_len = a.len().min(b.len());
    if a == b {
        return min_len;
    }
    let mut best = 0usize;
    for len in 1..=min_len {
        let suffix = &a[a.len() - len..];
        let prefix = &b[..len];
        if suffix == prefix {
            best = len;
        }
    }
    best
}

fn find_subsequence(hay: &[char], needle: &[char]) -> Option<usize> {
    find_subsequence_from(hay, needle, 0)
}

fn find_subsequence_from(hay: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(hay.len()));
    }
    if from >= hay.len() {
        return None;
    }
    hay[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

struct HalfMatch<'a> {
    text1_a: &'a [char],
    text1_b: &'a [char],
    text2_a: &'a [char],
    text2_b: &'a [char],
    common_mid: &'a [char],
}

fn half_match<'a>(text1: &'a [char], text2: &'a [char]) -> Option<HalfMatch<'a>> {
    let (long, short, swapped) = if text1.len() > text2.len() {
        (text1, text2, false)
    } else {
        (text2, text1, true)
    };
    if long.len() < 4 || short.len() * 2 < long.len() {
        return None;
    }

    let seed_len = long.len() / 4;
    let hm1 = half_match_i(long, short, seed_len, (long.len() + 3) / 4);
    let hm2 = half_match_i(long, short, seed_len, (long.len() + 1) / 2);

    let best = match (hm1, hm2) {
        (None, None) => return None,
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (Some(a), Some(b)) => {
            if a.4.len() > b.4.len() {
                a
            } else {
                b
            }
        }
    };

    let (long_a, long_b, short_a, short_b, mid) = best;
    if swapped {
        Some(HalfMatch {
            text1_a: short_a,
            text1_b: short_b,
            text2_a: long_a,
            text2_b: long_b,
            common_mid: mid,
        })
    } else {
        Some(HalfMatch {
            text1_a: long_a,
            text1_b: long_b,
            text2_a: short_a,
            text2_b: short_b,
            common_mid: mid,
        })
    }
}

type HalfMatchParts<'a> = (&'a [char], &'a [char], &'a [char], &'a [char], &'a [char]);

/// Looks for a `seed_len`-char seed of `long` starting at `start`, tries
/// every occurrence of that seed in `short`, and keeps whichever one
/// expands (via matching prefix/suffix around it) into the longest common
/// substring. Returns `None` if no expansion covers at least half of
/// `long`.
fn half_match_i<'a>(
    long: &'a [char],
    short: &'a [char],
    seed_len: usize,
    start: usize,
) -> Option<HalfMatchParts<'a>> {
    if start + seed_len > long.len() {
        return None;
    }
    let seed = &long[start..start + seed_len];

    let mut best: Option<HalfMatchParts<'a>> = None;
    let mut best_len = 0usize;
    let mut j = find_subsequence(short, seed);
    while let Some(found) = j {
        let prefix_len = common_prefix_chars(&long[start..], &short[found..]);
        let suffix_len = common_suffix_chars(&long[..start], &short[..found]);
        if prefix_len + suffix_len > best_len {
            best_len = prefix_len + suffix_len;
            let mid_start = start - suffix_len;
            let mid_end = start + prefix_len;
            let short_mid_start = found - suffix_len;
            let short_mid_end = found + prefix_len;
            best = Some((
                &long[..mid_start],
                &long[mid_end..],
                &short[..short_mid_start],
                &short[short_mid_end..],
                &long[mid_start..mid_end],
            ));
        }
        j = find_subsequence_from(short, seed, found + 1);
    }

    if best_len * 2 >= long.len() {
        best
    } else {
        None
    }
}

/// After line-mode decoding, any mutually-adjacent delete/insert blocks
/// are re-diffed character by character to sharpen the result.
fn rediff_adjacent_edits(engine: &Diff, script: &mut Script, deadline: Option<Instant>) {
    script.push(DiffOp::new(Op::Equal, ""));
    let mut i = 0usize;
    let mut count_delete = 0usize;
    let mut count_insert = 0usize;
    let mut text_delete = String::new();
    let mut text_insert = String::new();
    let mut out: Script = Vec::with_capacity(script.len());
    while i < script.len() {
        match script[i].op {
            Op::Insert => {
                count_insert += 1;
                text_insert.push_str(&script[i].text);
            }
            Op::Delete => {
                count_delete += 1;
                text_delete.push_str(&script[i].text);
            }
            Op::Equal => {
                if count_delete >= 1 && count_insert >= 1 {
                    let sub = engine.main_with_deadline(&text_delete, &text_insert, false, deadline);
                    out.extend(sub);
                } else {
                    if !text_delete.is_empty() {
                        out.push(DiffOp::new(Op::Delete, text_delete.clone()));
                    }
                    if !text_insert.is_empty() {
                        out.push(DiffOp::new(Op::Insert, text_insert.clone()));
                    }
                }
                count_delete = 0;
                count_insert = 0;
                text_delete.clear();
                text_insert.clear();
                if !script[i].is_empty() {
                    out.push(script[i].clone());
                }
            }
        }
        i += 1;
    }
    out.pop_if_empty_equal();
    *script = out;
}

trait PopIfEmptyEqual {
    fn pop_if_empty_equal(&mut self);
}

impl PopIfEmptyEqual for Script {
    fn pop_if_empty_equal(&mut self) {
        if matches!(self.last(), Some(d) if d.op == Op::Equal && d.is_empty()) {
            self.pop();
        }
    }
}
