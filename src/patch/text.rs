//! The patch-text serialization format (spec.md §6): a unified-diff-style
//! header (`@@ -start1,length1 +start2,length2 @@`) per hunk, followed by
//! one `+`/`-`/` ` prefixed, percent-encoded line per tuple in that
//! hunk's diff.
//!
//! Grounded on the teacher's `unified_diff.rs` header formatting
//! (`UnifiedDiffConfig`'s `@@ -l1,s1 +l2,s2 @@` line), generalized here
//! to the coordinate-omission rules spec.md §6 requires for 0- and
//! 1-length spans, and on `stencila-stencila`'s use of `regex` for
//! structured text parsing.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;

use super::Hunk;
use crate::diff::{DiffOp, Op};
use crate::error::{Error, Result};

const PATCH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b';')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b',')
    .remove(b'#');

pub(super) fn to_text(patches: &[Hunk]) -> Result<String> {
    patches.iter().try_fold(String::new(), |mut out, p| {
        out.push_str(&hunk_to_text(p)?);
        Ok(out)
    })
}

fn hunk_to_text(patch: &Hunk) -> Result<String> {
    let (start1, start2) = match (patch.start1, patch.start2) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(Error::PatchNotInitialized),
    };
    let coords1 = coords(start1, patch.length1);
    let coords2 = coords(start2, patch.length2);
    let mut out = format!("@@ -{coords1} +{coords2} @@\n");
    for d in &patch.diffs {
        let sign = match d.op {
            Op::Insert => '+',
            Op::Delete => '-',
            Op::Equal => ' ',
        };
        out.push(sign);
        out.push_str(&utf8_percent_encode(&d.text, PATCH_ENCODE_SET).to_string());
        out.push('\n');
    }
    Ok(out.replace("%20", " "))
}

fn coords(start: i64, length: usize) -> String {
    match length {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        n => format!("{},{n}", start + 1),
    }
}

pub(super) fn from_text(patch_text: &str) -> Result<Vec<Hunk>> {
    let mut patches = Vec::new();
    if patch_text.is_empty() {
        return Ok(patches);
    }

    let header = Regex::new(r"^@@ -(\d+),?(\d*) \+(\d+),?(\d*) @@$").unwrap();
    let lines: Vec<&str> = patch_text.split('\n').collect();
    let mut i = 0usize;

    while i < lines.len() {
        let line = lines[i];
        let caps = header
            .captures(line)
            .ok_or_else(|| Error::InvalidPatchText(line.to_string()))?;

        let mut patch = Hunk::default();
        let (start1, length1) = parse_span(&caps[1], &caps[2], line)?;
        let (start2, length2) = parse_span(&caps[3], &caps[4], line)?;
        patch.start1 = Some(start1);
        patch.length1 = length1;
        patch.start2 = Some(start2);
        patch.length2 = length2;

        i += 1;
        while i < lines.len() {
            let line = lines[i];
            match line.chars().next() {
                None => {}
                Some('@') => break,
                Some(sign @ ('-' | '+' | ' ')) => {
                    let rest = &line[sign.len_utf8()..];
                    let decoded = percent_encoding::percent_decode_str(rest)
                        .decode_utf8()
                        .map_err(|_| Error::InvalidEscape(rest.to_string()))?
                        .into_owned();
                    let op = match sign {
                        '-' => Op::Delete,
                        '+' => Op::Insert,
                        _ => Op::Equal,
                    };
                    patch.diffs.push(DiffOp::new(op, decoded));
                }
                Some(other) => {
                    return Err(Error::InvalidPatchText(format!(
                        "invalid patch mode '{other}' in: {line}"
                    )))
                }
            }
            i += 1;
        }
        patches.push(patch);
    }

    Ok(patches)
}

fn parse_span(start_raw: &str, len_raw: &str, line: &str) -> Result<(i64, usize)> {
    let start_raw: i64 = start_raw
        .parse()
        .map_err(|_| Error::InvalidPatchText(line.to_string()))?;
    if len_raw.is_empty() {
        Ok((start_raw - 1, 1))
    } else if len_raw == "0" {
        Ok((start_raw, 0))
    } else {
        let length: usize = len_raw
            .parse()
            .map_err(|_| Error::InvalidPatchText(line.to_string()))?;
        Ok((start_raw - 1, length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::Patch;

    #[test]
    fn round_trips_make_to_text_from_text() {
        let patcher = Patch::default();
        let patches = patcher.make_from_texts(
            "The quick brown fox jumps over the lazy dog.",
            "The quick brown fox leaps over the lazy dog.",
        );
        let text = to_text(&patches).unwrap();
        let parsed = from_text(&text).unwrap();
        assert_eq!(parsed, patches);
    }

    #[test]
    fn header_omits_length_for_single_char_spans() {
        let mut patch = Hunk::default();
        patch.start1 = Some(20);
        patch.length1 = 1;
        patch.start2 = Some(20);
        patch.length2 = 1;
        patch.diffs.push(DiffOp::new(Op::Equal, "x"));
        let text = hunk_to_text(&patch).unwrap();
        assert!(text.starts_with("@@ -21 +21 @@\n"));
    }

    #[test]
    fn refuses_to_serialize_an_unanchored_hunk() {
        let err = to_text(&[Hunk::default()]).unwrap_err();
        assert!(matches!(err, Error::PatchNotInitialized));
    }

    #[test]
    fn rejects_malformed_header() {
        let err = from_text("not a header\n").unwrap_err();
        assert!(matches!(err, Error::InvalidPatchText(_)));
    }
}
