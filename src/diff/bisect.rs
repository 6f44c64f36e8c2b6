//! The Myers `O(ND)` bidirectional bisection (spec.md §4.1.3).
//!
//! Structurally this is the same d-band expansion the teacher's
//! `myers.rs` performs for generic tokens (forward/reverse frontier
//! arrays, snake-following, deadline-bounded `d` loop), generalized here
//! to operate directly on `char` slices and to return the actual text
//! spans of a diff script rather than calling into a `Sink`.

use std::time::Instant;

use super::{from_chars, DiffOp, Op, Script};
use crate::Diff;

/// Finds the middle snake of `text1`/`text2` and recursively splits the
/// problem there. Returns a coarse `[Delete, Insert]` script if `deadline`
/// expires before a snake is found.
pub(super) fn bisect(engine: &Diff, text1: &[char], text2: &[char], deadline: Option<Instant>) -> Script {
    let len1 = text1.len() as i32;
    let len2 = text2.len() as i32;
    let max_d = ((len1 + len2 + 1) / 2) as usize;
    let v_offset = max_d as i32;
    let v_len = 2 * max_d;

    let mut v1 = vec![-1i32; v_len];
    let mut v2 = vec![-1i32; v_len];
    v1[(v_offset + 1) as usize] = 0;
    v2[(v_offset + 1) as usize] = 0;

    let delta = len1 - len2;
    // if the total number of characters is odd, the front path runs odd
    // `d`; we check for overlap with the reverse path there.
    let front = delta % 2 != 0;

    let mut k1start = 0i32;
    let mut k1end = 0i32;
    let mut k2start = 0i32;
    let mut k2end = 0i32;

    for d in 0..max_d as i32 {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                break;
            }
        }

        // forward path
        let mut k1 = -d + k1start;
        while k1 <= d - k1end {
            let k1_offset = (v_offset + k1) as usize;
            let mut x1 = if k1 == -d
                || (k1 != d && v1[k1_offset - 1] < v1[k1_offset + 1])
            {
                v1[k1_offset + 1]
            } else {
                v1[k1_offset - 1] + 1
            };
            let mut y1 = x1 - k1;
            while x1 < len1 && y1 < len2 && text1[x1 as usize] == text2[y1 as usize] {
                x1 += 1;
                y1 += 1;
            }
            v1[k1_offset] = x1;
            if x1 > len1 {
                k1end += 2;
            } else if y1 > len2 {
                k1start += 2;
            } else if front {
                let k2_offset = v_offset + delta - k1;
                if (0..v_len as i32).contains(&k2_offset) && v2[k2_offset as usize] != -1 {
                    let x2 = len1 - v2[k2_offset as usize];
                    if x1 >= x2 {
                        return bisect_split(engine, text1, text2, x1 as usize, y1 as usize, deadline);
                    }
                }
            }
            k1 += 2;
        }

        // reverse path
        let mut k2 = -d + k2start;
        while k2 <= d - k2end {
            let k2_offset = (v_offset + k2) as usize;
            let mut x2 = if k2 == -d
                || (k2 != d && v2[k2_offset - 1] < v2[k2_offset + 1])
            {
                v2[k2_offset + 1]
            } else {
                v2[k2_offset - 1] + 1
            };
            let mut y2 = x2 - k2;
            while x2 < len1 && y2 < len2 {
                let a = text1[(len1 - x2 - 1) as usize];
                let b = text2[(len2 - y2 - 1) as usize];
                if a != b {
                    break;
                }
                x2 += 1;
                y2 += 1;
            }
            v2[k2_offset] = x2;
            if x2 > len1 {
                k2end += 2;
            } else if y2 > len2 {
                k2start += 2;
            } else if !front {
                let k1_offset = v_offset + delta - k2;
                if (0..v_len as i32).contains(&k1_offset) && v1[k1_offset as usize] != -1 {
                    let x1 = v1[k1_offset as usize];
                    let y1 = v_offset + x1 - k1_offset;
                    let x2_mirrored = len1 - x2;
                    if x1 >= x2_mirrored {
                        return bisect_split(engine, text1, text2, x1 as usize, y1 as usize, deadline);
                    }
                }
            }
            k2 += 2;
        }
    }

    // No snake found within the deadline: no commonality could be
    // confirmed, so every character differs.
    vec![
        DiffOp::new(Op::Delete, from_chars(text1)),
        DiffOp::new(Op::Insert, from_chars(text2)),
    ]
}

fn bisect_split(
    engine: &Diff,
    text1: &[char],
    text2: &[char],
    x: usize,
    y: usize,
    deadline: Option<Instant>,
) -> Script {
    let (text1a, text1b) = text1.split_at(x);
    let (text2a, text2b) = text2.split_at(y);
    let a = from_chars(text1a);
    let b = from_chars(text2a);
    let c = from_chars(text1b);
    let e = from_chars(text2b);
    let mut script = engine.main_with_deadline(&a, &b, false, deadline);
    script.extend(engine.main_with_deadline(&c, &e, false, deadline));
    script
}
