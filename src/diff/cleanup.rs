//! Post-diff cleanup passes (spec.md §4.1.4): `cleanup_merge` canonicalizes
//! a raw script, `cleanup_semantic`/`cleanup_semantic_lossless` reshape it
//! for human readability, and `cleanup_efficiency` reshapes it for
//! downstream machine processing.

use super::{common_overlap_chars, common_prefix_chars, common_suffix_chars, DiffOp, Op, Script};

fn chars(s: &str) -> Vec<char> {
    s.chars().collect()
}

fn from_chars(cs: &[char]) -> String {
    cs.iter().collect()
}

/// Coalesces runs of same-op tuples, factors out common prefix/suffix
/// between adjacent delete+insert pairs into surrounding equalities,
/// drops empty tuples, then makes a second pass that shifts single edits
/// sideways when they can merge with a neighboring equality. Repeats
/// until the second pass finds nothing left to shift.
pub(super) fn cleanup_merge(script: &mut Script) {
    script.push(DiffOp::new(Op::Equal, ""));

    let mut pointer = 0usize;
    let mut count_delete = 0usize;
    let mut count_insert = 0usize;
    let mut text_delete = String::new();
    let mut text_insert = String::new();

    while pointer < script.len() {
        match script[pointer].op {
            Op::Insert => {
                count_insert += 1;
                text_insert.push_str(&script[pointer].text);
                pointer += 1;
            }
            Op::Delete => {
                count_delete += 1;
                text_delete.push_str(&script[pointer].text);
                pointer += 1;
            }
            Op::Equal => {
                if count_delete + count_insert > 1 {
                    if count_delete != 0 && count_insert != 0 {
                        let del_chars = chars(&text_delete);
                        let ins_chars = chars(&text_insert);

                        let common_prefix = common_prefix_chars(&ins_chars, &del_chars);
                        if common_prefix != 0 {
                            let prefix_text = from_chars(&ins_chars[..common_prefix]);
                            let x = pointer as isize - count_delete as isize - count_insert as isize - 1;
                            if x >= 0 && script[x as usize].op == Op::Equal {
                                script[x as usize].text.push_str(&prefix_text);
                            } else {
                                script.insert(0, DiffOp::new(Op::Equal, prefix_text));
                                pointer += 1;
                            }
                            text_insert = from_chars(&ins_chars[common_prefix..]);
                            text_delete = from_chars(&del_chars[common_prefix..]);
                        }

                        let del_chars = chars(&text_delete);
                        let ins_chars = chars(&text_insert);
                        let common_suffix = common_suffix_chars(&ins_chars, &del_chars);
                        if common_suffix != 0 {
                            let suffix_text = from_chars(&ins_chars[ins_chars.len() - common_suffix..]);
                            let mut merged = suffix_text;
                            merged.push_str(&script[pointer].text);
                            script[pointer].text = merged;
                            text_insert = from_chars(&ins_chars[..ins_chars.len() - common_suffix]);
                            text_delete = from_chars(&del_chars[..del_chars.len() - common_suffix]);
                        }
                    }

                    let mut replacement = Vec::with_capacity(2);
                    if !text_delete.is_empty() {
                        replacement.push(DiffOp::new(Op::Delete, text_delete.clone()));
                    }
                    if !text_insert.is_empty() {
                        replacement.push(DiffOp::new(Op::Insert, text_insert.clone()));
                    }
                    let start = pointer - count_delete - count_insert;
                    let replaced_len = replacement.len();
                    script.splice(start..pointer, replacement);
                    pointer = start + replaced_len + 1;
                } else if pointer != 0 && script[pointer - 1].op == Op::Equal {
                    let text = script[pointer].text.clone();
                    script[pointer - 1].text.push_str(&text);
                    script.remove(pointer);
                } else {
                    pointer += 1;
                }
                count_insert = 0;
                count_delete = 0;
                text_delete.clear();
                text_insert.clear();
            }
        }
    }

    if matches!(script.last(), Some(d) if d.is_empty()) {
        script.pop();
    }

    // second pass: single edits bounded by equalities that can shift
    // sideways to merge with a neighbor.
    let mut changes = false;
    let mut pointer = 1isize;
    while pointer < script.len() as isize - 1 {
        let p = pointer as usize;
        if script[p - 1].op == Op::Equal && script[p + 1].op == Op::Equal {
            let prev_text = script[p - 1].text.clone();
            let next_text = script[p + 1].text.clone();
            let edit = chars(&script[p].text);
            let prev = chars(&prev_text);
            let next = chars(&next_text);

            if edit.len() >= prev.len() && edit[edit.len() - prev.len()..] == prev[..] {
                let shifted_len = edit.len() - prev.len();
                let mut new_edit = prev.clone();
                new_edit.extend_from_slice(&edit[..shifted_len]);
                script[p].text = from_chars(&new_edit);
                let mut new_next = prev.clone();
                new_next.extend_from_slice(&next);
                script[p + 1].text = from_chars(&new_next);
                script.remove(p - 1);
                changes = true;
            } else if edit.len() >= next.len() && edit[..next.len()] == next[..] {
                script[p - 1].text.push_str(&next_text);
                let mut new_edit = edit[next.len()..].to_vec();
                new_edit.extend_from_slice(&next);
                script[p].text = from_chars(&new_edit);
                script.remove(p + 1);
                changes = true;
            }
        }
        pointer += 1;
    }
    if changes {
        cleanup_merge(script);
    }
}

/// Eliminates coincidental tiny equalities (spec.md §4.1.4).
pub(super) fn cleanup_semantic(script: &mut Script) {
    let mut changes = false;
    let mut equalities: Vec<usize> = Vec::new();
    let mut last_equality: Option<String> = None;
    let mut pointer: isize = 0;
    let mut len_ins1 = 0usize;
    let mut len_del1 = 0usize;
    let mut len_ins2 = 0usize;
    let mut len_del2 = 0usize;

    while (pointer as usize) < script.len() {
        let p = pointer as usize;
        if script[p].op == Op::Equal {
            equalities.push(p);
            len_ins1 = len_ins2;
            len_del1 = len_del2;
            len_ins2 = 0;
            len_del2 = 0;
            last_equality = Some(script[p].text.clone());
        } else {
            if script[p].op == Op::Insert {
                len_ins2 += script[p].len();
            } else {
                len_del2 += script[p].len();
            }
            if let Some(eq) = &last_equality {
                let eq_len = eq.chars().count();
                if eq_len <= len_ins1.max(len_del1) && eq_len <= len_ins2.max(len_del2) {
                    let idx = *equalities.last().unwrap();
                    script.insert(idx, DiffOp::new(Op::Delete, eq.clone()));
                    script[idx + 1].op = Op::Insert;
                    equalities.pop();
                    equalities.pop();
                    pointer = equalities.last().map_or(-1, |&i| i as isize);
                    len_ins1 = 0;
                    len_del1 = 0;
                    len_ins2 = 0;
                    len_del2 = 0;
                    last_equality = None;
                    changes = true;
                }
            }
        }
        pointer += 1;
    }

    if changes {
        cleanup_merge(script);
    }
    cleanup_semantic_lossless(script);

    // overlap elimination between adjacent delete/insert pairs.
    let mut pointer = 1usize;
    while pointer < script.len() {
        if script[pointer - 1].op == Op::Delete && script[pointer].op == Op::Insert {
            let deletion = chars(&script[pointer - 1].text);
            let insertion = chars(&script[pointer].text);
            let overlap1 = common_overlap_chars(&deletion, &insertion);
            let overlap2 = common_overlap_chars(&insertion, &deletion);
            if overlap1 >= overlap2 {
                if overlap1 * 2 >= deletion.len() || overlap1 * 2 >= insertion.len() {
                    let eq_text = from_chars(&insertion[..overlap1]);
                    script[pointer - 1].text = from_chars(&deletion[..deletion.len() - overlap1]);
                    let tail = from_chars(&insertion[overlap1..]);
                    script.insert(pointer, DiffOp::new(Op::Equal, eq_text));
                    script[pointer + 1].text = tail;
                    pointer += 1;
                }
            } else if overlap2 * 2 >= deletion.len() || overlap2 * 2 >= insertion.len() {
                let eq_text = from_chars(&deletion[..overlap2]);
                let new_insert = from_chars(&insertion[..insertion.len() - overlap2]);
                let new_delete = from_chars(&deletion[overlap2..]);
                script[pointer - 1] = DiffOp::new(Op::Insert, new_insert);
                script.insert(pointer, DiffOp::new(Op::Equal, eq_text));
                script[pointer + 1] = DiffOp::new(Op::Delete, new_delete);
                pointer += 1;
            }
        }
        pointer += 1;
    }
}

/// Shifts single edits bounded on both sides by equalities toward the
/// nearest logical boundary using the 0-6 score from spec.md §4.1.4.
pub(super) fn cleanup_semantic_lossless(script: &mut Script) {
    let mut pointer: isize = 1;
    while pointer < script.len() as isize - 1 {
        let p = pointer as usize;
        if script[p - 1].op == Op::Equal && script[p + 1].op == Op::Equal {
            let mut equality1 = chars(&script[p - 1].text);
            let mut edit = chars(&script[p].text);
            let mut equality2 = chars(&script[p + 1].text);

            let common_offset = common_suffix_chars(&equality1, &edit);
            if common_offset != 0 {
                let common: Vec<char> = edit[edit.len() - common_offset..].to_vec();
                equality1.truncate(equality1.len() - common_offset);
                let mut new_edit = common.clone();
                new_edit.extend_from_slice(&edit[..edit.len() - common_offset]);
                edit = new_edit;
                let mut new_eq2 = common;
                new_eq2.extend_from_slice(&equality2);
                equality2 = new_eq2;
            }

            let mut best_equality1 = equality1.clone();
            let mut best_edit = edit.clone();
            let mut best_equality2 = equality2.clone();
            let mut best_score = score(&equality1, &edit) + score(&edit, &equality2);

            while !edit.is_empty() && !equality2.is_empty() && edit[0] == equality2[0] {
                equality1.push(edit[0]);
                edit.remove(0);
                edit.push(equality2[0]);
                equality2.remove(0);
                let s = score(&equality1, &edit) + score(&edit, &equality2);
                if s >= best_score {
                    best_score = s;
                    best_equality1 = equality1.clone();
                    best_edit = edit.clone();
                    best_equality2 = equality2.clone();
                }
            }

            if chars(&script[p - 1].text) != best_equality1 {
                let mut idx = p;
                if !best_equality1.is_empty() {
                    script[idx - 1].text = from_chars(&best_equality1);
                } else {
                    script.remove(idx - 1);
                    idx -= 1;
                    pointer -= 1;
                }
                script[idx].text = from_chars(&best_edit);
                if !best_equality2.is_empty() {
                    script[idx + 1].text = from_chars(&best_equality2);
                } else {
                    script.remove(idx + 1);
                    pointer -= 1;
                }
            }
        }
        pointer += 1;
    }
}

fn score(one: &[char], two: &[char]) -> u8 {
    if one.is_empty() || two.is_empty() {
        return 6;
    }
    let char1 = one[one.len() - 1];
    let char2 = two[0];
    let non_alnum1 = !char1.is_alphanumeric();
    let non_alnum2 = !char2.is_alphanumeric();
    let whitespace1 = non_alnum1 && char1.is_whitespace();
    let whitespace2 = non_alnum2 && char2.is_whitespace();
    let linebreak1 = whitespace1 && (char1 == '\n' || char1 == '\r');
    let linebreak2 = whitespace2 && (char2 == '\n' || char2 == '\r');
    let blank1 = linebreak1 && ends_blank_line(one);
    let blank2 = linebreak2 && starts_blank_line(two);

    if blank1 || blank2 {
        5
    } else if linebreak1 || linebreak2 {
        4
    } else if non_alnum1 && !whitespace1 && whitespace2 {
        3
    } else if whitespace1 || whitespace2 {
        2
    } else if non_alnum1 || non_alnum2 {
        1
    } else {
        0
    }
}

/// `one` ends with `\n\r?\n` (a blank line).
fn ends_blank_line(one: &[char]) -> bool {
    let n = one.len();
    if n >= 2 && one[n - 1] == '\n' && one[n - 2] == '\n' {
        return true;
    }
    n >= 3 && one[n - 1] == '\n' && one[n - 2] == '\r' && one[n - 3] == '\n'
}

/// `two` starts with `\r?\n\r?\n` (a blank line).
fn starts_blank_line(two: &[char]) -> bool {
    let mut i = 0usize;
    if i < two.len() && two[i] == '\r' {
        i += 1;
    }
    if i >= two.len() || two[i] != '\n' {
        return false;
    }
    i += 1;
    if i < two.len() && two[i] == '\r' {
        i += 1;
    }
    i < two.len() && two[i] == '\n'
}

/// Reduces the number of edits for machine-processing efficiency
/// (spec.md §4.1.4): a small equality flanked by edits of both kinds on
/// both sides, or mostly flanked (3 of 4 flags) while below half the
/// threshold, is split the same way `cleanup_semantic` splits equalities.
pub(super) fn cleanup_efficiency(script: &mut Script, edit_cost: u32) {
    let edit_cost = edit_cost as usize;
    let mut changes = false;
    let mut equalities: Vec<usize> = Vec::new();
    let mut last_equality: Option<String> = None;
    let mut pointer: isize = 0;
    let (mut pre_ins, mut pre_del, mut post_ins, mut post_del) = (false, false, false, false);

    while (pointer as usize) < script.len() {
        let p = pointer as usize;
        if script[p].op == Op::Equal {
            if script[p].len() < edit_cost && (post_ins || post_del) {
                equalities.push(p);
                pre_ins = post_ins;
                pre_del = post_del;
                last_equality = Some(script[p].text.clone());
            } else {
                equalities.clear();
                last_equality = None;
            }
            post_ins = false;
            post_del = false;
        } else {
            if script[p].op == Op::Delete {
                post_del = true;
            } else {
                post_ins = true;
            }

            let flags_total = [pre_ins, pre_del, post_ins, post_del]
                .iter()
                .filter(|&&f| f)
                .count();
            let split = last_equality.is_some()
                && ((pre_ins && pre_del && post_ins && post_del)
                    || (last_equality.as_ref().unwrap().chars().count() * 2 < edit_cost
                        && flags_total == 3));

            if split {
                let idx = *equalities.last().unwrap();
                script.insert(idx, DiffOp::new(Op::Delete, last_equality.clone().unwrap()));
                script[idx + 1].op = Op::Insert;
                equalities.pop();
                last_equality = None;
                if pre_ins && pre_del {
                    post_ins = true;
                    post_del = true;
                    equalities.clear();
                } else {
                    equalities.pop();
                    pointer = equalities.last().map_or(-1, |&i| i as isize);
                    post_ins = false;
                    post_del = false;
                }
                changes = true;
                pointer += 1;
                continue;
            }
        }
        pointer += 1;
    }

    if changes {
        cleanup_merge(script);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::Diff;

    #[test]
    fn merge_coalesces_and_removes_empty() {
        let mut script = vec![
            DiffOp::new(Op::Equal, "a"),
            DiffOp::new(Op::Delete, ""),
            DiffOp::new(Op::Insert, "b"),
            DiffOp::new(Op::Insert, "c"),
            DiffOp::new(Op::Equal, "d"),
            DiffOp::new(Op::Equal, "e"),
        ];
        cleanup_merge(&mut script);
        assert_eq!(
            script,
            vec![
                DiffOp::new(Op::Equal, "a"),
                DiffOp::new(Op::Insert, "bc"),
                DiffOp::new(Op::Equal, "de"),
            ]
        );
    }

    #[test]
    fn merge_factors_common_prefix_and_suffix() {
        let mut script = vec![
            DiffOp::new(Op::Equal, "x"),
            DiffOp::new(Op::Delete, "abcxxx"),
            DiffOp::new(Op::Insert, "xxxdef"),
            DiffOp::new(Op::Equal, "y"),
        ];
        cleanup_merge(&mut script);
        assert_eq!(
            script,
            vec![
                DiffOp::new(Op::Equal, "xxxx"),
                DiffOp::new(Op::Delete, "abc"),
                DiffOp::new(Op::Insert, "def"),
                DiffOp::new(Op::Equal, "xxxy"),
            ]
        );
    }

    #[test]
    fn semantic_eliminates_tiny_equality() {
        let mut script = vec![
            DiffOp::new(Op::Delete, "ab"),
            DiffOp::new(Op::Equal, "cd"),
            DiffOp::new(Op::Delete, "e"),
            DiffOp::new(Op::Equal, "f"),
            DiffOp::new(Op::Insert, "g"),
        ];
        cleanup_semantic(&mut script);
        assert_eq!(
            script,
            vec![
                DiffOp::new(Op::Delete, "abcdef"),
                DiffOp::new(Op::Insert, "g"),
            ]
        );
    }

    #[test]
    fn lossless_shifts_to_word_boundary() {
        let mut script = vec![
            DiffOp::new(Op::Equal, "The c"),
            DiffOp::new(Op::Insert, "ow and the c"),
            DiffOp::new(Op::Equal, "at."),
        ];
        cleanup_semantic_lossless(&mut script);
        assert_eq!(
            script,
            vec![
                DiffOp::new(Op::Equal, "The "),
                DiffOp::new(Op::Insert, "cow and the "),
                DiffOp::new(Op::Equal, "cat."),
            ]
        );
    }

    #[test]
    fn literal_scenario_apples_bananas() {
        let engine = Diff {
            timeout: 0.0,
            ..Default::default()
        };
        let mut script =
            engine.main_with_deadline("Apples are a fruit.", "Bananas are also fruit.", false, None);
        cleanup_merge(&mut script);
        assert_eq!(
            script,
            vec![
                DiffOp::new(Op::Delete, "Apple"),
                DiffOp::new(Op::Insert, "Banana"),
                DiffOp::new(Op::Equal, "s are a"),
                DiffOp::new(Op::Insert, "lso"),
                DiffOp::new(Op::Equal, " fruit."),
            ]
        );
    }
}
