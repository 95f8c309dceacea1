//! Line-level diff between two text blobs.
//!
//! [`compute_line_diff`] aligns the lines of a previous and a current text
//! with a greedy cursor walk and a small fixed look-ahead window. It is not
//! an LCS: long-range moves come out as removals plus additions, but the
//! work per call stays linear in the number of lines.

use serde::{Deserialize, Serialize};

/// Number of lines probed ahead when the cursors stop matching
pub const LOOKAHEAD_WINDOW: usize = 3;

/// One classified line of a comparison.
///
/// Line numbers are 1-based positions in the previous and current texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DiffSegment {
    Added {
        content: String,
        #[serde(rename = "currentLineNumber")]
        current_line: usize,
    },
    Removed {
        content: String,
        #[serde(rename = "previousLineNumber")]
        previous_line: usize,
    },
    Unchanged {
        content: String,
        #[serde(rename = "previousLineNumber")]
        previous_line: usize,
        #[serde(rename = "currentLineNumber")]
        current_line: usize,
    },
}

impl DiffSegment {
    pub fn content(&self) -> &str {
        match self {
            DiffSegment::Added { content, .. }
            | DiffSegment::Removed { content, .. }
            | DiffSegment::Unchanged { content, .. } => content,
        }
    }

    pub fn previous_line(&self) -> Option<usize> {
        match self {
            DiffSegment::Removed { previous_line, .. }
            | DiffSegment::Unchanged { previous_line, .. } => Some(*previous_line),
            DiffSegment::Added { .. } => None,
        }
    }

    pub fn current_line(&self) -> Option<usize> {
        match self {
            DiffSegment::Added { current_line, .. }
            | DiffSegment::Unchanged { current_line, .. } => Some(*current_line),
            DiffSegment::Removed { .. } => None,
        }
    }
}

/// Counts of each segment kind in a [`DiffResult`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub additions: usize,
    pub deletions: usize,
    pub unchanged: usize,
}

/// Ordered segments covering every line of both inputs exactly once
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiffResult {
    pub segments: Vec<DiffSegment>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn has_changes(&self) -> bool {
        self.segments
            .iter()
            .any(|s| !matches!(s, DiffSegment::Unchanged { .. }))
    }

    pub fn stats(&self) -> DiffStats {
        let mut stats = DiffStats::default();
        for segment in &self.segments {
            match segment {
                DiffSegment::Added { .. } => stats.additions += 1,
                DiffSegment::Removed { .. } => stats.deletions += 1,
                DiffSegment::Unchanged { .. } => stats.unchanged += 1,
            }
        }
        stats
    }
}

/// Compare `previous` against `current` line by line.
///
/// Lines are split on `'\n'` only and compared for exact equality. An empty
/// input contributes no lines at all.
pub fn compute_line_diff(previous: &str, current: &str) -> DiffResult {
    let old_lines: Vec<&str> = split_lines(previous);
    let new_lines: Vec<&str> = split_lines(current);

    let mut segments = Vec::with_capacity(old_lines.len().max(new_lines.len()));
    let mut old = 0;
    let mut new = 0;

    while old < old_lines.len() || new < new_lines.len() {
        if old < old_lines.len() && new < new_lines.len() && old_lines[old] == new_lines[new] {
            segments.push(DiffSegment::Unchanged {
                content: old_lines[old].to_string(),
                previous_line: old + 1,
                current_line: new + 1,
            });
            old += 1;
            new += 1;
            continue;
        }

        // Lines dropped from the previous text
        if let Some(skip) = find_resync(&old_lines, old, new_lines.get(new)) {
            for offset in 0..skip {
                segments.push(DiffSegment::Removed {
                    content: old_lines[old + offset].to_string(),
                    previous_line: old + offset + 1,
                });
            }
            old += skip;
            continue;
        }

        // Lines inserted into the current text
        if let Some(skip) = find_resync(&new_lines, new, old_lines.get(old)) {
            for offset in 0..skip {
                segments.push(DiffSegment::Added {
                    content: new_lines[new + offset].to_string(),
                    current_line: new + offset + 1,
                });
            }
            new += skip;
            continue;
        }

        if old < old_lines.len() {
            segments.push(DiffSegment::Removed {
                content: old_lines[old].to_string(),
                previous_line: old + 1,
            });
            old += 1;
        }
        if new < new_lines.len() {
            segments.push(DiffSegment::Added {
                content: new_lines[new].to_string(),
                current_line: new + 1,
            });
            new += 1;
        }
    }

    DiffResult { segments }
}

/// Smallest offset in `1..=LOOKAHEAD_WINDOW` at which `lines` matches `target`.
fn find_resync(lines: &[&str], cursor: usize, target: Option<&&str>) -> Option<usize> {
    let target = target?;
    (1..=LOOKAHEAD_WINDOW)
        .take_while(|offset| cursor + offset < lines.len())
        .find(|offset| lines[cursor + offset] == *target)
}

fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        Vec::new()
    } else {
        text.split('\n').collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn added(content: &str, current_line: usize) -> DiffSegment {
        DiffSegment::Added {
            content: content.to_string(),
            current_line,
        }
    }

    fn removed(content: &str, previous_line: usize) -> DiffSegment {
        DiffSegment::Removed {
            content: content.to_string(),
            previous_line,
        }
    }

    fn unchanged(content: &str, previous_line: usize, current_line: usize) -> DiffSegment {
        DiffSegment::Unchanged {
            content: content.to_string(),
            previous_line,
            current_line,
        }
    }

    /// Every line index of both inputs appears exactly once, in order
    fn assert_covers(previous: &str, current: &str, diff: &DiffResult) {
        let previous_count = split_lines(previous).len();
        let current_count = split_lines(current).len();

        let previous_seen: Vec<usize> = diff.segments.iter().filter_map(|s| s.previous_line()).collect();
        let current_seen: Vec<usize> = diff.segments.iter().filter_map(|s| s.current_line()).collect();

        assert_eq!(previous_seen, (1..=previous_count).collect::<Vec<_>>());
        assert_eq!(current_seen, (1..=current_count).collect::<Vec<_>>());
    }

    #[test]
    fn test_both_empty() {
        assert!(compute_line_diff("", "").is_empty());
    }

    #[test]
    fn test_previous_empty_all_added() {
        let diff = compute_line_diff("", "b\nc");
        assert_eq!(diff.segments, vec![added("b", 1), added("c", 2)]);
    }

    #[test]
    fn test_current_empty_all_removed() {
        let diff = compute_line_diff("a\nb", "");
        assert_eq!(diff.segments, vec![removed("a", 1), removed("b", 2)]);
    }

    #[test]
    fn test_identity() {
        let text = "# Notes\n\n- item one\n- item two\n";
        let diff = compute_line_diff(text, text);

        assert_eq!(diff.len(), text.split('\n').count());
        assert!(!diff.has_changes());
        for (i, segment) in diff.segments.iter().enumerate() {
            assert_eq!(segment.previous_line(), Some(i + 1));
            assert_eq!(segment.current_line(), Some(i + 1));
        }
    }

    #[test]
    fn test_insertion_within_window() {
        let diff = compute_line_diff("a\nb", "a\nx\nb");
        assert_eq!(
            diff.segments,
            vec![unchanged("a", 1, 1), added("x", 2), unchanged("b", 2, 3)]
        );
    }

    #[test]
    fn test_deletion_within_window() {
        let diff = compute_line_diff("a\nx\nb", "a\nb");
        assert_eq!(
            diff.segments,
            vec![unchanged("a", 1, 1), removed("x", 2), unchanged("b", 3, 2)]
        );
    }

    #[test]
    fn test_deletion_at_window_edge() {
        // three dropped lines still resynchronize
        let diff = compute_line_diff("a\n1\n2\n3\nb", "a\nb");
        assert_eq!(
            diff.segments,
            vec![
                unchanged("a", 1, 1),
                removed("1", 2),
                removed("2", 3),
                removed("3", 4),
                unchanged("b", 5, 2),
            ]
        );
    }

    #[test]
    fn test_deletion_beyond_window_degrades_to_replacements() {
        let previous = "a\n1\n2\n3\n4\nb";
        let current = "a\nb";
        let diff = compute_line_diff(previous, current);

        assert_covers(previous, current, &diff);
        assert_eq!(diff.segments[0], unchanged("a", 1, 1));
        // "b" cannot be reached from "1", so the first mismatch is a replace
        assert_eq!(diff.segments[1], removed("1", 2));
        assert_eq!(diff.segments[2], added("b", 2));
        assert_eq!(diff.stats().unchanged, 1);
    }

    #[test]
    fn test_replacement_beyond_window() {
        let previous = "a\nb\nc\nd\ne";
        let current = "a\nZ";
        let diff = compute_line_diff(previous, current);

        assert_covers(previous, current, &diff);
        assert_eq!(diff.segments[0], unchanged("a", 1, 1));
        assert_eq!(
            diff.stats(),
            DiffStats {
                additions: 1,
                deletions: 4,
                unchanged: 1
            }
        );
    }

    #[test]
    fn test_single_line_replace_emits_removed_then_added() {
        let diff = compute_line_diff("old", "new");
        assert_eq!(diff.segments, vec![removed("old", 1), added("new", 1)]);
    }

    #[test]
    fn test_whitespace_and_case_are_significant() {
        let diff = compute_line_diff("Item", "item ");
        assert_eq!(diff.stats().unchanged, 0);
        assert_eq!(diff.stats().additions, 1);
        assert_eq!(diff.stats().deletions, 1);
    }

    #[test]
    fn test_trailing_newline_is_a_line() {
        let diff = compute_line_diff("a", "a\n");
        assert_eq!(diff.segments, vec![unchanged("a", 1, 1), added("", 2)]);
    }

    #[test]
    fn test_deletion_preferred_over_insertion() {
        // both look-aheads would match; the previous side is searched first
        let diff = compute_line_diff("x\na", "a\nx");
        assert_eq!(
            diff.segments,
            vec![removed("x", 1), unchanged("a", 2, 1), added("x", 2)]
        );
    }

    #[test]
    fn test_serialized_shape() {
        let diff = compute_line_diff("a\nb", "a\nc");
        let json = serde_json::to_value(&diff).unwrap();

        assert_eq!(
            json,
            serde_json::json!([
                {"type": "unchanged", "content": "a", "previousLineNumber": 1, "currentLineNumber": 1},
                {"type": "removed", "content": "b", "previousLineNumber": 2},
                {"type": "added", "content": "c", "currentLineNumber": 2}
            ])
        );
    }

    fn line_text() -> impl Strategy<Value = String> {
        // a small alphabet makes repeated lines (and resyncs) likely
        proptest::collection::vec(
            prop_oneof![Just("a"), Just("b"), Just("c"), Just("d"), Just("")],
            0..12,
        )
            .prop_map(|lines| lines.join("\n"))
    }

    proptest! {
        #[test]
        fn prop_covers_both_inputs(previous in line_text(), current in line_text()) {
            let diff = compute_line_diff(&previous, &current);
            assert_covers(&previous, &current, &diff);
        }

        #[test]
        fn prop_deterministic(previous in line_text(), current in line_text()) {
            prop_assert_eq!(
                compute_line_diff(&previous, &current),
                compute_line_diff(&previous, &current)
            );
        }

        #[test]
        fn prop_identity_is_unchanged(text in line_text()) {
            let diff = compute_line_diff(&text, &text);
            prop_assert!(!diff.has_changes());
            prop_assert_eq!(diff.len(), split_lines(&text).len());
        }

        #[test]
        fn prop_unchanged_segments_match(previous in line_text(), current in line_text()) {
            let old: Vec<&str> = split_lines(&previous);
            let new: Vec<&str> = split_lines(&current);
            for segment in compute_line_diff(&previous, &current).segments {
                if let DiffSegment::Unchanged { content, previous_line, current_line } = segment {
                    prop_assert_eq!(old[previous_line - 1], content.as_str());
                    prop_assert_eq!(new[current_line - 1], content.as_str());
                }
            }
        }
    }
}
