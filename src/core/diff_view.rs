use std::fmt::Write as _;

use super::differ::{DiffResult, DiffSegment};

/// Render a diff as fixed-width rows: previous line, current line, marker, text.
pub fn render_diff(diff: &DiffResult) -> String {
    let mut out = String::new();

    for segment in &diff.segments {
        let marker = match segment {
            DiffSegment::Added { .. } => '+',
            DiffSegment::Removed { .. } => '-',
            DiffSegment::Unchanged { .. } => '·',
        };
        let _ = writeln!(
            out,
            "{:>5} {:>5} {} {}",
            line_label(segment.previous_line()),
            line_label(segment.current_line()),
            marker,
            segment.content()
        );
    }

    out.push_str(&render_footer(diff));
    out.push('\n');
    out
}

/// Summary line shown under a rendered diff
pub fn render_footer(diff: &DiffResult) -> String {
    let stats = diff.stats();
    format!(
        "{} additions, {} deletions, {} unchanged lines",
        stats.additions, stats.deletions, stats.unchanged
    )
}

fn line_label(line: Option<usize>) -> String {
    line.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string())
}
