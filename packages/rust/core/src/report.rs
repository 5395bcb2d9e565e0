//! Rendering of the aggregate census report.

use std::fmt::Write;

use joincensus_shared::Stats;

/// Render the tally as plain text: a `Total:` line followed by the top
/// `top_n` separators, count-descending.
pub fn render(stats: &Stats, top_n: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total: {}", stats.total());
    for (separator, count) in sorted_rows(stats).into_iter().take(top_n) {
        let _ = writeln!(out, "'{}'\t{count}", escape(separator));
    }
    out
}

/// Render the tally as a Markdown table.
pub fn render_markdown(stats: &Stats, top_n: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "| separator | count |");
    let _ = writeln!(out, "|---|---|");
    let _ = writeln!(out, "| total | {} |", stats.total());
    for (separator, count) in sorted_rows(stats).into_iter().take(top_n) {
        let _ = writeln!(out, "| \"{}\" | {count} |", escape(separator));
    }
    out
}

/// Rows sorted by count descending; ties break on the separator itself so
/// the report is deterministic.
fn sorted_rows(stats: &Stats) -> Vec<(&str, u64)> {
    let mut rows: Vec<(&str, u64)> = stats
        .separators
        .iter()
        .map(|(separator, count)| (separator.as_str(), *count))
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    rows
}

/// Make control characters visible in report rows.
fn escape(separator: &str) -> String {
    separator
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Stats {
        let mut stats = Stats::default();
        for _ in 0..5 {
            stats.record(", ");
        }
        for _ in 0..3 {
            stats.record("\n");
        }
        stats.record(" ");
        stats.files_scanned = 4;
        stats
    }

    #[test]
    fn render_sorts_by_count_descending_with_total() {
        let text = render(&sample(), 10);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Total: 9");
        assert_eq!(lines[1], "', '\t5");
        assert_eq!(lines[2], "'\\n'\t3");
        assert_eq!(lines[3], "' '\t1");
    }

    #[test]
    fn render_truncates_to_top_n() {
        let text = render(&sample(), 1);
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn render_markdown_table_shape() {
        let text = render_markdown(&sample(), 2);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "| separator | count |");
        assert_eq!(lines[1], "|---|---|");
        assert_eq!(lines[2], "| total | 9 |");
        assert_eq!(lines[3], "| \", \" | 5 |");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn ties_break_deterministically() {
        let mut stats = Stats::default();
        stats.record("b");
        stats.record("a");
        let text = render(&stats, 10);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "'a'\t1");
        assert_eq!(lines[2], "'b'\t1");
    }

    #[test]
    fn empty_tally_renders_total_only() {
        let text = render(&Stats::default(), 10);
        assert_eq!(text, "Total: 0\n");
    }
}
