//! File analysis boundary: turn one source file into a partial [`Stats`].
//!
//! The pipeline never inspects file contents itself; it hands each file to an
//! [`Analyzer`] and folds whatever comes back. Implementations must be total:
//! unreadable or malformed content yields the identity statistic, never an
//! error, so one broken file cannot stall the crawl.

use std::path::Path;

use regex::Regex;
use tracing::debug;

use joincensus_shared::Stats;

/// Inspects one file and reports its contribution to the census.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, file: &Path) -> Stats;
}

/// Counts the separator string literals passed to `.join("…")` call sites.
pub struct SeparatorAnalyzer {
    pattern: Regex,
}

impl SeparatorAnalyzer {
    pub fn new() -> Self {
        // First argument must be a string literal; computed separators are
        // out of census scope.
        let pattern = Regex::new(r#"\.join\(\s*"((?:\\.|[^"\\])*)""#).expect("static pattern");
        Self { pattern }
    }
}

impl Default for SeparatorAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for SeparatorAnalyzer {
    fn analyze(&self, file: &Path) -> Stats {
        let mut stats = Stats::default();

        let raw = match std::fs::read(file) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(file = %file.display(), error = %e, "unreadable file");
                stats.unreadable_files = 1;
                return stats;
            }
        };
        stats.files_scanned = 1;

        let text = String::from_utf8_lossy(&raw);
        for capture in self.pattern.captures_iter(&text) {
            stats.record(unescape(&capture[1]));
        }

        stats
    }
}

/// Resolve the standard escapes inside a matched string literal. Unknown
/// escape sequences are kept verbatim.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    fn temp_file(tag: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "joincensus-analyze-{tag}-{}.rs",
            uuid::Uuid::now_v7()
        ));
        std::fs::write(&path, content).expect("write sample file");
        path
    }

    #[test]
    fn counts_join_separator_literals() {
        let file = temp_file(
            "basic",
            r#"
fn render(parts: &[String]) -> String {
    let csv = parts.join(", ");
    let lines = parts.join("\n");
    let more = parts.join(", ");
    format!("{csv}{lines}{more}")
}
"#,
        );

        let analyzer = SeparatorAnalyzer::new();
        let stats = analyzer.analyze(&file);

        assert_eq!(stats.files_scanned, 1);
        assert_eq!(stats.separators[", "], 2);
        assert_eq!(stats.separators["\n"], 1);
        assert_eq!(stats.total(), 3);

        let _ = std::fs::remove_file(&file);
    }

    #[test]
    fn ignores_computed_separators() {
        let file = temp_file(
            "computed",
            r#"
fn render(parts: &[String], sep: &str) -> String {
    parts.join(sep)
}
"#,
        );

        let stats = SeparatorAnalyzer::new().analyze(&file);

        assert_eq!(stats.files_scanned, 1);
        assert_eq!(stats.total(), 0);

        let _ = std::fs::remove_file(&file);
    }

    #[test]
    fn empty_separator_is_a_category() {
        let file = temp_file("empty", r#"let s = parts.join("");"#);

        let stats = SeparatorAnalyzer::new().analyze(&file);

        assert_eq!(stats.separators[""], 1);

        let _ = std::fs::remove_file(&file);
    }

    #[test]
    fn missing_file_yields_identity_with_unreadable_tally() {
        let ghost = std::env::temp_dir().join(format!(
            "joincensus-analyze-ghost-{}.rs",
            uuid::Uuid::now_v7()
        ));

        let stats = SeparatorAnalyzer::new().analyze(&ghost);

        assert_eq!(stats.files_scanned, 0);
        assert_eq!(stats.unreadable_files, 1);
        assert_eq!(stats.total(), 0);
    }

    #[test]
    fn unescape_resolves_standard_escapes() {
        assert_eq!(unescape(r"\n"), "\n");
        assert_eq!(unescape(r"\r\n"), "\r\n");
        assert_eq!(unescape(r"\t"), "\t");
        assert_eq!(unescape(r#"\""#), "\"");
        assert_eq!(unescape(r"\\"), "\\");
        assert_eq!(unescape(r"a\qb"), "a\\qb");
        assert_eq!(unescape(", "), ", ");
    }
}
