//! Unified-diff reduction for small models.
//!
//! Diffs are usually the largest thing inserted into a coding prompt. When a
//! diff is much larger than a terse "which files, how many lines" summary,
//! the summary replaces it. Only two signals are read: `+`/`-` line counts
//! and the file paths on `---`/`+++` header lines. Hunk headers are ignored.
//!
//! Header lines start with `+++`/`---`, so by default they are counted as an
//! addition and a deletion. Callers may depend on that exact text, so the
//! quirk is the default; [`HeaderCounting::ExcludeHeaders`] opts out.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

/// First line of a summarized diff.
pub const DIFF_SUMMARY_HEADER: &str = "[Diff Summary for smaller model]";

/// Last line of a summarized diff.
pub const DIFF_SUMMARY_FOOTER: &str = "[Original diff content trimmed to reduce context usage]";

/// A diff must be this many times longer than its summary to be replaced.
pub const DEFAULT_COMPRESSION_RATIO: usize = 3;

static FILE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:---|\+\+\+) [ab]/(.+)$").expect("diff header regex must be valid")
});

/// How `---`/`+++` file header lines count toward the totals.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HeaderCounting {
    /// Header lines count as one addition and one deletion per file.
    #[default]
    Inclusive,
    /// Header lines are not counted.
    ExcludeHeaders,
}

/// Diff summarizer settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct DiffConfig {
    pub header_counting: HeaderCounting,
    /// Minimum diff-to-summary length ratio for replacement. Default: `3`.
    pub compression_ratio: usize,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            header_counting: HeaderCounting::Inclusive,
            compression_ratio: DEFAULT_COMPRESSION_RATIO,
        }
    }
}

/// Files and line counts extracted from a diff.
///
/// `Display` renders the summary text:
///
/// ```text
/// Modified 2 file(s):
///   - a.ts
///   - b.ts
/// Changes: +2 additions, -1 deletions
/// ```
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct DiffStats {
    /// Distinct paths in order of first appearance.
    pub files: Vec<String>,
    pub additions: usize,
    pub deletions: usize,
}

impl DiffStats {
    /// Scan a diff. Malformed or empty input yields zero files and counts.
    pub fn parse(diff: &str, counting: HeaderCounting) -> Self {
        let mut stats = Self::default();

        for line in diff.split('\n') {
            let is_header = line.starts_with("--- ") || line.starts_with("+++ ");
            let counted = counting == HeaderCounting::Inclusive || !is_header;
            if counted && line.starts_with('+') {
                stats.additions += 1;
            } else if counted && line.starts_with('-') {
                stats.deletions += 1;
            }

            if is_header && let Some(caps) = FILE_HEADER.captures(line) {
                let path = caps[1].trim_end_matches('\r');
                if !stats.files.iter().any(|f| f == path) {
                    stats.files.push(path.to_string());
                }
            }
        }
        stats
    }
}

impl fmt::Display for DiffStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Modified {} file(s):", self.files.len())?;
        for file in &self.files {
            writeln!(f, "  - {file}")?;
        }
        write!(
            f,
            "Changes: +{} additions, -{} deletions",
            self.additions, self.deletions
        )
    }
}

/// Replaces oversized diffs with a framed [`DiffStats`] summary.
#[derive(Debug, Clone, Default)]
pub struct DiffSummarizer {
    config: DiffConfig,
}

impl DiffSummarizer {
    pub fn new(config: DiffConfig) -> Self {
        Self { config }
    }

    /// Summarize `diff` if it is more than `compression_ratio` times longer
    /// than its summary; otherwise return it unchanged.
    pub fn summarize<'a>(&self, diff: &'a str) -> Cow<'a, str> {
        let summary = DiffStats::parse(diff, self.config.header_counting).to_string();
        let threshold = summary.chars().count() * self.config.compression_ratio;
        if diff.chars().count() > threshold {
            Cow::Owned(format!(
                "{DIFF_SUMMARY_HEADER}\n{summary}\n\n{DIFF_SUMMARY_FOOTER}"
            ))
        } else {
            Cow::Borrowed(diff)
        }
    }
}

/// Summarize with default settings.
pub fn summarize_diff(diff: &str) -> Cow<'_, str> {
    DiffSummarizer::default().summarize(diff)
}
