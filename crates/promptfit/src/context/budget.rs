//! Token estimation and budget-preserving truncation of a single text blob.
//!
//! Estimation is a flat characters-per-token ratio, not a tokenizer. Callers
//! treat the result as a heuristic bound.
//!
//! Truncation keeps the head of the text on whole-line boundaries, drops the
//! middle behind a fixed marker, and keeps a raw character suffix of the tail.
//! The tail may start mid-line: recency wins over line structure there.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Default characters per token.
pub const DEFAULT_CHARS_PER_TOKEN: usize = 4;

/// Share of the character budget kept from the start of the text.
pub const DEFAULT_HEAD_FRACTION: f64 = 0.6;

/// Share of the character budget kept from the end of the text.
pub const DEFAULT_TAIL_FRACTION: f64 = 0.3;

/// Marker inserted where content was cut.
pub const TRIM_SEPARATOR: &str = "\n\n[... content trimmed for smaller model ...]\n\n";

/// Ratios used for estimation and truncation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TruncationConfig {
    /// Characters per token. Default: `4`.
    pub chars_per_token: usize,
    /// Fraction of the budget kept from the head. Default: `0.6`.
    pub head_fraction: f64,
    /// Fraction of the budget kept from the tail. Default: `0.3`.
    pub tail_fraction: f64,
}

impl Default for TruncationConfig {
    fn default() -> Self {
        Self {
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
            head_fraction: DEFAULT_HEAD_FRACTION,
            tail_fraction: DEFAULT_TAIL_FRACTION,
        }
    }
}

/// Estimates token cost and truncates text to a character budget.
///
/// Lengths are counted in `char`s, so a cut never lands inside a UTF-8
/// sequence.
///
/// The result of [`truncate`](Self::truncate) is not hard-capped at the
/// budget: when the head fills its share, the separator itself can push the
/// output a little over. The cut never makes text longer than it was.
#[derive(Debug, Clone, Default)]
pub struct ContentBudgeter {
    config: TruncationConfig,
}

impl ContentBudgeter {
    pub fn new(config: TruncationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TruncationConfig {
        &self.config
    }

    /// Characters per token, never zero.
    pub fn chars_per_token(&self) -> usize {
        self.config.chars_per_token.max(1)
    }

    /// Approximate token count: `ceil(chars / chars_per_token)`.
    pub fn estimate_tokens(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token())
    }

    /// Fit `text` into roughly `max_chars` characters.
    ///
    /// Returns the input unchanged when it already fits. Otherwise keeps
    /// whole lines from the start up to the head share, appends
    /// [`TRIM_SEPARATOR`], and, if enough budget is left over, the last
    /// `tail_fraction * max_chars` characters of the original.
    pub fn truncate<'a>(&self, text: &'a str, max_chars: usize) -> Cow<'a, str> {
        let total = text.chars().count();
        if total <= max_chars {
            return Cow::Borrowed(text);
        }

        let keep_start = (max_chars as f64 * self.config.head_fraction).floor() as usize;
        let keep_end = (max_chars as f64 * self.config.tail_fraction).floor() as usize;

        let mut out = String::with_capacity(max_chars.min(text.len()) + TRIM_SEPARATOR.len());
        let mut used = 0;
        for line in text.split('\n') {
            let cost = line.chars().count() + 1;
            if used + cost > keep_start {
                break;
            }
            out.push_str(line);
            out.push('\n');
            used += cost;
        }

        out.push_str(TRIM_SEPARATOR);
        used += TRIM_SEPARATOR.chars().count();

        let remaining = max_chars.saturating_sub(used);
        if remaining > keep_end {
            out.push_str(char_suffix(text, keep_end.min(remaining)));
        }
        Cow::Owned(out)
    }
}

/// Estimate tokens with the default ratio.
pub fn estimate_tokens(text: &str) -> usize {
    ContentBudgeter::default().estimate_tokens(text)
}

/// Truncate with the default ratios.
pub fn truncate(text: &str, max_chars: usize) -> Cow<'_, str> {
    ContentBudgeter::default().truncate(text, max_chars)
}

/// The last `n` characters of `text`.
fn char_suffix(text: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    let skip = text.chars().count().saturating_sub(n);
    match text.char_indices().nth(skip) {
        Some((idx, _)) => text.split_at(idx).1,
        None => "",
    }
}
