//! Context budgeting: estimation, truncation, per-message trimming, and diff
//! reduction.
//!
//! Every strategy here is lossy and deterministic. None of them call a model.
//!
//! 1. **[`budget`]** — [`ContentBudgeter`] estimates tokens (4 chars/token)
//!    and truncates one blob, keeping 60% head on line boundaries and a 30%
//!    raw tail around a fixed marker.
//!
//! 2. **[`trimmer`]** — [`MessageTrimmer`] splits 80% of a small model's
//!    window evenly across the conversation and truncates any text message
//!    over its share.
//!
//! 3. **[`diff`]** — [`DiffSummarizer`] swaps a unified diff for a
//!    files-and-counts summary when the diff is over 3x longer.

pub mod budget;
pub mod diff;
pub mod trimmer;

pub use budget::{
    ContentBudgeter, DEFAULT_CHARS_PER_TOKEN, TRIM_SEPARATOR, TruncationConfig, estimate_tokens,
    truncate,
};
pub use diff::{DiffConfig, DiffStats, DiffSummarizer, HeaderCounting, summarize_diff};
pub use trimmer::{MessageTrimmer, TrimReport, TrimmerConfig};
