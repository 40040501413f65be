//! Convenience re-exports for common `promptfit` types.
//!
//! ```ignore
//! use promptfit::prelude::*;
//! ```
//!
//! Pulls in the context object, message and model types, the three
//! budgeting components, and the session tracker. Config sub-structs and
//! diff statistics stay in their modules.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{
    ContentPart, Message, MessageContent, MessageRole, PromptFit, PromptFitConfig,
};

// ── Models ──────────────────────────────────────────────────────────
pub use crate::model::{Classification, ModelClassifier, ModelDescriptor};

// ── Context budgeting ───────────────────────────────────────────────
pub use crate::context::{
    ContentBudgeter, DiffSummarizer, MessageTrimmer, TrimReport, estimate_tokens, summarize_diff,
    truncate,
};

// ── Sessions ────────────────────────────────────────────────────────
pub use crate::session::{
    ActionKind, SessionTracker, extract_start_commands, has_missing_start_command, reminder_text,
};
