//! Session server-status tracking and action-tag helpers.
//!
//! - **[`tracker`]** — [`SessionTracker`], the per-session registry that
//!   decides when the model should be reminded to start a dev server.
//! - **[`actions`]** — stateless `<boltAction>` tag scanning, start-command
//!   extraction, and the reminder text.

pub mod actions;
pub mod tracker;

pub use actions::{ActionKind, extract_start_commands, has_missing_start_command, reminder_text};
pub use tracker::{
    Clock, DEFAULT_START_COMMAND, ManualClock, SessionConfig, SessionStatus, SessionTracker,
    SystemClock,
};
