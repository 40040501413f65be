//! Per-session dev-server status and the start-command reminder decision.
//!
//! Each session moves between two states: no server, and server active.
//! Recording a start command activates it; a reset (the caller saw the
//! server stop) deactivates it. File and shell activity only refreshes the
//! last-action timestamp. A reminder is due while there was activity in the
//! last 30 seconds and no server is active.
//!
//! The registry is a sharded concurrent map. Every update is a single
//! upsert-then-mutate under the shard lock, so concurrent calls on one
//! session never lose writes, and sessions on different shards don't
//! contend. Construct one [`SessionTracker`] at startup and share it via
//! `Arc`.

use crate::session::actions::{ActionKind, reminder_text};
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

/// Command suggested when a session never recorded one.
pub const DEFAULT_START_COMMAND: &str = "npm run dev";

/// How recent the last action must be for a reminder, in milliseconds.
pub const DEFAULT_ACTIVITY_WINDOW_MS: u64 = 30_000;

/// Source of the current time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. For tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let by = TimeDelta::from_std(by).unwrap_or(TimeDelta::MAX);
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = now.checked_add_signed(by).unwrap_or(*now);
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Server status of one session.
///
/// A fresh status has no server, no command, and a last action at the Unix
/// epoch, i.e. no recent activity.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionStatus {
    pub has_active_server: bool,
    pub last_action_at: DateTime<Utc>,
    pub last_start_command: Option<String>,
}

/// Tracker settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    /// Activity recency window in milliseconds. Default: `30000`.
    pub activity_window_ms: u64,
    /// Command suggested when none was recorded. Default: `"npm run dev"`.
    pub default_start_command: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            activity_window_ms: DEFAULT_ACTIVITY_WINDOW_MS,
            default_start_command: DEFAULT_START_COMMAND.to_string(),
        }
    }
}

/// Registry of session statuses.
///
/// # Example
///
/// ```
/// use promptfit::SessionTracker;
///
/// let tracker = SessionTracker::new();
/// assert!(!tracker.should_suggest_start("s1"));
///
/// tracker.record_action("s1");
/// assert!(tracker.should_suggest_start("s1"));
///
/// tracker.record_start_command("s1", "pnpm dev");
/// assert!(!tracker.should_suggest_start("s1"));
/// assert_eq!(tracker.suggested_start_command("s1"), "pnpm dev");
/// ```
#[derive(Debug)]
pub struct SessionTracker {
    sessions: DashMap<String, SessionStatus>,
    clock: Arc<dyn Clock>,
    activity_window: TimeDelta,
    default_start_command: String,
}

impl SessionTracker {
    /// Tracker on the system clock with default settings.
    pub fn new() -> Self {
        Self::from_config(&SessionConfig::default())
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            clock: Arc::new(SystemClock),
            activity_window: millis(config.activity_window_ms),
            default_start_command: config.default_start_command.clone(),
        }
    }

    /// Use a different time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Override how recent activity must be for a reminder.
    pub fn with_activity_window(mut self, window: Duration) -> Self {
        self.activity_window = TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX);
        self
    }

    /// Override the command suggested when a session never recorded one.
    pub fn with_default_start_command(mut self, command: impl Into<String>) -> Self {
        self.default_start_command = command.into();
        self
    }

    /// A file or shell action ran in `session`.
    ///
    /// The clock is read under the entry lock, so concurrent calls on one
    /// session store timestamps in the order they were taken.
    pub fn record_action(&self, session: &str) {
        let mut status = self.sessions.entry(session.to_string()).or_default();
        status.last_action_at = self.clock.now();
        drop(status);
        debug!(session, "recorded action");
    }

    /// A start command ran in `session`; the server is now active.
    pub fn record_start_command(&self, session: &str, command: impl Into<String>) {
        let command = command.into();
        info!(session, command = %command, "recorded start command");
        let mut status = self.sessions.entry(session.to_string()).or_default();
        status.has_active_server = true;
        status.last_start_command = Some(command);
    }

    /// Record an executed action by tag kind: file and shell actions count
    /// as activity, start actions record `body` as the start command.
    pub fn record_action_kind(&self, session: &str, kind: ActionKind, body: &str) {
        match kind {
            ActionKind::File | ActionKind::Shell => self.record_action(session),
            ActionKind::Start => self.record_start_command(session, body.trim()),
        }
    }

    /// The server in `session` stopped. Keeps the timestamp and command.
    pub fn reset_server_status(&self, session: &str) {
        if let Some(mut status) = self.sessions.get_mut(session) {
            status.has_active_server = false;
            debug!(session, "reset server status");
        }
    }

    /// Whether the model should be reminded to start a server.
    ///
    /// False for unknown sessions. Otherwise true iff the last action is
    /// within the activity window and no server is active.
    pub fn should_suggest_start(&self, session: &str) -> bool {
        self.sessions
            .get(session)
            .is_some_and(|status| self.needs_start(&status))
    }

    /// The session's last start command, or the configured default.
    pub fn suggested_start_command(&self, session: &str) -> String {
        self.sessions
            .get(session)
            .and_then(|status| self.recorded_command(&status))
            .unwrap_or_else(|| self.default_start_command.clone())
    }

    /// Reminder to append before the next turn, if one is due.
    ///
    /// Reads the status once, so the decision and the suggested command
    /// come from the same snapshot.
    pub fn start_reminder(&self, session: &str) -> Option<String> {
        let status = self.sessions.get(session)?;
        if !self.needs_start(&status) {
            return None;
        }
        let command = self
            .recorded_command(&status)
            .unwrap_or_else(|| self.default_start_command.clone());
        drop(status);
        debug!(session, command = %command, "start reminder due");
        Some(reminder_text(&command))
    }

    /// Snapshot of a session's status.
    pub fn status(&self, session: &str) -> Option<SessionStatus> {
        self.sessions.get(session).map(|s| s.value().clone())
    }

    /// Forget a session.
    pub fn remove(&self, session: &str) -> Option<SessionStatus> {
        self.sessions.remove(session).map(|(_, status)| status)
    }

    /// Drop sessions with no action for longer than `max_idle`. Returns how
    /// many were removed.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let Some(cutoff) = TimeDelta::from_std(max_idle)
            .ok()
            .and_then(|idle| self.clock.now().checked_sub_signed(idle))
        else {
            return 0;
        };
        let before = self.sessions.len();
        self.sessions
            .retain(|_, status| status.last_action_at >= cutoff);
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            debug!(removed, "evicted idle sessions");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn needs_start(&self, status: &SessionStatus) -> bool {
        let since = self.clock.now().signed_duration_since(status.last_action_at);
        since < self.activity_window && !status.has_active_server
    }

    fn recorded_command(&self, status: &SessionStatus) -> Option<String> {
        status
            .last_start_command
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn millis(ms: u64) -> TimeDelta {
    i64::try_from(ms)
        .ok()
        .and_then(TimeDelta::try_milliseconds)
        .unwrap_or(TimeDelta::MAX)
}
