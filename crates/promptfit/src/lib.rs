//! Prompt budgeting for language models of widely varying capacity.
//!
//! `promptfit` decides how much of a conversation a model can take and cuts
//! the rest. It is the piece of a coding assistant that sits between the
//! conversation store and the request pipeline:
//!
//! 1. **[`model`]** — [`ModelClassifier`] judges whether a model is "small"
//!    from its identifier (a data table of name patterns) and any declared
//!    capacity, and picks the context window to assume.
//! 2. **[`context`]** — token estimation and line-preserving truncation
//!    ([`ContentBudgeter`]), per-message budget sharing ([`MessageTrimmer`]),
//!    and unified-diff reduction ([`DiffSummarizer`]).
//! 3. **[`session`]** — [`SessionTracker`] records file/shell activity and
//!    executed start commands per session, and builds the reminder that asks
//!    the model to start a dev server when it forgot to.
//!
//! All of these are bundled in [`PromptFit`], an explicitly constructed
//! context object. Build one at startup, share the session registry through
//! it, and hand it to whatever needs to shape prompts.
//!
//! # Example
//!
//! ```
//! use promptfit::{Message, ModelDescriptor, PromptFit};
//!
//! let fit = PromptFit::new();
//! let model = ModelDescriptor::new("llama-3.1-8b-instruct");
//! assert!(fit.classifier().is_small(&model));
//!
//! let messages = vec![
//!     Message::system("You are a coding assistant."),
//!     Message::user("x\n".repeat(20_000)),
//! ];
//! let trimmed = fit.prepare_messages(&messages, &model);
//! assert!(trimmed[1].text().unwrap().len() < 40_000);
//!
//! fit.sessions().record_action("chat-1");
//! assert!(fit.turn_reminder("chat-1").is_some());
//! ```
//!
//! # Where to find things
//!
//! - **Decide how to prompt a model:** [`ModelClassifier::classify`] returns
//!   the smallness decision, the reason, and the assumed window.
//! - **Shrink text:** [`context::budget::estimate_tokens`] and
//!   [`context::budget::truncate`] for single blobs,
//!   [`MessageTrimmer::trim_for_model`] for whole conversations.
//! - **Shrink diffs:** [`context::diff::summarize_diff`].
//! - **Track start commands:** [`SessionTracker`] plus the tag helpers in
//!   [`session::actions`].
//! - **Tune constants:** [`PromptFitConfig`], loadable from JSON.

pub mod config;
pub mod context;
pub mod model;
pub mod prelude;
pub mod session;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

pub use config::{ConfigError, PromptFitConfig};
pub use context::{ContentBudgeter, DiffSummarizer, MessageTrimmer, TrimReport};
pub use model::{Classification, ModelClassifier, ModelDescriptor};
pub use session::{ActionKind, SessionStatus, SessionTracker};

// ── Message types ──────────────────────────────────────────────────

/// Message role.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

/// Image reference inside structured content.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ImageUrl {
    pub url: String,
}

/// One part of a structured (multi-part) message body.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

/// Message body: either plain text or a list of typed parts.
///
/// Only [`MessageContent::Text`] is ever trimmed. Structured bodies are
/// passed through untouched.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: MessageRole,
    pub content: MessageContent,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Build a message with a structured body.
    pub fn with_parts(role: MessageRole, parts: Vec<ContentPart>) -> Self {
        Self {
            role,
            content: MessageContent::Parts(parts),
        }
    }

    /// The plain-text body, if this message has one.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(text) => Some(text),
            MessageContent::Parts(_) => None,
        }
    }
}

// ── Context object ─────────────────────────────────────────────────

/// Everything needed to fit prompts to a model, built once and shared.
///
/// Cloning is cheap: the classifier and the session registry are behind
/// `Arc`, so clones observe the same session state. Tests that need isolated
/// state build separate instances or inject their own tracker with
/// [`with_sessions`](Self::with_sessions).
#[derive(Debug, Clone)]
pub struct PromptFit {
    classifier: Arc<ModelClassifier>,
    trimmer: MessageTrimmer,
    diff: DiffSummarizer,
    sessions: Arc<SessionTracker>,
}

impl PromptFit {
    /// Build with default configuration.
    pub fn new() -> Self {
        let classifier = Arc::new(ModelClassifier::new());
        Self {
            trimmer: MessageTrimmer::new(Arc::clone(&classifier)),
            classifier,
            diff: DiffSummarizer::default(),
            sessions: Arc::new(SessionTracker::new()),
        }
    }

    /// Build from a loaded configuration.
    ///
    /// Fails only when a configured model pattern does not compile.
    pub fn from_config(config: &PromptFitConfig) -> Result<Self, ConfigError> {
        let classifier = Arc::new(ModelClassifier::from_config(&config.classifier)?);
        let trimmer = MessageTrimmer::new(Arc::clone(&classifier))
            .with_budgeter(ContentBudgeter::new(config.truncation.clone()))
            .with_history_share(config.trimmer.history_share);
        debug!(
            rules = classifier.rules().len(),
            history_share = config.trimmer.history_share,
            "promptfit configured"
        );
        Ok(Self {
            classifier,
            trimmer,
            diff: DiffSummarizer::new(config.diff.clone()),
            sessions: Arc::new(SessionTracker::from_config(&config.session)),
        })
    }

    /// Share an existing session registry instead of the one built here.
    pub fn with_sessions(mut self, sessions: Arc<SessionTracker>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn classifier(&self) -> &ModelClassifier {
        &self.classifier
    }

    pub fn trimmer(&self) -> &MessageTrimmer {
        &self.trimmer
    }

    pub fn diff_summarizer(&self) -> &DiffSummarizer {
        &self.diff
    }

    /// The shared session registry.
    pub fn sessions(&self) -> &Arc<SessionTracker> {
        &self.sessions
    }

    /// Trim a conversation for `model`. A no-op copy for large models.
    pub fn prepare_messages(&self, messages: &[Message], model: &ModelDescriptor) -> Vec<Message> {
        self.trimmer.trim_for_model(messages, model)
    }

    /// Reduce a diff to its summary when that saves enough context.
    pub fn summarize_diff(&self, diff: &str) -> String {
        self.diff.summarize(diff).into_owned()
    }

    /// Reminder to append before the next model turn for `session`, if any.
    pub fn turn_reminder(&self, session: &str) -> Option<String> {
        self.sessions.start_reminder(session)
    }
}

impl Default for PromptFit {
    fn default() -> Self {
        Self::new()
    }
}
