//! Per-message trimming for small models.
//!
//! The assumed context window is split evenly across the messages after
//! setting aside a share for the system prompt the request pipeline adds
//! later. Any plain-text message whose estimate exceeds its share is cut
//! down with [`ContentBudgeter::truncate`]. Large models pass through.

use crate::context::budget::ContentBudgeter;
use crate::model::{ModelClassifier, ModelDescriptor};
use crate::{Message, MessageContent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Share of the context window given to conversation messages. The rest is
/// headroom for the system prompt.
pub const DEFAULT_HISTORY_SHARE: f64 = 0.8;

/// Trimmer settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TrimmerConfig {
    /// Fraction of the window shared across messages. Default: `0.8`.
    pub history_share: f64,
}

impl Default for TrimmerConfig {
    fn default() -> Self {
        Self {
            history_share: DEFAULT_HISTORY_SHARE,
        }
    }
}

/// What a trimming pass decided.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct TrimReport {
    /// Whether the model was classified small. Nothing is trimmed otherwise.
    pub small_model: bool,
    /// Context window assumed for the model, in tokens.
    pub context_window: usize,
    /// Token share per message (zero when no trimming applied).
    pub per_message_tokens: usize,
    /// Character budget per message (zero when no trimming applied).
    pub per_message_chars: usize,
    /// Number of messages whose content was cut.
    pub trimmed: usize,
}

/// Applies a [`ContentBudgeter`] across a conversation.
///
/// Never mutates its input: the trimmed conversation is a new `Vec`.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use promptfit::{Message, MessageTrimmer, ModelClassifier};
///
/// let trimmer = MessageTrimmer::new(Arc::new(ModelClassifier::new()));
/// assert!(trimmer.trim_for_model(&[], &"any-7b".into()).is_empty());
///
/// let long = vec![Message::user("word ".repeat(10_000))];
/// let out = trimmer.trim_for_model(&long, &"phi-2".into());
/// assert!(out[0].text().unwrap().len() < 50_000);
/// ```
#[derive(Debug, Clone)]
pub struct MessageTrimmer {
    classifier: Arc<ModelClassifier>,
    budgeter: ContentBudgeter,
    history_share: f64,
}

impl MessageTrimmer {
    pub fn new(classifier: Arc<ModelClassifier>) -> Self {
        Self {
            classifier,
            budgeter: ContentBudgeter::default(),
            history_share: DEFAULT_HISTORY_SHARE,
        }
    }

    /// Use a differently configured budgeter.
    pub fn with_budgeter(mut self, budgeter: ContentBudgeter) -> Self {
        self.budgeter = budgeter;
        self
    }

    /// Override the share of the window given to messages.
    pub fn with_history_share(mut self, share: f64) -> Self {
        self.history_share = share;
        self
    }

    pub fn budgeter(&self) -> &ContentBudgeter {
        &self.budgeter
    }

    /// Trim `messages` to fit `model`. Returns a copy unchanged for models
    /// that are not small, and an empty list for an empty conversation.
    pub fn trim_for_model(&self, messages: &[Message], model: &ModelDescriptor) -> Vec<Message> {
        self.trim_with_report(messages, model).0
    }

    /// Like [`trim_for_model`](Self::trim_for_model), also reporting the
    /// budgets used and how many messages were cut.
    pub fn trim_with_report(
        &self,
        messages: &[Message],
        model: &ModelDescriptor,
    ) -> (Vec<Message>, TrimReport) {
        let classification = self.classifier.classify(model);
        let mut report = TrimReport {
            small_model: classification.small,
            context_window: classification.context_window,
            ..TrimReport::default()
        };

        if !classification.small || messages.is_empty() {
            return (messages.to_vec(), report);
        }

        let share = classification.context_window as f64 * self.history_share;
        let per_message_tokens = (share / messages.len() as f64).floor() as usize;
        let per_message_chars =
            per_message_tokens.saturating_mul(self.budgeter.chars_per_token());
        report.per_message_tokens = per_message_tokens;
        report.per_message_chars = per_message_chars;

        let trimmed = messages
            .iter()
            .enumerate()
            .map(|(index, message)| {
                let MessageContent::Text(text) = &message.content else {
                    return message.clone();
                };
                let estimated = self.budgeter.estimate_tokens(text);
                if estimated <= per_message_tokens {
                    return message.clone();
                }
                let cut = self.budgeter.truncate(text, per_message_chars).into_owned();
                debug!(
                    model = %model.id,
                    index,
                    role = %message.role,
                    estimated_tokens = estimated,
                    budget_tokens = per_message_tokens,
                    before_chars = text.chars().count(),
                    after_chars = cut.chars().count(),
                    "trimmed message for small model"
                );
                report.trimmed += 1;
                Message {
                    role: message.role,
                    content: MessageContent::Text(cut),
                }
            })
            .collect();

        (trimmed, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::budget::TRIM_SEPARATOR;
    use crate::{ContentPart, MessageRole};

    fn trimmer() -> MessageTrimmer {
        MessageTrimmer::new(Arc::new(ModelClassifier::new()))
    }

    #[test]
    fn empty_conversation_is_empty() {
        let (out, report) = trimmer().trim_with_report(&[], &"any-7b".into());
        assert!(out.is_empty());
        assert!(report.small_model);
        assert_eq!(report.trimmed, 0);
    }

    #[test]
    fn large_model_is_untouched() {
        let messages = vec![Message::user("a".repeat(200_000))];
        let (out, report) = trimmer().trim_with_report(&messages, &"gpt-4".into());
        assert_eq!(out, messages);
        assert!(!report.small_model);
        assert_eq!(report.context_window, 8000);
    }

    #[test]
    fn budgets_split_window_across_messages() {
        let messages = vec![Message::system("sys"), Message::user("hi")];
        let (_, report) = trimmer().trim_with_report(&messages, &"llama-7b".into());
        // floor(4096 * 0.8 / 2) = 1638 tokens, 6552 chars.
        assert_eq!(report.per_message_tokens, 1638);
        assert_eq!(report.per_message_chars, 6552);
        assert_eq!(report.trimmed, 0);
    }

    #[test]
    fn only_oversized_text_is_trimmed() {
        let big = "line of text\n".repeat(2000);
        let messages = vec![
            Message::system("You are helpful."),
            Message::user(big.clone()),
            Message::assistant("ok"),
        ];
        let (out, report) = trimmer().trim_with_report(&messages, &"phi-2".into());

        assert_eq!(report.trimmed, 1);
        assert_eq!(out[0], messages[0]);
        assert_eq!(out[2], messages[2]);
        let cut = out[1].text().unwrap();
        assert!(cut.contains(TRIM_SEPARATOR));
        assert!(cut.len() < big.len());
        assert_eq!(out[1].role, MessageRole::User);
    }

    #[test]
    fn structured_content_passes_through() {
        let parts = vec![ContentPart::Text {
            text: "z".repeat(100_000),
        }];
        let messages = vec![Message::with_parts(MessageRole::User, parts)];
        let (out, report) = trimmer().trim_with_report(&messages, &"phi-2".into());
        assert_eq!(out, messages);
        assert_eq!(report.trimmed, 0);
    }

    #[test]
    fn declared_window_drives_budget() {
        let model = ModelDescriptor::new("edge-model").with_declared_max_tokens(1000);
        let messages = vec![Message::user("b".repeat(5000))];
        let (out, report) = trimmer().trim_with_report(&messages, &model);
        // floor(1000 * 0.8) = 800 tokens, 3200 chars.
        assert_eq!(report.per_message_chars, 3200);
        assert_eq!(report.trimmed, 1);
        assert!(out[0].text().unwrap().chars().count() <= 3200);
    }

    #[test]
    fn input_is_not_mutated() {
        let messages = vec![Message::user("c".repeat(50_000))];
        let before = messages.clone();
        let _ = trimmer().trim_for_model(&messages, &"phi-2".into());
        assert_eq!(messages, before);
    }

    #[test]
    fn history_share_is_configurable() {
        let t = trimmer().with_history_share(0.5);
        let (_, report) = t.trim_with_report(&[Message::user("x")], &"phi-2".into());
        assert_eq!(report.per_message_tokens, 2048);
    }

    #[test]
    fn huge_declared_capacity_saturates_budget() {
        let model = ModelDescriptor::new("llama-7b").with_declared_max_tokens(usize::MAX);
        let messages = vec![Message::user("hello")];
        let (out, report) = trimmer().trim_with_report(&messages, &model);
        assert!(report.small_model);
        assert_eq!(report.per_message_chars, usize::MAX);
        assert_eq!(report.trimmed, 0);
        assert_eq!(out, messages);
    }
}
