//! Small-model detection from name patterns and declared capacity.
//!
//! Provider model ids are free-form (`"meta-llama/llama-3.1-8b-instruct"`,
//! `"qwen2.5-coder:1.5b"`, `"gpt-4o-mini"`), so detection is heuristic. The
//! rules live in one table of `(kind, label, pattern)` rows. A model is small
//! if any row matches or the caller declares a capacity below the threshold.
//! Unknown models are never small: over-trimming a large model is worse than
//! under-trimming a small one.

use crate::config::ConfigError;
use crate::model::ModelDescriptor;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::trace;

/// Declared capacities below this many tokens mark a model as small.
pub const SMALL_CONTEXT_THRESHOLD: usize = 8000;

/// Window assumed for a small model with no declared capacity.
pub const SMALL_CONTEXT_WINDOW: usize = 4096;

/// Window assumed for every other model with no declared capacity.
pub const DEFAULT_CONTEXT_WINDOW: usize = 8000;

/// What a rule row recognizes.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// A whole-word parameter count of 13B or less (`7b`, `13b`, `1.5b`).
    ParameterSize,
    /// A bare size-class word (`mini`, `tiny`, ...).
    SizeClass,
    /// A known family released in small sizes (`phi-2`, `mistral-7b`, ...).
    Family,
    /// A pattern supplied through configuration.
    Custom,
}

// The parameter-size row cannot use a leading `\b`: `.` is a word boundary,
// so `13.9b` would match on its `9b`.
//
// Family rows require the count to stand alone: not glued to a preceding
// digit or dot, and not followed by another letter or digit. That keeps
// `llama-70b` and `qwen2.5-72b` out while `llama3.2-1b` and `mistral7b` match.
const BUILTIN_RULES: &[(RuleKind, &str, &str)] = &[
    (
        RuleKind::ParameterSize,
        "<=13b",
        r"(?:^|[^0-9a-z_.])(?:(?:0|[1-9]|1[0-2])(?:\.[0-9]+)?|13(?:\.0+)?)b\b",
    ),
    (RuleKind::SizeClass, "small", r"\bsmall\b"),
    (RuleKind::SizeClass, "mini", r"\bmini\b"),
    (RuleKind::SizeClass, "tiny", r"\btiny\b"),
    (RuleKind::SizeClass, "light", r"\blight\b"),
    (
        RuleKind::Family,
        "codellama",
        r"codellama(?:.*[^0-9.])?7b(?:[^a-z0-9]|$)",
    ),
    (
        RuleKind::Family,
        "llama",
        r"llama(?:.*[^0-9.])?[1-9](?:\.[0-9]+)?b(?:[^a-z0-9]|$)",
    ),
    (
        RuleKind::Family,
        "mistral",
        r"mistral(?:.*[^0-9.])?7b(?:[^a-z0-9]|$)",
    ),
    (RuleKind::Family, "phi", r"phi-[1-3](?:[^0-9]|$)"),
    (
        RuleKind::Family,
        "gemma",
        r"gemma(?:.*[^0-9.])?[1-9]b(?:[^a-z0-9]|$)",
    ),
    (
        RuleKind::Family,
        "qwen",
        r"qwen(?:.*[^0-9.])?[1-9](?:\.[0-9]+)?b(?:[^a-z0-9]|$)",
    ),
    (
        RuleKind::Family,
        "yi",
        r"\byi(?:.*[^0-9.])?[1-9](?:\.[0-9]+)?b(?:[^a-z0-9]|$)",
    ),
];

static BUILTIN: LazyLock<Vec<SizeRule>> = LazyLock::new(|| {
    BUILTIN_RULES
        .iter()
        .map(|&(kind, label, pattern)| {
            SizeRule::new(kind, label, pattern).expect("built-in model pattern must be valid")
        })
        .collect()
});

/// One row of the classification table.
#[derive(Debug, Clone)]
pub struct SizeRule {
    kind: RuleKind,
    label: String,
    pattern: Regex,
}

impl SizeRule {
    /// Compile a rule. Patterns always match case-insensitively.
    pub fn new(
        kind: RuleKind,
        label: impl Into<String>,
        pattern: &str,
    ) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self {
            kind,
            label: label.into(),
            pattern,
        })
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn matches(&self, model_id: &str) -> bool {
        self.pattern.is_match(model_id)
    }
}

/// Why a model was judged small.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SmallReason {
    /// A name rule matched.
    Rule { kind: RuleKind, label: String },
    /// The declared capacity is under the threshold.
    DeclaredCapacity { max_tokens: usize },
}

/// Result of classifying one model.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    pub small: bool,
    /// Context window to assume, in tokens.
    pub context_window: usize,
    /// Present iff `small`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SmallReason>,
}

/// Classifier thresholds and extra patterns.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Declared capacities below this are small. Default: `8000`.
    pub small_context_threshold: usize,
    /// Window for undeclared small models. Default: `4096`.
    pub small_context_window: usize,
    /// Window for undeclared other models. Default: `8000`.
    pub default_context_window: usize,
    /// Extra regexes (case-insensitive) that mark a model id as small.
    pub extra_small_patterns: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            small_context_threshold: SMALL_CONTEXT_THRESHOLD,
            small_context_window: SMALL_CONTEXT_WINDOW,
            default_context_window: DEFAULT_CONTEXT_WINDOW,
            extra_small_patterns: Vec::new(),
        }
    }
}

/// Decides whether a model is small and how large its window is.
///
/// Pure: the answer depends only on the descriptor passed in. Safe to share
/// across threads.
///
/// # Example
///
/// ```
/// use promptfit::{ModelClassifier, ModelDescriptor};
///
/// let classifier = ModelClassifier::new();
/// assert!(classifier.is_small(&"phi-2".into()));
/// assert!(!classifier.is_small(&"claude-3-opus".into()));
///
/// let declared = ModelDescriptor::new("tiny-model").with_declared_max_tokens(2000);
/// assert_eq!(classifier.context_window(&declared), 2000);
/// ```
#[derive(Debug, Clone)]
pub struct ModelClassifier {
    rules: Vec<SizeRule>,
    small_context_threshold: usize,
    small_context_window: usize,
    default_context_window: usize,
}

impl ModelClassifier {
    /// Classifier with the built-in rule table and default thresholds.
    pub fn new() -> Self {
        Self {
            rules: BUILTIN.clone(),
            small_context_threshold: SMALL_CONTEXT_THRESHOLD,
            small_context_window: SMALL_CONTEXT_WINDOW,
            default_context_window: DEFAULT_CONTEXT_WINDOW,
        }
    }

    /// Built-in table extended by the configured patterns.
    ///
    /// Configured patterns are compiled here, so a bad pattern is reported
    /// once at startup rather than on every call.
    pub fn from_config(config: &ClassifierConfig) -> Result<Self, ConfigError> {
        let mut classifier = Self::new();
        classifier.small_context_threshold = config.small_context_threshold;
        classifier.small_context_window = config.small_context_window;
        classifier.default_context_window = config.default_context_window;

        for pattern in &config.extra_small_patterns {
            let rule = SizeRule::new(RuleKind::Custom, pattern.as_str(), pattern).map_err(
                |source| ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                },
            )?;
            classifier.rules.push(rule);
        }
        Ok(classifier)
    }

    /// Append a rule row (builder pattern).
    pub fn with_rule(mut self, rule: SizeRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[SizeRule] {
        &self.rules
    }

    /// Classify a model, reporting the first rule that matched.
    pub fn classify(&self, model: &ModelDescriptor) -> Classification {
        let reason = self.small_reason(model);
        let small = reason.is_some();
        let context_window = model.declared_capacity().unwrap_or(if small {
            self.small_context_window
        } else {
            self.default_context_window
        });
        trace!(model = %model.id, small, context_window, "classified model");
        Classification {
            small,
            context_window,
            reason,
        }
    }

    /// Whether the model should be treated as having a constrained window.
    pub fn is_small(&self, model: &ModelDescriptor) -> bool {
        self.small_reason(model).is_some()
    }

    /// Context window (tokens): declared capacity if any, else 4096 for
    /// small models and 8000 otherwise.
    pub fn context_window(&self, model: &ModelDescriptor) -> usize {
        self.classify(model).context_window
    }

    /// Whether to use the short, simplified system prompt. Same decision as
    /// [`is_small`](Self::is_small).
    pub fn use_simplified_prompt(&self, model: &ModelDescriptor) -> bool {
        self.is_small(model)
    }

    fn small_reason(&self, model: &ModelDescriptor) -> Option<SmallReason> {
        if let Some(rule) = self.rules.iter().find(|r| r.matches(&model.id)) {
            return Some(SmallReason::Rule {
                kind: rule.kind,
                label: rule.label.clone(),
            });
        }
        model
            .declared_capacity()
            .filter(|&tokens| tokens < self.small_context_threshold)
            .map(|max_tokens| SmallReason::DeclaredCapacity { max_tokens })
    }
}

impl Default for ModelClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_label(classifier: &ModelClassifier, id: &str) -> Option<String> {
        match classifier.classify(&id.into()).reason {
            Some(SmallReason::Rule { label, .. }) => Some(label),
            _ => None,
        }
    }

    #[test]
    fn small_models_by_name() {
        let c = ModelClassifier::new();
        let cases = [
            "llama-7b",
            "phi-2",
            "mistral-7b-instruct",
            "Meta-Llama-3.1-8B-Instruct",
            "qwen2.5-coder:1.5b",
            "qwen2.5-0.5b",
            "gemma-2-9b-it",
            "codellama-13b",
            "yi-1.5-9b-chat",
            "gpt-4o-mini",
            "tinyllama tiny",
            "phi-3-mini-4k",
            "deepseek-coder-6.7b",
        ];
        for id in cases {
            assert!(c.is_small(&id.into()), "{id} should be small");
        }
    }

    #[test]
    fn large_models_by_name() {
        let c = ModelClassifier::new();
        let cases = [
            "gpt-4",
            "claude-3-opus",
            "claude-3-5-sonnet",
            "llama-3-70b-instruct",
            "qwen2.5-72b",
            "gemma-2-27b",
            "gemini-1.5-pro",
            "mixtral-8x22b",
            "deepseek-coder-33b",
            "lightning-large",
        ];
        for id in cases {
            assert!(!c.is_small(&id.into()), "{id} should not be small");
        }
    }

    #[test]
    fn family_rows_catch_glued_counts() {
        let c = ModelClassifier::new();
        // No word boundary before the count, so only the family rows apply.
        assert_eq!(rule_label(&c, "mistral7b"), Some("mistral".into()));
        assert_eq!(rule_label(&c, "codellama7b"), Some("codellama".into()));
        assert_eq!(rule_label(&c, "llama2-chat"), None);
    }

    #[test]
    fn parameter_size_stops_at_thirteen() {
        let c = ModelClassifier::new();
        for id in ["acme-13b", "acme-13.0b", "acme-12.9b", "acme-0.5b"] {
            assert_eq!(rule_label(&c, id), Some("<=13b".into()), "{id}");
        }
        for id in ["acme-13.9b", "acme-13.01b", "acme-14b"] {
            assert!(!c.is_small(&id.into()), "{id} should not be small");
        }
    }

    #[test]
    fn first_matching_row_is_reported() {
        let c = ModelClassifier::new();
        assert_eq!(rule_label(&c, "llama-7b"), Some("<=13b".into()));
        assert_eq!(rule_label(&c, "phi-2"), Some("phi".into()));
        assert_eq!(rule_label(&c, "o1-mini"), Some("mini".into()));
    }

    #[test]
    fn declared_capacity_below_threshold_is_small() {
        let c = ModelClassifier::new();
        let model = ModelDescriptor::new("acme-large").with_declared_max_tokens(4000);
        let result = c.classify(&model);
        assert!(result.small);
        assert_eq!(
            result.reason,
            Some(SmallReason::DeclaredCapacity { max_tokens: 4000 })
        );
        assert_eq!(result.context_window, 4000);
    }

    #[test]
    fn declared_capacity_at_threshold_is_not_small() {
        let c = ModelClassifier::new();
        let model = ModelDescriptor::new("acme-large").with_declared_max_tokens(8000);
        assert!(!c.is_small(&model));
        assert_eq!(c.context_window(&model), 8000);
    }

    #[test]
    fn zero_declared_capacity_is_ignored() {
        let c = ModelClassifier::new();
        let model = ModelDescriptor::new("gpt-4").with_declared_max_tokens(0);
        assert!(!c.is_small(&model));
        assert_eq!(c.context_window(&model), DEFAULT_CONTEXT_WINDOW);
    }

    #[test]
    fn context_window_defaults() {
        let c = ModelClassifier::new();
        assert_eq!(c.context_window(&"gpt-4".into()), 8000);
        assert_eq!(c.context_window(&"llama-7b".into()), 4096);
        let declared = ModelDescriptor::new("tiny-model").with_declared_max_tokens(2000);
        assert_eq!(c.context_window(&declared), 2000);
    }

    #[test]
    fn declared_window_wins_even_when_large() {
        let c = ModelClassifier::new();
        let model = ModelDescriptor::new("llama-7b").with_declared_max_tokens(32_000);
        assert!(c.is_small(&model));
        assert_eq!(c.context_window(&model), 32_000);
    }

    #[test]
    fn simplified_prompt_follows_smallness() {
        let c = ModelClassifier::new();
        for id in ["phi-2", "gpt-4", "qwen-7b", "claude-3-opus"] {
            let model = ModelDescriptor::new(id);
            assert_eq!(c.use_simplified_prompt(&model), c.is_small(&model));
        }
    }

    #[test]
    fn configured_pattern_extends_table() {
        let config = ClassifierConfig {
            extra_small_patterns: vec![r"^acme-edge".into()],
            ..ClassifierConfig::default()
        };
        let c = ModelClassifier::from_config(&config).unwrap();
        let result = c.classify(&"ACME-Edge-v2".into());
        assert_eq!(
            result.reason,
            Some(SmallReason::Rule {
                kind: RuleKind::Custom,
                label: "^acme-edge".into()
            })
        );
    }

    #[test]
    fn invalid_configured_pattern_fails_at_construction() {
        let config = ClassifierConfig {
            extra_small_patterns: vec!["(unclosed".into()],
            ..ClassifierConfig::default()
        };
        let err = ModelClassifier::from_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { ref pattern, .. } if pattern == "(unclosed"));
    }

    #[test]
    fn configured_windows_apply() {
        let config = ClassifierConfig {
            small_context_window: 2048,
            default_context_window: 16_000,
            ..ClassifierConfig::default()
        };
        let c = ModelClassifier::from_config(&config).unwrap();
        assert_eq!(c.context_window(&"phi-2".into()), 2048);
        assert_eq!(c.context_window(&"gpt-4".into()), 16_000);
    }

    #[test]
    fn with_rule_appends() {
        let rule = SizeRule::new(RuleKind::Custom, "edge", "edge").unwrap();
        let c = ModelClassifier::new().with_rule(rule);
        assert_eq!(c.rules().len(), BUILTIN_RULES.len() + 1);
        assert!(c.is_small(&"foo-edge".into()));
    }
}
