//! Model identity and capacity classification.
//!
//! - **[`classifier`]** — [`ModelClassifier`] decides whether a model is
//!   "small" and which context window to assume for it.

pub mod classifier;

pub use classifier::{
    Classification, ClassifierConfig, ModelClassifier, RuleKind, SizeRule, SmallReason,
};

use serde::{Deserialize, Serialize};

/// A model as supplied by the caller for one request.
///
/// `declared_max_tokens` is whatever capacity the provider advertises for the
/// model, if anything. A declared value of zero means "unknown" and is
/// treated as absent.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_max_tokens: Option<usize>,
}

impl ModelDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            declared_max_tokens: None,
        }
    }

    /// Attach the provider-declared context capacity (in tokens).
    pub fn with_declared_max_tokens(mut self, tokens: usize) -> Self {
        self.declared_max_tokens = Some(tokens);
        self
    }

    /// Declared capacity, ignoring a meaningless zero.
    pub fn declared_capacity(&self) -> Option<usize> {
        self.declared_max_tokens.filter(|&t| t > 0)
    }
}

impl From<&str> for ModelDescriptor {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ModelDescriptor {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}
