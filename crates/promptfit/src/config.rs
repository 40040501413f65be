//! Configuration for [`PromptFit`](crate::PromptFit).
//!
//! Every constant the library uses has a default here, so an empty config
//! reproduces stock behavior. Override through struct fields, or load a JSON
//! file where any missing key keeps its default:
//!
//! ```json
//! {
//!   "classifier": { "extra_small_patterns": ["^acme-edge"] },
//!   "session": { "default_start_command": "cargo run" }
//! }
//! ```

use crate::context::{DiffConfig, TrimmerConfig, TruncationConfig};
use crate::model::ClassifierConfig;
use crate::session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Errors raised while loading configuration or compiling configured
/// patterns. Never raised by per-call operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config from {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid model pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Top-level configuration tree.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct PromptFitConfig {
    pub classifier: ClassifierConfig,
    pub truncation: TruncationConfig,
    pub trimmer: TrimmerConfig,
    pub diff: DiffConfig,
    pub session: SessionConfig,
}

impl PromptFitConfig {
    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            origin: "inline JSON".to_string(),
            source,
        })
    }

    /// Read and parse a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            origin: format!("'{}'", path.display()),
            source,
        })?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}
