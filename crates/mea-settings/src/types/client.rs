//! Chat, progress, logging, and auth settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Query and transcript behavior.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatSettings {
    /// Results requested per retrieval query.
    pub top_k: usize,
    /// Typing-placeholder animation period in milliseconds.
    pub typing_interval_ms: u64,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            top_k: 6,
            typing_interval_ms: 500,
        }
    }
}

/// Ingestion progress polling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressSettings {
    /// Poll period in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Token storage.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSettings {
    /// Token file; `~/.mea/auth.json` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_file: Option<String>,
}

impl AuthSettings {
    /// Resolved token file path.
    pub fn token_path(&self) -> PathBuf {
        self.token_file
            .as_ref()
            .map_or_else(|| crate::loader::mea_dir().join("auth.json"), PathBuf::from)
    }
}
