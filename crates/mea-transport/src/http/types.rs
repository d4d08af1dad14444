//! REST payloads exchanged with the backend.

use serde::{Deserialize, Serialize};

/// `GET /health`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthReport {
    /// `ok` when the index is usable.
    pub status: String,
    /// Indexed document count.
    pub docs_indexed: u64,
    /// Average document length in tokens.
    pub avgdl: f64,
}

impl HealthReport {
    /// Whether the backend reports itself healthy.
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// `GET /stats/advanced`. Every section is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedStats {
    /// Index counters.
    pub basic: Option<BasicStats>,
    /// Learning counters.
    pub learning: Option<LearningStats>,
}

/// `basic` section of [`AdvancedStats`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicStats {
    /// Indexed document count.
    pub docs_indexed: u64,
    /// Average document length.
    pub avg_document_length: f64,
}

/// `learning` section of [`AdvancedStats`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningStats {
    /// Queries the backend has learned from.
    pub queries_processed: u64,
}

/// Default strength of an intent training signal.
pub const DEFAULT_INTENT_STRENGTH: f64 = 1.0;

/// `POST /learning/train` body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TrainRequest {
    /// Associate `query` with `intent`.
    Intent {
        /// Example query.
        query: String,
        /// Target intent label.
        intent: String,
        /// Signal weight.
        strength: f64,
    },
    /// `content` was a good answer to `query`.
    Positive {
        /// Example query.
        query: String,
        /// Answer text.
        content: String,
    },
    /// `content` was a bad answer to `query`.
    Negative {
        /// Example query.
        query: String,
        /// Answer text.
        content: String,
    },
}

impl TrainRequest {
    /// Intent signal with [`DEFAULT_INTENT_STRENGTH`].
    pub fn intent(query: impl Into<String>, intent: impl Into<String>) -> Self {
        Self::Intent {
            query: query.into(),
            intent: intent.into(),
            strength: DEFAULT_INTENT_STRENGTH,
        }
    }

    /// The query this signal is about.
    pub fn query(&self) -> &str {
        match self {
            Self::Intent { query, .. } | Self::Positive { query, .. } | Self::Negative { query, .. } => {
                query
            }
        }
    }
}

/// `POST /learning/train` response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainAck {
    /// Whether the signal was accepted.
    pub ok: bool,
    /// Backend message.
    pub message: Option<String>,
    /// Failure reason.
    pub error: Option<String>,
}

/// `POST /add_txt` / `POST /add_pdf` response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestAck {
    /// Whether the document was queued.
    pub ok: bool,
    /// Failure reason.
    pub error: Option<String>,
}
