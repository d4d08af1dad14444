//! Query request/response wire types.
//!
//! The backend answers a query in one of two shapes:
//! - Retrieval: `{query, results, grouped_results, summary, intent, entities, key_phrases, suggestions, total}`
//! - Assistant: `{responses: [string]}`
//!
//! Either may instead carry `{error}`. Every list and mapping field is
//! optional; absent or `null` means "no data". A field with the wrong type is
//! a decode failure, never a panic.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::ClientError;

/// Default number of results requested from the backend.
pub const DEFAULT_TOP_K: usize = 6;

/// An outgoing retrieval query. Serializes to the `POST /query` body `{q, k}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Query text.
    #[serde(rename = "q")]
    pub text: String,
    /// Maximum number of results.
    #[serde(rename = "k")]
    pub top_k: usize,
}

impl QueryRequest {
    /// Build a request with [`DEFAULT_TOP_K`].
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Override the result bound.
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

/// One retrieved chunk.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultItem {
    /// Source document title.
    pub title: String,
    /// Chunk text (possibly truncated by the backend).
    pub text: String,
    /// Relevance score.
    pub score: f64,
    /// Classifier category, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Structured retrieval answer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryResponse {
    /// Echo of the query text.
    #[serde(deserialize_with = "null_as_default")]
    pub query: String,
    /// Ranked results.
    #[serde(deserialize_with = "null_as_default")]
    pub results: Vec<ResultItem>,
    /// Results partitioned by category, in backend order.
    #[serde(deserialize_with = "null_as_default")]
    pub grouped_results: IndexMap<String, Vec<ResultItem>>,
    /// Extractive summary.
    pub summary: Option<String>,
    /// Detected query intent.
    pub intent: Option<String>,
    /// Extracted entities by type, in backend order.
    #[serde(deserialize_with = "null_as_default")]
    pub entities: IndexMap<String, Vec<String>>,
    /// Key phrases of the query.
    #[serde(deserialize_with = "null_as_default")]
    pub key_phrases: Vec<String>,
    /// Follow-up suggestions.
    #[serde(deserialize_with = "null_as_default")]
    pub suggestions: Vec<String>,
    /// Number of matching chunks before truncation.
    #[serde(deserialize_with = "null_as_default")]
    pub total: u64,
}

/// A decoded backend answer.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    /// Structured retrieval result, rendered by the interpreter.
    Query(QueryResponse),
    /// Free-form assistant lines.
    Responses(Vec<String>),
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode a reply body.
pub fn decode_reply(body: &str) -> Result<Reply, ClientError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ClientError::Decode(e.to_string()))?;
    decode_reply_value(value)
}

/// Decode an already-parsed reply.
///
/// A non-null `error` field wins over any payload. Otherwise a `responses`
/// array selects the assistant shape, and anything else must carry `query`
/// or `results` and parse as a [`QueryResponse`].
pub fn decode_reply_value(value: Value) -> Result<Reply, ClientError> {
    let Value::Object(mut map) = value else {
        return Err(ClientError::Decode("expected a JSON object".into()));
    };

    match map.remove("error") {
        None | Some(Value::Null) => {}
        Some(Value::String(message)) => return Err(ClientError::Backend(message)),
        Some(other) => return Err(ClientError::Backend(other.to_string())),
    }

    if let Some(responses) = map.remove("responses") {
        let lines: Vec<String> = serde_json::from_value(responses)
            .map_err(|e| ClientError::Decode(format!("responses: {e}")))?;
        return Ok(Reply::Responses(lines));
    }

    if !map.contains_key("query") && !map.contains_key("results") {
        return Err(ClientError::Decode(
            "expected `query`, `results` or `responses`".into(),
        ));
    }

    serde_json::from_value(Value::Object(map))
        .map(Reply::Query)
        .map_err(|e| ClientError::Decode(e.to_string()))
}
