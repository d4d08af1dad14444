//! Teaching the backend from operator feedback.

use mea_core::ClientError;
use mea_transport::BackendClient;
use mea_transport::http::{DEFAULT_INTENT_STRENGTH, TrainRequest};
use tracing::{info, warn};

/// What the operator is teaching about a query.
#[derive(Clone, Debug, PartialEq)]
pub enum Feedback {
    /// The query expresses `intent`.
    Intent {
        /// Intent label.
        intent: String,
        /// Signal weight.
        strength: f64,
    },
    /// `content` answered the query well.
    Positive(String),
    /// `content` answered the query badly.
    Negative(String),
}

impl Feedback {
    /// Intent feedback at the default strength.
    pub fn intent(intent: impl Into<String>) -> Self {
        Self::Intent {
            intent: intent.into(),
            strength: DEFAULT_INTENT_STRENGTH,
        }
    }

    fn into_request(self, query: String) -> TrainRequest {
        match self {
            Self::Intent { intent, strength } => TrainRequest::Intent {
                query,
                intent,
                strength,
            },
            Self::Positive(content) => TrainRequest::Positive { query, content },
            Self::Negative(content) => TrainRequest::Negative { query, content },
        }
    }
}

/// Sends training signals to `POST /learning/train`.
#[derive(Clone, Debug)]
pub struct Trainer {
    backend: BackendClient,
}

impl Trainer {
    /// Trainer posting through `backend`.
    pub fn new(backend: BackendClient) -> Self {
        Self { backend }
    }

    /// Send one signal and return the backend's confirmation message.
    pub async fn train(&self, query: &str, feedback: Feedback) -> Result<String, ClientError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ClientError::Validation("Enter the query to train on.".into()));
        }

        let request = feedback.into_request(query.to_string());
        let ack = self.backend.train(&request).await?;
        if !ack.ok {
            let message = ack.error.unwrap_or_else(|| "Training was rejected".into());
            warn!(%message, "training signal rejected");
            return Err(ClientError::Backend(message));
        }

        info!(query, "training signal accepted");
        Ok(ack.message.unwrap_or_default())
    }
}
