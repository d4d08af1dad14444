//! Query submission and transcript bookkeeping.
//!
//! Every non-blank submit produces exactly one user message and exactly one
//! terminal system message (an answer or an error). Failures never surface
//! to the caller; the transcript is the only output.

use std::sync::Arc;
use std::time::Duration;

use mea_core::{ClientError, Message, Reply, SendError};
use mea_transport::QueryChannel;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::interpreter::interpret;
use crate::transcript::{Transcript, TranscriptEvent};
use crate::typing::{DEFAULT_TYPING_INTERVAL, TypingIndicator};

/// What `submit` did with the input.
#[derive(Debug)]
pub enum SubmitStatus {
    /// Blank input; nothing happened.
    Ignored,
    /// Not sent; an error message was appended.
    Rejected,
    /// Sent; the handle completes once the terminal message is appended.
    InFlight(JoinHandle<()>),
}

impl SubmitStatus {
    /// Wait for the interaction to finish. Returns immediately unless in
    /// flight.
    pub async fn settled(self) {
        if let Self::InFlight(handle) = self {
            let _ = handle.await;
        }
    }
}

/// Sends operator queries and records the conversation.
#[derive(Clone)]
pub struct MessageDispatcher {
    channel: Arc<dyn QueryChannel>,
    transcript: Transcript,
    typing_interval: Duration,
    reply_timeout: Option<Duration>,
}

impl MessageDispatcher {
    /// Dispatcher sending over `channel` and recording into `transcript`.
    pub fn new(channel: Arc<dyn QueryChannel>, transcript: Transcript) -> Self {
        Self {
            channel,
            transcript,
            typing_interval: DEFAULT_TYPING_INTERVAL,
            reply_timeout: None,
        }
    }

    /// Override the placeholder animation step.
    #[must_use]
    pub fn with_typing_interval(mut self, interval: Duration) -> Self {
        self.typing_interval = interval;
        self
    }

    /// Give up on a reply after `timeout`.
    #[must_use]
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = Some(timeout);
        self
    }

    /// Snapshot of the conversation.
    pub fn transcript(&self) -> Vec<Message> {
        self.transcript.snapshot()
    }

    /// Subscribe to transcript changes.
    pub fn subscribe(&self) -> broadcast::Receiver<TranscriptEvent> {
        self.transcript.subscribe()
    }

    /// Submit operator input.
    #[instrument(skip_all, fields(chars = text.len()))]
    pub fn submit(&self, text: &str) -> SubmitStatus {
        let text = text.trim();
        if text.is_empty() {
            debug!("blank input ignored");
            return SubmitStatus::Ignored;
        }

        let _ = self.transcript.append(Message::user(text));

        let state = self.channel.connection_state();
        if !state.is_open() {
            self.reject(SendError::NotReady { state });
            return SubmitStatus::Rejected;
        }

        let indicator = TypingIndicator::start(&self.transcript, self.typing_interval);
        let pending = match self.channel.request(text) {
            Ok(pending) => pending,
            Err(e) => {
                let placeholder = indicator.stop();
                let err = ClientError::from(e);
                warn!(error = %err, "send failed");
                let _ = self
                    .transcript
                    .settle(&placeholder, Message::error(err.user_message()));
                return SubmitStatus::Rejected;
            }
        };

        let transcript = self.transcript.clone();
        let timeout = self.reply_timeout;
        let request_id = pending.request_id().clone();
        let handle = tokio::spawn(async move {
            let outcome = match timeout {
                Some(limit) => tokio::time::timeout(limit, pending)
                    .await
                    .unwrap_or_else(|_| {
                        Err(ClientError::Network("timed out waiting for a reply".into()))
                    }),
                None => pending.await,
            };

            let placeholder = indicator.stop();
            let message = match outcome {
                Ok(reply) => {
                    debug!(%request_id, "reply received");
                    render(reply)
                }
                Err(e) => {
                    warn!(%request_id, error = %e, category = %e.category(), "query failed");
                    Message::error(e.user_message())
                }
            };
            let _ = transcript.settle(&placeholder, message);
        });

        SubmitStatus::InFlight(handle)
    }

    fn reject(&self, err: SendError) {
        let err = ClientError::from(err);
        debug!(error = %err, "submit rejected");
        let _ = self.transcript.append(Message::error(err.user_message()));
    }
}

/// Transcript text for a successful reply.
pub fn render(reply: Reply) -> Message {
    match reply {
        Reply::Query(response) => Message::system(interpret(&response).to_string()),
        Reply::Responses(lines) => Message::system(lines.join("\n")),
    }
}

impl std::fmt::Debug for MessageDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDispatcher")
            .field("typing_interval", &self.typing_interval)
            .field("reply_timeout", &self.reply_timeout)
            .finish_non_exhaustive()
    }
}
