//! Transcript message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::MessageId;

/// Who authored a transcript message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The human operator.
    User,
    /// The backend assistant (free-form `responses` replies).
    Assistant,
    /// The client itself: rendered query results, status and errors.
    System,
}

/// Presentation kind of a transcript message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Regular content.
    #[default]
    Normal,
    /// Advisory "thinking" placeholder, replaced when the reply arrives.
    Typing,
    /// A failed interaction.
    Error,
}

/// A single transcript entry.
///
/// Immutable once appended, except for [`MessageKind::Typing`] placeholders
/// whose text is animated until they are removed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message ID.
    pub id: MessageId,
    /// Author.
    pub sender: Sender,
    /// Display text.
    pub text: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Presentation kind.
    pub kind: MessageKind,
}

impl Message {
    fn build(sender: Sender, text: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            id: MessageId::new(),
            sender,
            text: text.into(),
            created_at: Utc::now(),
            kind,
        }
    }

    /// A message typed by the operator.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::build(Sender::User, text, MessageKind::Normal)
    }

    /// A free-form assistant reply.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::build(Sender::Assistant, text, MessageKind::Normal)
    }

    /// A system message (rendered results, status notices).
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self::build(Sender::System, text, MessageKind::Normal)
    }

    /// A system error message.
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self::build(Sender::System, text, MessageKind::Error)
    }

    /// A typing placeholder with its initial frame.
    #[must_use]
    pub fn typing() -> Self {
        Self::build(Sender::System, "Thinking", MessageKind::Typing)
    }

    /// Whether this message is a typing placeholder.
    pub fn is_typing(&self) -> bool {
        self.kind == MessageKind::Typing
    }

    /// Whether this message reports a failure.
    pub fn is_error(&self) -> bool {
        self.kind == MessageKind::Error
    }
}
