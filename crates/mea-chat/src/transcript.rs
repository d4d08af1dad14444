//! Append-only chat history with change notifications.

use std::sync::Arc;

use mea_core::{Message, MessageId};
use parking_lot::Mutex;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 1024;

/// A change to the transcript.
#[derive(Clone, Debug, PartialEq)]
pub enum TranscriptEvent {
    /// A message was added at the end.
    Appended(Message),
    /// A typing placeholder's text changed.
    Updated(Message),
    /// A typing placeholder was removed.
    Removed(MessageId),
}

/// Shared transcript. Clones see the same history.
///
/// Events are emitted while the history lock is held, so subscribers observe
/// changes in exactly the order they were applied. Slow subscribers lag
/// rather than block writers.
#[derive(Clone)]
pub struct Transcript {
    messages: Arc<Mutex<Vec<Message>>>,
    events: broadcast::Sender<TranscriptEvent>,
}

impl Transcript {
    /// Empty transcript.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            messages: Arc::new(Mutex::new(Vec::new())),
            events,
        }
    }

    /// Subscribe to changes made after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<TranscriptEvent> {
        self.events.subscribe()
    }

    /// Copy of the full history in display order.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    /// Whether nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    /// Append `message` and return its id.
    pub fn append(&self, message: Message) -> MessageId {
        let mut messages = self.messages.lock();
        let id = message.id.clone();
        self.emit(TranscriptEvent::Appended(message.clone()));
        messages.push(message);
        id
    }

    /// Replace the text of a typing placeholder. Returns `false` when `id`
    /// is gone or is not a placeholder.
    pub fn update_typing(&self, id: &MessageId, text: &str) -> bool {
        let mut messages = self.messages.lock();
        let Some(message) = messages.iter_mut().find(|m| &m.id == id) else {
            return false;
        };
        if !message.is_typing() {
            return false;
        }
        if message.text != text {
            message.text = text.to_string();
            self.emit(TranscriptEvent::Updated(message.clone()));
        }
        true
    }

    /// Remove the placeholder `id` and append `message` in one step.
    pub fn settle(&self, id: &MessageId, message: Message) -> MessageId {
        let mut messages = self.messages.lock();
        if let Some(idx) = messages.iter().position(|m| &m.id == id && m.is_typing()) {
            let _ = messages.remove(idx);
            self.emit(TranscriptEvent::Removed(id.clone()));
        }
        let appended = message.id.clone();
        self.emit(TranscriptEvent::Appended(message.clone()));
        messages.push(message);
        appended
    }

    fn emit(&self, event: TranscriptEvent) {
        let _ = self.events.send(event);
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Transcript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transcript")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
