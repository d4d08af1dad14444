//! Plain-text rendering of session events.

use mea_chat::{ProgressEvent, SystemStats, TranscriptEvent};
use mea_core::{Message, Sender};

/// Line(s) to print for a transcript change. Placeholder frames are skipped.
pub fn transcript_event(event: &TranscriptEvent) -> Option<String> {
    match event {
        TranscriptEvent::Appended(message) if !message.is_typing() => Some(message_line(message)),
        TranscriptEvent::Appended(_) => Some("…".to_string()),
        TranscriptEvent::Updated(_) | TranscriptEvent::Removed(_) => None,
    }
}

fn message_line(message: &Message) -> String {
    if message.is_error() {
        return format!("! {}", message.text);
    }
    match message.sender {
        Sender::User => format!("> {}", message.text),
        Sender::Assistant | Sender::System => message.text.clone(),
    }
}

/// Line to print for a progress event.
pub fn progress_event(event: &ProgressEvent) -> Option<String> {
    match event {
        ProgressEvent::State(state) => Some(format!("[progress] {state}")),
        ProgressEvent::StatsRefreshed(stats) => Some(stats_line(stats)),
        ProgressEvent::PollFailed(_) => None,
    }
}

/// One-line stats summary.
pub fn stats_line(stats: &SystemStats) -> String {
    format!(
        "[stats] Docs: {} · Avg length: {} · Status: {}",
        stats.docs_indexed, stats.avg_length, stats.status
    )
}
