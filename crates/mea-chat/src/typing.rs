//! Animated "Thinking" placeholder.

use std::time::Duration;

use mea_core::{Message, MessageId};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::transcript::Transcript;

/// Default animation step.
pub const DEFAULT_TYPING_INTERVAL: Duration = Duration::from_millis(500);

const BASE: &str = "Thinking";

/// Placeholder text at animation step `step`: "Thinking" plus 0 to 3 dots.
pub fn frame(step: usize) -> String {
    format!("{BASE}{}", ".".repeat(step % 4))
}

/// A typing placeholder in the transcript and the task animating it.
///
/// The task stops on [`stop`](Self::stop), on drop, or as soon as the
/// placeholder is no longer in the transcript.
#[derive(Debug)]
pub struct TypingIndicator {
    id: MessageId,
    cancel: CancellationToken,
}

impl TypingIndicator {
    /// Append a placeholder to `transcript` and start animating it.
    pub fn start(transcript: &Transcript, interval: Duration) -> Self {
        let id = transcript.append(Message::typing());
        let cancel = CancellationToken::new();

        let task_id = id.clone();
        let task_cancel = cancel.clone();
        let transcript = transcript.clone();
        let _ = tokio::spawn(async move {
            let mut ticks = tokio::time::interval(interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let _ = ticks.tick().await;

            let mut step = 0usize;
            loop {
                tokio::select! {
                    () = task_cancel.cancelled() => break,
                    _ = ticks.tick() => {
                        step = step.wrapping_add(1);
                        if !transcript.update_typing(&task_id, &frame(step)) {
                            break;
                        }
                    }
                }
            }
        });

        Self { id, cancel }
    }

    /// Placeholder message id.
    pub fn id(&self) -> &MessageId {
        &self.id
    }

    /// Stop animating and hand back the placeholder id for removal.
    pub fn stop(self) -> MessageId {
        self.cancel.cancel();
        self.id.clone()
    }
}

impl Drop for TypingIndicator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_cycle_through_four_states() {
        let frames: Vec<String> = (0..5).map(frame).collect();
        assert_eq!(
            frames,
            ["Thinking", "Thinking.", "Thinking..", "Thinking...", "Thinking"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn animates_until_stopped() {
        let transcript = Transcript::new();
        let indicator = TypingIndicator::start(&transcript, Duration::from_millis(500));
        assert_eq!(transcript.snapshot()[0].text, "Thinking");

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(transcript.snapshot()[0].text, "Thinking..");

        let id = indicator.stop();
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(transcript.snapshot()[0].text, "Thinking..");
        assert_eq!(transcript.snapshot()[0].id, id);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_placeholder_removed() {
        let transcript = Transcript::new();
        let indicator = TypingIndicator::start(&transcript, Duration::from_millis(500));
        let id = indicator.id().clone();
        let _ = transcript.settle(&id, Message::system("done"));

        tokio::time::sleep(Duration::from_millis(1100)).await;
        let snapshot = transcript.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].text, "done");
        drop(indicator);
    }
}
