//! # mea-chat
//!
//! The conversation engine on top of [`mea_transport`]:
//!
//! - [`MessageDispatcher`]: submit queries, keep the [`Transcript`]
//! - [`interpret`]: render a structured answer into display sections
//! - [`ProgressTracker`]: poll background ingestion, refresh stats on completion
//! - [`Ingestor`], [`StatsService`], [`Trainer`]: documents, counters, feedback
//! - [`ChatSession`]: all of the above wired from settings

#![deny(unsafe_code)]

pub mod dispatcher;
pub mod ingest;
pub mod interpreter;
pub mod progress;
pub mod session;
pub mod stats;
pub mod training;
pub mod transcript;
pub mod typing;

pub use dispatcher::{MessageDispatcher, SubmitStatus};
pub use ingest::Ingestor;
pub use interpreter::{RenderedSections, interpret};
pub use progress::{PollerHandle, ProgressEvent, ProgressSource, ProgressTracker};
pub use session::ChatSession;
pub use stats::{BackendStatus, StatsService, StatsSource, SystemStats};
pub use training::{Feedback, Trainer};
pub use transcript::{Transcript, TranscriptEvent};
pub use typing::TypingIndicator;
