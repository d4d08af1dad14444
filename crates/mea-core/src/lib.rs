//! # mea-core
//!
//! Shared vocabulary for the MEA client crates:
//!
//! - **Branded IDs**: [`MessageId`] and [`RequestId`] as UUID v7 newtypes
//! - **Transcript messages**: [`Message`] with [`Sender`] and [`MessageKind`]
//! - **Query protocol**: [`QueryRequest`], [`QueryResponse`], [`ResultItem`], [`Reply`]
//! - **Session state**: [`ConnectionState`] and [`ProgressState`]
//! - **Errors**: [`ClientError`] taxonomy via `thiserror`, backend error-body parsing
//! - **Logging**: `tracing` subscriber setup and test capture helpers

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod ids;
pub mod logging;
pub mod messages;
pub mod progress;
pub mod query;

pub use connection::ConnectionState;
pub use errors::{ClientError, ErrorCategory, SendError};
pub use ids::{MessageId, RequestId};
pub use messages::{Message, MessageKind, Sender};
pub use progress::{ProgressReport, ProgressState};
pub use query::{QueryRequest, QueryResponse, Reply, ResultItem};
