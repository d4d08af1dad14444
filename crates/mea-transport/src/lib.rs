//! # mea-transport
//!
//! The single logical connection between the client and the MEA backend.
//!
//! - [`TransportManager`]: connection lifecycle over a WebSocket or the
//!   HTTP fallback, with per-request reply correlation
//! - [`BackendClient`]: REST calls (health, stats, progress, ingestion,
//!   training, queries) with bearer auth and error-body parsing
//! - [`QueryChannel`]: the trait the chat layer sends through
//! - [`ReconnectPolicy`]: what to do after an unexpected drop

#![deny(unsafe_code)]

pub mod channel;
pub mod http;
pub mod manager;
pub mod policy;
pub mod reply;
mod socket;

pub use channel::QueryChannel;
pub use http::{AuthRequirement, BackendClient};
pub use manager::{DropEvents, StateEvents, TransportConfig, TransportManager};
pub use policy::{ManualReconnect, ReconnectPolicy};
pub use reply::{PendingReply, ReplySender};
