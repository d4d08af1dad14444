//! Transport connection state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of the single logical connection to the backend.
///
/// `Idle -> Connecting -> Open -> Closed`, with `Failed` reachable from
/// `Connecting` (never opened) and `Open` (dropped with an error). `Closed`
/// and `Failed` are terminal until an explicit reconnect.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum ConnectionState {
    /// Never connected.
    #[default]
    Idle,
    /// Handshake in progress.
    Connecting,
    /// Ready to send.
    Open,
    /// Closed cleanly (locally or by the peer).
    Closed,
    /// Could not open, or dropped with an error.
    Failed(String),
}

impl ConnectionState {
    /// Whether requests may be sent.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Whether the connection has ended and needs an explicit reconnect.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed(_))
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}
