//! Error taxonomy for the MEA client.
//!
//! - [`ClientError`]: every way an interaction can fail, each with a
//!   user-facing message for the transcript
//! - [`SendError`]: rejection of a send on a transport that is not open
//! - [`ErrorCategory`]: coarse classification used in logs
//!
//! All errors are local-recoverable: an interaction ends with a visible
//! message and the client stays ready for the next input. Error-body
//! extraction for HTTP failures lives in [`parse`].

pub mod parse;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::connection::ConnectionState;

/// Generic transcript text for failures without a more specific message.
pub const GENERIC_FAILURE: &str =
    "Sorry, I encountered an error while processing your query. Please try again.";

/// Transcript text for replies that could not be decoded.
pub const DECODE_FAILURE: &str = "Could not process the server response.";

/// Send attempted on a transport that cannot deliver it.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SendError {
    /// The connection is not `Open`. No I/O was performed.
    #[error("transport not ready (state: {state})")]
    NotReady {
        /// State at the time of the attempt.
        state: ConnectionState,
    },
    /// The socket task has already stopped.
    #[error("transport channel closed")]
    ChannelClosed,
}

/// Failure of a client interaction.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The socket never opened, or closed while a reply was pending.
    #[error("connection error: {0}")]
    Connection(String),

    /// Send attempted while the transport was not open.
    #[error(transparent)]
    TransportRejected(#[from] SendError),

    /// The backend answered with status >= 400.
    #[error("HTTP {status}: {message}")]
    Http {
        /// Response status code.
        status: u16,
        /// Message from the body's `error`/`detail` field, or a generic one.
        message: String,
    },

    /// The reply was not valid JSON or had an unexpected shape.
    #[error("could not decode response: {0}")]
    Decode(String),

    /// An authorized call was attempted without a bearer token.
    #[error("authentication required")]
    AuthMissing,

    /// A 2xx reply carried an `error` field.
    #[error("backend error: {0}")]
    Backend(String),

    /// The request failed before any response (DNS, refused, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// Input rejected locally before any request.
    #[error("{0}")]
    Validation(String),
}

impl ClientError {
    /// Text shown in the transcript for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::Connection(reason) => {
                format!("Connection error: {reason}. Reconnect to continue.")
            }
            Self::TransportRejected(_) => {
                "Not connected to the server. Reconnect and try again.".to_string()
            }
            Self::Http { message, .. } => format!("Error: {message}"),
            Self::Decode(_) => DECODE_FAILURE.to_string(),
            Self::AuthMissing => "You need to log in before sending this request.".to_string(),
            Self::Backend(message) => format!("Error: {message}"),
            Self::Network(_) => GENERIC_FAILURE.to_string(),
            Self::Validation(message) => message.clone(),
        }
    }

    /// Classification for logging.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Connection(_) | Self::TransportRejected(_) | Self::Network(_) => {
                ErrorCategory::Network
            }
            Self::Http { status, .. } if *status == 401 || *status == 403 => {
                ErrorCategory::Authentication
            }
            Self::Http { status, .. } if *status >= 500 => ErrorCategory::Server,
            Self::Http { .. } | Self::Validation(_) => ErrorCategory::InvalidRequest,
            Self::Decode(_) => ErrorCategory::Decode,
            Self::AuthMissing => ErrorCategory::Authentication,
            Self::Backend(_) => ErrorCategory::Server,
        }
    }
}

/// Error category for classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Missing or rejected credentials.
    Authentication,
    /// Connectivity problems.
    Network,
    /// Backend-side failure.
    Server,
    /// Rejected request (4xx or local validation).
    InvalidRequest,
    /// Unexpected payload shape.
    Decode,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Network => write!(f, "network"),
            Self::Server => write!(f, "server"),
            Self::InvalidRequest => write!(f, "invalid_request"),
            Self::Decode => write!(f, "decode"),
        }
    }
}
