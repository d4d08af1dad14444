//! Auth error types.

/// Message shown when the backend rejects a login.
pub const INVALID_CREDENTIALS: &str = "Incorrect username or password";

/// Fallback message when registration fails without a `detail`.
pub const REGISTRATION_FAILED: &str = "Failed to register user";

/// Errors that can occur during authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// HTTP request failed before a response.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Endpoint URL could not be built.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// `POST /auth/token` was rejected.
    #[error("Incorrect username or password")]
    InvalidCredentials,

    /// `POST /auth/register` was rejected.
    #[error("registration failed ({status}): {message}")]
    Registration {
        /// HTTP status code.
        status: u16,
        /// Backend `detail`, or [`REGISTRATION_FAILED`].
        message: String,
    },
}

impl AuthError {
    /// Text shown to the operator.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCredentials => INVALID_CREDENTIALS.to_string(),
            Self::Registration { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
