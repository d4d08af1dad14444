//! Token providers consulted on every authorized call.
//!
//! - [`StaticTokenProvider`]: fixed token (or none), e.g. from a CLI flag
//! - [`SessionTokens`]: in-memory, replaced after login
//! - [`FileTokenStore`](crate::storage::FileTokenStore): persisted in `~/.mea/auth.json`

use parking_lot::RwLock;

use crate::errors::AuthError;
use crate::token::AuthToken;

/// Source of the current bearer token.
///
/// Called once per authorized request, so a token replaced after login is
/// picked up without rebuilding clients.
pub trait TokenProvider: Send + Sync {
    /// The token to send, or `None` when signed out.
    fn current_token(&self) -> Option<AuthToken>;
}

/// A provider whose token can be replaced and cleared.
pub trait TokenStore: TokenProvider {
    /// Replace the stored token.
    fn store(&self, token: &AuthToken) -> Result<(), AuthError>;

    /// Forget the stored token.
    fn clear(&self) -> Result<(), AuthError>;
}

/// Fixed token, never changes.
#[derive(Clone, Debug, Default)]
pub struct StaticTokenProvider {
    token: Option<AuthToken>,
}

impl StaticTokenProvider {
    /// Provider that always yields `token`.
    pub fn new(token: AuthToken) -> Self {
        Self { token: Some(token) }
    }

    /// Provider that never yields a token.
    pub fn none() -> Self {
        Self { token: None }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn current_token(&self) -> Option<AuthToken> {
        self.token.clone().filter(|t| !t.is_blank())
    }
}

/// In-memory token for the lifetime of the process.
#[derive(Debug, Default)]
pub struct SessionTokens {
    token: RwLock<Option<AuthToken>>,
}

impl SessionTokens {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `token`.
    pub fn with_token(token: AuthToken) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }
}

impl TokenProvider for SessionTokens {
    fn current_token(&self) -> Option<AuthToken> {
        self.token.read().clone().filter(|t| !t.is_blank())
    }
}

impl TokenStore for SessionTokens {
    fn store(&self, token: &AuthToken) -> Result<(), AuthError> {
        *self.token.write() = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        *self.token.write() = None;
        Ok(())
    }
}
