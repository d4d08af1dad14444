//! # mea-auth
//!
//! Bearer tokens for the MEA backend.
//!
//! The transport and REST clients only ever ask a [`TokenProvider`] for the
//! current token; they never cache it. [`AuthClient`] talks to `/auth/*` and
//! writes issued tokens into a [`TokenStore`]:
//! - [`StaticTokenProvider`]: fixed token from configuration or a flag
//! - [`SessionTokens`]: in-memory, lost on exit
//! - [`FileTokenStore`]: `~/.mea/auth.json` with 0o600 permissions

#![deny(unsafe_code)]

pub mod client;
pub mod errors;
pub mod provider;
pub mod storage;
pub mod token;

pub use client::AuthClient;
pub use errors::AuthError;
pub use provider::{SessionTokens, StaticTokenProvider, TokenProvider, TokenStore};
pub use storage::{FileTokenStore, StoredAuth};
pub use token::{AuthToken, NewUser, TokenResponse, UserRecord};
