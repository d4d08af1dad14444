//! Account endpoints: login, registration, logout.

use std::sync::Arc;

use mea_core::errors::parse::error_message;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::errors::{AuthError, REGISTRATION_FAILED};
use crate::provider::TokenStore;
use crate::token::{AuthToken, NewUser, TokenResponse, UserRecord};

/// Client for `/auth/*`, writing issued tokens into a [`TokenStore`].
#[derive(Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    base: Url,
    store: Arc<dyn TokenStore>,
}

impl AuthClient {
    /// Client rooted at `base` (which should end in `/`).
    pub fn new(http: reqwest::Client, base: Url, store: Arc<dyn TokenStore>) -> Self {
        Self { http, base, store }
    }

    /// Store receiving tokens.
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Exchange credentials for a token via the form-encoded
    /// `POST /auth/token`, and store it.
    #[instrument(skip_all, fields(username = %username))]
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthToken, AuthError> {
        let url = self.base.join("auth/token")?;
        let resp = self
            .http
            .post(url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let body: TokenResponse = resp.json().await?;
        if body.access_token.is_blank() {
            warn!("login response carried no token");
            return Err(AuthError::InvalidCredentials);
        }
        self.store.store(&body.access_token)?;
        info!(token_type = %body.token_type, "logged in");
        Ok(body.access_token)
    }

    /// Create an account via `POST /auth/register`.
    ///
    /// Does not log in.
    #[instrument(skip_all, fields(username = %user.username))]
    pub async fn register(&self, user: &NewUser) -> Result<UserRecord, AuthError> {
        let url = self.base.join("auth/register")?;
        let resp = self.http.post(url).json(user).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = registration_message(&text);
            warn!(status = status.as_u16(), %message, "registration rejected");
            return Err(AuthError::Registration {
                status: status.as_u16(),
                message,
            });
        }

        let record: UserRecord = resp.json().await?;
        debug!(user_id = record.id, "registered");
        Ok(record)
    }

    /// Forget the stored token.
    pub fn logout(&self) -> Result<(), AuthError> {
        self.store.clear()?;
        info!("logged out");
        Ok(())
    }
}

fn registration_message(body: &str) -> String {
    error_message(body)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| REGISTRATION_FAILED.to_string())
}
