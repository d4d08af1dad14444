//! REST client for the MEA backend.
//!
//! Every call goes through one authorized-request helper which:
//! - attaches `Authorization: Bearer <token>` when the provider has a token
//! - fails with [`ClientError::AuthMissing`] before any I/O when the
//!   endpoint requires auth and there is no token
//! - maps status >= 400 to [`ClientError::Http`] with the body's
//!   `error`/`detail` message, or a generic one

pub mod types;

use std::sync::Arc;
use std::time::Duration;

use mea_auth::TokenProvider;
use mea_core::errors::parse;
use mea_core::progress::ProgressReport;
use mea_core::query::{QueryRequest, Reply, decode_reply};
use mea_core::ClientError;
use reqwest::RequestBuilder;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

pub use types::{
    AdvancedStats, BasicStats, DEFAULT_INTENT_STRENGTH, HealthReport, IngestAck, LearningStats,
    TrainAck, TrainRequest,
};

/// Whether an endpoint may be called without a bearer token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthRequirement {
    /// Token attached when present.
    Optional,
    /// Call refused locally without a token.
    Required,
}

/// REST client rooted at the backend base URL.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base: Url,
    tokens: Arc<dyn TokenProvider>,
}

impl BackendClient {
    /// Client with a per-request `timeout`.
    pub fn new(
        base: Url,
        timeout: Duration,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mea-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(http, base, tokens))
    }

    /// Client reusing an existing `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base: Url, tokens: Arc<dyn TokenProvider>) -> Self {
        Self { http, base, tokens }
    }

    /// Underlying HTTP client, for sharing with other services.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Base URL.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Token provider consulted per call.
    pub fn tokens(&self) -> &Arc<dyn TokenProvider> {
        &self.tokens
    }

    /// Absolute URL for a backend path.
    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::Validation(format!("invalid endpoint {path}: {e}")))
    }

    // ─── Authorized request helper ───────────────────────────────────────

    /// Send `builder` with auth applied. Returns status and body without
    /// judging the status.
    async fn send(
        &self,
        builder: RequestBuilder,
        auth: AuthRequirement,
    ) -> Result<(u16, String), ClientError> {
        let builder = match (self.tokens.current_token(), auth) {
            (Some(token), _) => builder.bearer_auth(token.expose()),
            (None, AuthRequirement::Required) => return Err(ClientError::AuthMissing),
            (None, AuthRequirement::Optional) => builder,
        };

        let resp = builder.send().await.map_err(network_error)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(network_error)?;
        Ok((status, body))
    }

    /// Send and require a status below 400.
    async fn execute(
        &self,
        builder: RequestBuilder,
        auth: AuthRequirement,
    ) -> Result<String, ClientError> {
        let (status, body) = self.send(builder, auth).await?;
        if status >= 400 {
            let message = parse::failure_message(&body, status);
            warn!(status, %message, "backend request failed");
            return Err(ClientError::Http { status, message });
        }
        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.endpoint(path)?;
        let body = self
            .execute(self.http.get(url), AuthRequirement::Optional)
            .await?;
        decode(&body)
    }

    // ─── Endpoints ───────────────────────────────────────────────────────

    /// `GET /health`.
    #[instrument(skip_all)]
    pub async fn health(&self) -> Result<HealthReport, ClientError> {
        self.get_json("health").await
    }

    /// `GET /stats/advanced`.
    #[instrument(skip_all)]
    pub async fn advanced_stats(&self) -> Result<AdvancedStats, ClientError> {
        self.get_json("stats/advanced").await
    }

    /// `GET /progress`.
    pub async fn progress(&self) -> Result<ProgressReport, ClientError> {
        self.get_json("progress").await
    }

    /// `POST /learning/train`.
    #[instrument(skip_all, fields(query = %request.query()))]
    pub async fn train(&self, request: &TrainRequest) -> Result<TrainAck, ClientError> {
        let url = self.endpoint("learning/train")?;
        let body = self
            .execute(self.http.post(url).json(request), AuthRequirement::Optional)
            .await?;
        decode(&body)
    }

    /// `POST /query {q, k}`, the retrieval route.
    #[instrument(skip_all, fields(top_k = request.top_k))]
    pub async fn query(&self, request: &QueryRequest) -> Result<Reply, ClientError> {
        let url = self.endpoint("query")?;
        let body = self
            .execute(self.http.post(url).json(request), AuthRequirement::Optional)
            .await?;
        decode_reply(&body)
    }

    /// `POST /api/query {text}`, the authenticated assistant route.
    #[instrument(skip_all)]
    pub async fn assistant_query(&self, text: &str) -> Result<Reply, ClientError> {
        let url = self.endpoint("api/query")?;
        let payload = serde_json::json!({ "text": text });
        let body = self
            .execute(self.http.post(url).json(&payload), AuthRequirement::Required)
            .await?;
        decode_reply(&body)
    }

    /// `POST /add_txt` (multipart `title`, `text`).
    #[instrument(skip_all, fields(title = %title))]
    pub async fn add_text(&self, title: &str, text: &str) -> Result<IngestAck, ClientError> {
        let url = self.endpoint("add_txt")?;
        let form = Form::new()
            .text("title", title.to_string())
            .text("text", text.to_string());
        let (status, body) = self
            .send(self.http.post(url).multipart(form), AuthRequirement::Optional)
            .await?;
        ingest_ack(status, &body)
    }

    /// `POST /add_pdf` (multipart `file`, `title`).
    #[instrument(skip_all, fields(file_name = %file_name, bytes = bytes.len()))]
    pub async fn add_pdf(
        &self,
        file_name: &str,
        title: &str,
        bytes: Vec<u8>,
    ) -> Result<IngestAck, ClientError> {
        let url = self.endpoint("add_pdf")?;
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| ClientError::Validation(format!("invalid multipart part: {e}")))?;
        let form = Form::new().part("file", part).text("title", title.to_string());
        let (status, body) = self
            .send(self.http.post(url).multipart(form), AuthRequirement::Optional)
            .await?;
        ingest_ack(status, &body)
    }
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}

fn network_error(err: reqwest::Error) -> ClientError {
    debug!(error = %err, "request failed before a response");
    ClientError::Network(err.to_string())
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ClientError> {
    serde_json::from_str(body).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Ingestion endpoints report failure in the body (`{ok: false, error}`),
/// sometimes with an error status. A body that is not an ack falls back to
/// status-based handling.
fn ingest_ack(status: u16, body: &str) -> Result<IngestAck, ClientError> {
    match serde_json::from_str::<IngestAck>(body) {
        Ok(ack) if status >= 400 => Ok(IngestAck {
            ok: false,
            error: ack.error.or_else(|| parse::error_message(body)),
        }),
        Ok(ack) => Ok(ack),
        Err(_) if status >= 400 => Err(ClientError::Http {
            status,
            message: parse::failure_message(body, status),
        }),
        Err(e) => Err(ClientError::Decode(e.to_string())),
    }
}
