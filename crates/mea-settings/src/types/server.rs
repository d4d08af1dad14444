//! Backend endpoint and transport settings.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::{Result, SettingsError};

/// Which channel carries queries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Persistent socket at `wsPath`.
    #[default]
    WebSocket,
    /// One `POST` per query.
    Http,
}

impl TransportKind {
    /// Parse the settings/env spelling (`websocket`, `ws`, `http`).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "websocket" | "ws" => Some(Self::WebSocket),
            "http" => Some(Self::Http),
            _ => None,
        }
    }
}

/// Endpoint used for queries in HTTP mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpRoute {
    /// `POST /query {q, k}`, unauthenticated.
    #[default]
    Retrieval,
    /// `POST /api/query {text}`, bearer token required.
    Assistant,
}

impl HttpRoute {
    /// Parse the settings/env spelling.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "retrieval" => Some(Self::Retrieval),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// Backend location and transport selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// REST base URL (`http` or `https`).
    pub base_url: String,
    /// Path of the streaming endpoint, relative to `baseUrl`.
    pub ws_path: String,
    /// Channel used for queries.
    pub transport: TransportKind,
    /// Query endpoint when `transport` is `http`.
    pub http_route: HttpRoute,
    /// Timeout for each REST call in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            ws_path: "/ws/query".to_string(),
            transport: TransportKind::WebSocket,
            http_route: HttpRoute::Retrieval,
            request_timeout_ms: 30_000,
        }
    }
}

impl ServerSettings {
    /// Parsed REST base, always ending in `/` so relative joins keep any
    /// path prefix.
    pub fn base(&self) -> Result<Url> {
        let mut url = Url::parse(self.base_url.trim())
            .map_err(|e| SettingsError::InvalidValue(format!("baseUrl: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SettingsError::InvalidValue(format!(
                "baseUrl: unsupported scheme '{}'",
                url.scheme()
            )));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    /// Streaming endpoint: `baseUrl` with `http -> ws`, `https -> wss`,
    /// joined with `wsPath`.
    pub fn ws_url(&self) -> Result<Url> {
        let base = self.base()?;
        let mut url = base
            .join(self.ws_path.trim().trim_start_matches('/'))
            .map_err(|e| SettingsError::InvalidValue(format!("wsPath: {e}")))?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|()| SettingsError::InvalidValue(format!("cannot use scheme {scheme}")))?;
        Ok(url)
    }
}
