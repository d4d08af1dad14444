//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`
//! so a partial settings file fills the gaps with compiled defaults.

mod client;
mod server;

pub use client::*;
pub use server::*;

use serde::{Deserialize, Serialize};

/// Root settings for the MEA client.
///
/// ```json
/// {
///   "server": { "baseUrl": "https://mea.example.com", "transport": "http" },
///   "chat": { "topK": 10 }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeaSettings {
    /// Backend location and transport.
    pub server: ServerSettings,
    /// Query and transcript behavior.
    pub chat: ChatSettings,
    /// Ingestion progress polling.
    pub progress: ProgressSettings,
    /// Logging.
    pub logging: LoggingSettings,
    /// Token storage.
    pub auth: AuthSettings,
}
