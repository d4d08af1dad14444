//! Backend status and index counters.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use mea_core::ClientError;
use mea_transport::BackendClient;
use mea_transport::http::{AdvancedStats, HealthReport};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

/// Where stats come from.
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// `GET /health`.
    async fn fetch_health(&self) -> Result<HealthReport, ClientError>;
    /// `GET /stats/advanced`.
    async fn fetch_advanced(&self) -> Result<AdvancedStats, ClientError>;
}

#[async_trait]
impl StatsSource for BackendClient {
    async fn fetch_health(&self) -> Result<HealthReport, ClientError> {
        self.health().await
    }

    async fn fetch_advanced(&self) -> Result<AdvancedStats, ClientError> {
        self.advanced_stats().await
    }
}

/// Backend condition shown next to the counters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "queries", rename_all = "lowercase")]
pub enum BackendStatus {
    /// Healthy.
    Ready,
    /// Reachable but reporting a problem.
    Error,
    /// Not reachable.
    Offline,
    /// Healthy and has learned from this many queries.
    Learning(u64),
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => f.write_str("Ready"),
            Self::Error => f.write_str("Error"),
            Self::Offline => f.write_str("Offline"),
            Self::Learning(n) => write!(f, "Learning ({n} queries)"),
        }
    }
}

/// Result of one stats refresh.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SystemStats {
    /// Indexed document count.
    pub docs_indexed: u64,
    /// Average document length.
    pub avg_length: f64,
    /// Backend condition.
    pub status: BackendStatus,
}

impl SystemStats {
    fn offline() -> Self {
        Self {
            docs_indexed: 0,
            avg_length: 0.0,
            status: BackendStatus::Offline,
        }
    }

    /// Combine a health report with optional advanced stats. Advanced
    /// counters win when present; a positive learning count overrides the
    /// status.
    pub fn from_reports(health: &HealthReport, advanced: Option<&AdvancedStats>) -> Self {
        let mut stats = Self {
            docs_indexed: health.docs_indexed,
            avg_length: health.avgdl.round(),
            status: if health.is_ok() {
                BackendStatus::Ready
            } else {
                BackendStatus::Error
            },
        };

        if let Some(advanced) = advanced {
            if let Some(basic) = &advanced.basic {
                stats.docs_indexed = basic.docs_indexed;
                stats.avg_length = basic.avg_document_length;
            }
            let learned = advanced.learning.as_ref().map_or(0, |l| l.queries_processed);
            if learned > 0 {
                stats.status = BackendStatus::Learning(learned);
            }
        }
        stats
    }
}

impl fmt::Display for SystemStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Documents: {} | Avg length: {} | Status: {}",
            self.docs_indexed, self.avg_length, self.status
        )
    }
}

/// Refreshes and remembers [`SystemStats`].
pub struct StatsService {
    source: Arc<dyn StatsSource>,
    latest: Mutex<Option<SystemStats>>,
}

impl StatsService {
    /// Service reading from `source`.
    pub fn new(source: Arc<dyn StatsSource>) -> Self {
        Self {
            source,
            latest: Mutex::new(None),
        }
    }

    /// Last refreshed value, if any.
    pub fn latest(&self) -> Option<SystemStats> {
        self.latest.lock().clone()
    }

    /// Fetch health, then advanced stats. A health failure means
    /// [`BackendStatus::Offline`]; an advanced-stats failure is ignored.
    pub async fn refresh(&self) -> SystemStats {
        let stats = match self.source.fetch_health().await {
            Err(e) => {
                warn!(error = %e, category = %e.category(), "health check failed");
                SystemStats::offline()
            }
            Ok(health) => {
                let advanced = match self.source.fetch_advanced().await {
                    Ok(advanced) => Some(advanced),
                    Err(e) => {
                        debug!(error = %e, "advanced stats unavailable");
                        None
                    }
                };
                SystemStats::from_reports(&health, advanced.as_ref())
            }
        };
        *self.latest.lock() = Some(stats.clone());
        stats
    }
}
