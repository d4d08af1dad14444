//! Ingestion progress state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Raw `GET /progress` payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressReport {
    /// `indexing`, `done`, or anything else (treated as idle).
    pub status: String,
    /// Chunks processed so far.
    pub processed: u64,
    /// Total chunks in the current job.
    pub total: u64,
}

/// Normalized progress of the background ingestion job.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProgressState {
    /// No job running.
    #[default]
    Idle,
    /// A job is indexing; `processed <= total` always holds.
    Indexing {
        /// Chunks processed.
        processed: u64,
        /// Total chunks.
        total: u64,
    },
    /// The job just finished.
    Done,
}

impl ProgressState {
    /// Build an `Indexing` state, clamping `processed` to `total`.
    #[must_use]
    pub fn indexing(processed: u64, total: u64) -> Self {
        Self::Indexing {
            processed: processed.min(total),
            total,
        }
    }

    /// Normalize a raw report. Unrecognized statuses map to `Idle`.
    #[must_use]
    pub fn from_report(report: &ProgressReport) -> Self {
        match report.status.as_str() {
            "indexing" => Self::indexing(report.processed, report.total),
            "done" => Self::Done,
            _ => Self::Idle,
        }
    }

    /// Completion percentage in `[0, 100]`; `None` unless indexing.
    pub fn percent(&self) -> Option<u8> {
        match *self {
            Self::Indexing { processed, total } => Some(percent(processed, total)),
            Self::Idle | Self::Done => None,
        }
    }
}

impl fmt::Display for ProgressState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Idle => write!(f, "idle"),
            Self::Indexing { processed, total } => write!(
                f,
                "Processing document... ({processed}/{total}) {}%",
                percent(processed, total)
            ),
            Self::Done => write!(f, "done"),
        }
    }
}

/// `round(processed / total * 100)`, clamped to `[0, 100]`, and 0 when
/// `total == 0`. Rounds half up.
pub fn percent(processed: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let processed = u128::from(processed.min(total));
    let total = u128::from(total);
    let rounded = (processed * 200 + total) / (2 * total);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn three_of_four_is_75() {
        assert_eq!(percent(3, 4), 75);
    }

    #[test]
    fn zero_total_is_zero() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(5, 0), 0);
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(percent(1, 8), 13); // 12.5
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
    }

    #[test]
    fn indexing_clamps_processed() {
        assert_eq!(
            ProgressState::indexing(7, 4),
            ProgressState::Indexing {
                processed: 4,
                total: 4
            }
        );
    }

    #[test]
    fn from_report_maps_statuses() {
        let r = |status: &str| ProgressReport {
            status: status.into(),
            processed: 1,
            total: 2,
        };
        assert_eq!(
            ProgressState::from_report(&r("indexing")),
            ProgressState::indexing(1, 2)
        );
        assert_eq!(ProgressState::from_report(&r("done")), ProgressState::Done);
        assert_eq!(ProgressState::from_report(&r("idle")), ProgressState::Idle);
        assert_eq!(ProgressState::from_report(&r("paused")), ProgressState::Idle);
        assert_eq!(ProgressState::from_report(&r("")), ProgressState::Idle);
    }

    #[test]
    fn report_tolerates_missing_fields() {
        let report: ProgressReport = serde_json::from_str(r#"{"status":"idle"}"#).unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(report.total, 0);
    }

    #[test]
    fn percent_only_while_indexing() {
        assert_eq!(ProgressState::indexing(1, 2).percent(), Some(50));
        assert_eq!(ProgressState::Done.percent(), None);
        assert_eq!(ProgressState::Idle.percent(), None);
    }

    #[test]
    fn display_indexing() {
        assert_eq!(
            ProgressState::indexing(3, 4).to_string(),
            "Processing document... (3/4) 75%"
        );
    }

    proptest! {
        #[test]
        fn percent_is_bounded(processed in any::<u64>(), total in any::<u64>()) {
            prop_assert!(percent(processed, total) <= 100);
        }

        #[test]
        fn complete_job_is_100(total in 1u64..1_000_000) {
            prop_assert_eq!(percent(total, total), 100);
        }
    }
}
