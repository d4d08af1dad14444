//! Background ingestion progress polling.
//!
//! [`ProgressTracker::start`] spawns one poller that reads `GET /progress`
//! on a fixed cadence until its [`PollerHandle`] is stopped or dropped.
//! A completed job moves the state to `Done`, triggers exactly one stats
//! refresh, then settles back to `Idle`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mea_core::{ClientError, ProgressReport, ProgressState};
use mea_transport::BackendClient;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::stats::{StatsService, SystemStats};

/// Default poll cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

const EVENT_CAPACITY: usize = 256;

/// Where progress reports come from.
#[async_trait]
pub trait ProgressSource: Send + Sync {
    /// `GET /progress`.
    async fn fetch_progress(&self) -> Result<ProgressReport, ClientError>;
}

#[async_trait]
impl ProgressSource for BackendClient {
    async fn fetch_progress(&self) -> Result<ProgressReport, ClientError> {
        self.progress().await
    }
}

/// Something the poller observed.
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    /// The tracked state changed.
    State(ProgressState),
    /// A poll failed; polling continues.
    PollFailed(ClientError),
    /// Stats were refreshed after a job completed.
    StatsRefreshed(SystemStats),
}

/// Tracks the backend's ingestion job.
pub struct ProgressTracker {
    source: Arc<dyn ProgressSource>,
    stats: Arc<StatsService>,
    interval: Duration,
    state: Arc<Mutex<ProgressState>>,
    events: broadcast::Sender<ProgressEvent>,
}

impl ProgressTracker {
    /// Tracker polling `source` every `interval`, refreshing `stats` on
    /// completion.
    pub fn new(
        source: Arc<dyn ProgressSource>,
        stats: Arc<StatsService>,
        interval: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            source,
            stats,
            interval,
            state: Arc::new(Mutex::new(ProgressState::Idle)),
            events,
        }
    }

    /// Current state.
    pub fn state(&self) -> ProgressState {
        *self.state.lock()
    }

    /// Subscribe to events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.events.subscribe()
    }

    /// Spawn the poller. The first poll happens immediately.
    pub fn start(&self) -> PollerHandle {
        let cancel = CancellationToken::new();
        let mut poller = Poller {
            source: Arc::clone(&self.source),
            stats: Arc::clone(&self.stats),
            state: Arc::clone(&self.state),
            events: self.events.clone(),
            last_seen: ProgressState::Idle,
        };
        let interval = self.interval;
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticks = tokio::time::interval(interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_ms = interval.as_millis(), "progress poller started");
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    () = async {
                        let _ = ticks.tick().await;
                        poller.poll_once().await;
                    } => {}
                }
            }
            debug!("progress poller stopped");
        });

        PollerHandle {
            cancel,
            task: Some(task),
        }
    }
}

/// Running poller. Dropping it stops polling.
#[derive(Debug)]
pub struct PollerHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Stop polling and wait for the task to exit.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    /// Whether the poller task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Poller {
    source: Arc<dyn ProgressSource>,
    stats: Arc<StatsService>,
    state: Arc<Mutex<ProgressState>>,
    events: broadcast::Sender<ProgressEvent>,
    /// Last state reported by the backend, before settling.
    last_seen: ProgressState,
}

impl Poller {
    async fn poll_once(&mut self) {
        let report = match self.source.fetch_progress().await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, category = %e.category(), "progress poll failed");
                self.emit(ProgressEvent::PollFailed(e));
                return;
            }
        };

        let next = ProgressState::from_report(&report);
        let completed = next == ProgressState::Done && self.last_seen != ProgressState::Done;
        self.last_seen = next;

        match next {
            ProgressState::Done if completed => {
                info!("ingestion job finished");
                self.set(ProgressState::Done);
                let stats = self.stats.refresh().await;
                self.emit(ProgressEvent::StatsRefreshed(stats));
                self.set(ProgressState::Idle);
            }
            // a repeated `done` is the same finished job
            ProgressState::Done => {}
            other => self.set(other),
        }
    }

    fn set(&self, next: ProgressState) {
        {
            let mut state = self.state.lock();
            if *state == next {
                return;
            }
            *state = next;
        }
        debug!(state = %next, "progress state changed");
        self.emit(ProgressEvent::State(next));
    }

    fn emit(&self, event: ProgressEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{BackendStatus, StatsSource};
    use mea_transport::http::{AdvancedStats, HealthReport};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays scripted reports, then repeats the last one.
    struct Script {
        reports: Mutex<VecDeque<Result<ProgressReport, ClientError>>>,
        last: Mutex<Option<Result<ProgressReport, ClientError>>>,
        polls: AtomicUsize,
    }

    impl Script {
        fn new(reports: Vec<Result<ProgressReport, ClientError>>) -> Arc<Self> {
            Arc::new(Self {
                reports: Mutex::new(reports.into()),
                last: Mutex::new(None),
                polls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ProgressSource for Script {
        async fn fetch_progress(&self) -> Result<ProgressReport, ClientError> {
            let _ = self.polls.fetch_add(1, Ordering::SeqCst);
            let next = self.reports.lock().pop_front();
            match next {
                Some(report) => {
                    *self.last.lock() = Some(report.clone());
                    report
                }
                None => self
                    .last
                    .lock()
                    .clone()
                    .unwrap_or_else(|| Ok(ProgressReport::default())),
            }
        }
    }

    #[derive(Default)]
    struct CountingStats {
        refreshes: AtomicUsize,
    }

    #[async_trait]
    impl StatsSource for CountingStats {
        async fn fetch_health(&self) -> Result<HealthReport, ClientError> {
            let _ = self.refreshes.fetch_add(1, Ordering::SeqCst);
            Ok(HealthReport {
                status: "ok".into(),
                docs_indexed: 2,
                avgdl: 5.0,
            })
        }
        async fn fetch_advanced(&self) -> Result<AdvancedStats, ClientError> {
            Ok(AdvancedStats::default())
        }
    }

    fn report(status: &str, processed: u64, total: u64) -> Result<ProgressReport, ClientError> {
        Ok(ProgressReport {
            status: status.into(),
            processed,
            total,
        })
    }

    fn tracker(script: Arc<Script>, stats: Arc<CountingStats>) -> ProgressTracker {
        ProgressTracker::new(
            script,
            Arc::new(StatsService::new(stats)),
            Duration::from_secs(1),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn indexing_then_done_settles_to_idle_with_one_refresh() {
        let script = Script::new(vec![
            report("indexing", 1, 2),
            report("indexing", 2, 2),
            report("done", 2, 2),
        ]);
        let stats = Arc::new(CountingStats::default());
        let tracker = tracker(Arc::clone(&script), Arc::clone(&stats));
        let mut events = tracker.subscribe();
        let handle = tracker.start();

        let first = events.recv().await.unwrap();
        assert_eq!(first, ProgressEvent::State(ProgressState::indexing(1, 2)));
        let ProgressEvent::State(state) = first else {
            unreachable!()
        };
        assert_eq!(state.percent(), Some(50));

        let second = events.recv().await.unwrap();
        assert_eq!(second, ProgressEvent::State(ProgressState::indexing(2, 2)));

        assert_eq!(
            events.recv().await.unwrap(),
            ProgressEvent::State(ProgressState::Done)
        );
        let ProgressEvent::StatsRefreshed(refreshed) = events.recv().await.unwrap() else {
            panic!("expected a stats refresh");
        };
        assert_eq!(refreshed.status, BackendStatus::Ready);
        assert_eq!(
            events.recv().await.unwrap(),
            ProgressEvent::State(ProgressState::Idle)
        );
        assert_eq!(tracker.state(), ProgressState::Idle);

        // `done` keeps coming back; it is not a new completion
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(script.polls.load(Ordering::SeqCst) >= 6);
        assert_eq!(stats.refreshes.load(Ordering::SeqCst), 1);
        assert!(events.try_recv().is_err());

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_polls_are_reported_and_polling_continues() {
        let script = Script::new(vec![
            Err(ClientError::Network("refused".into())),
            report("indexing", 3, 4),
        ]);
        let tracker = tracker(script, Arc::new(CountingStats::default()));
        let mut events = tracker.subscribe();
        let _handle = tracker.start();

        assert_eq!(
            events.recv().await.unwrap(),
            ProgressEvent::PollFailed(ClientError::Network("refused".into()))
        );
        assert_eq!(
            events.recv().await.unwrap(),
            ProgressEvent::State(ProgressState::indexing(3, 4))
        );
        assert_eq!(tracker.state().percent(), Some(75));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_poll_is_logged_with_category() {
        let (logs, _guard) = mea_core::logging::capture_logs();
        let script = Script::new(vec![Err(ClientError::Http {
            status: 502,
            message: "bad gateway".into(),
        })]);
        let tracker = tracker(script, Arc::new(CountingStats::default()));
        let mut events = tracker.subscribe();
        let _handle = tracker.start();

        let _ = events.recv().await.unwrap();
        let failure = logs
            .events()
            .into_iter()
            .find(|e| e.message.contains("progress poll failed"))
            .unwrap();
        assert_eq!(failure.level, tracing::Level::WARN);
        assert_eq!(failure.field("category"), Some("server"));
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_state_emits_nothing() {
        let script = Script::new(vec![report("idle", 0, 0)]);
        let tracker = tracker(Arc::clone(&script), Arc::new(CountingStats::default()));
        let mut events = tracker.subscribe();
        let _handle = tracker.start();

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert!(script.polls.load(Ordering::SeqCst) >= 3);
        assert!(events.try_recv().is_err());
        assert_eq!(tracker.state(), ProgressState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_ends_polling() {
        let script = Script::new(vec![]);
        let tracker = tracker(Arc::clone(&script), Arc::new(CountingStats::default()));
        let handle = tracker.start();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        handle.stop().await;
        let polls = script.polls.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(script.polls.load(Ordering::SeqCst), polls);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_polling() {
        let script = Script::new(vec![]);
        let tracker = tracker(Arc::clone(&script), Arc::new(CountingStats::default()));
        drop(tracker.start());
        tokio::time::sleep(Duration::from_secs(1)).await;
        let polls = script.polls.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(polls <= 1);
        assert_eq!(script.polls.load(Ordering::SeqCst), polls);
    }
}
