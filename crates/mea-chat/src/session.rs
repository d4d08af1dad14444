//! One operator session and everything it owns.

use std::sync::Arc;
use std::time::Duration;

use mea_auth::{AuthClient, TokenProvider, TokenStore};
use mea_core::{ClientError, Message};
use mea_settings::MeaSettings;
use mea_transport::{
    BackendClient, DropEvents, QueryChannel, TransportConfig, TransportManager,
};
use parking_lot::Mutex;
use tracing::info;

use crate::dispatcher::{MessageDispatcher, SubmitStatus};
use crate::ingest::Ingestor;
use crate::progress::{PollerHandle, ProgressTracker};
use crate::stats::StatsService;
use crate::training::Trainer;
use crate::transcript::Transcript;

/// Session wiring built from settings and a token store.
///
/// Nothing here is global: build one per operator and hand it to the
/// adapter. [`shutdown`](Self::shutdown) stops the poller and closes the
/// transport. Once connected, a connection the server drops shows up in
/// the transcript as an error message.
pub struct ChatSession {
    settings: MeaSettings,
    backend: BackendClient,
    transport: TransportManager,
    transcript: Transcript,
    dispatcher: MessageDispatcher,
    stats: Arc<StatsService>,
    progress: ProgressTracker,
    poller: Mutex<Option<PollerHandle>>,
    drops: Mutex<Option<DropEvents>>,
    ingestor: Ingestor,
    trainer: Trainer,
    auth: AuthClient,
}

impl ChatSession {
    /// Build a session. Nothing connects until [`connect`](Self::connect).
    pub fn new<S>(settings: MeaSettings, store: Arc<S>) -> Result<Self, ClientError>
    where
        S: TokenStore + 'static,
    {
        let base = settings
            .server
            .base()
            .map_err(|e| ClientError::Validation(e.to_string()))?;
        let timeout = Duration::from_millis(settings.server.request_timeout_ms);

        let tokens: Arc<dyn TokenProvider> = Arc::clone(&store) as Arc<dyn TokenProvider>;
        let backend = BackendClient::new(base.clone(), timeout, tokens)?;
        let auth = AuthClient::new(backend.http().clone(), base, store);

        let transport =
            TransportManager::new(TransportConfig::from_settings(&settings)?, backend.clone());
        let transcript = Transcript::new();
        let channel: Arc<dyn QueryChannel> = Arc::new(transport.clone());
        let dispatcher = MessageDispatcher::new(channel, transcript.clone())
            .with_typing_interval(Duration::from_millis(settings.chat.typing_interval_ms))
            .with_reply_timeout(timeout);

        let stats = Arc::new(StatsService::new(Arc::new(backend.clone())));
        let progress = ProgressTracker::new(
            Arc::new(backend.clone()),
            Arc::clone(&stats),
            Duration::from_millis(settings.progress.poll_interval_ms),
        );

        Ok(Self {
            ingestor: Ingestor::new(backend.clone(), transcript.clone()),
            trainer: Trainer::new(backend.clone()),
            settings,
            backend,
            drops: Mutex::new(Some(transport.subscribe_drops())),
            transport,
            transcript,
            dispatcher,
            stats,
            progress,
            poller: Mutex::new(None),
            auth,
        })
    }

    /// Settings the session was built from.
    pub fn settings(&self) -> &MeaSettings {
        &self.settings
    }

    /// REST client.
    pub fn backend(&self) -> &BackendClient {
        &self.backend
    }

    /// The connection.
    pub fn transport(&self) -> &TransportManager {
        &self.transport
    }

    /// Conversation history.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Query submission.
    pub fn dispatcher(&self) -> &MessageDispatcher {
        &self.dispatcher
    }

    /// Backend stats.
    pub fn stats(&self) -> &StatsService {
        &self.stats
    }

    /// Ingestion progress.
    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    /// Document ingestion.
    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    /// Training signals.
    pub fn trainer(&self) -> &Trainer {
        &self.trainer
    }

    /// Login, registration and logout.
    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    /// Connect the transport. A failure is also recorded in the transcript.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.watch_drops();
        match self.transport.connect().await {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = self.transcript.append(Message::error(e.user_message()));
                Err(e)
            }
        }
    }

    /// Report unexpected disconnects in the transcript. Runs once per session.
    fn watch_drops(&self) {
        let Some(mut drops) = self.drops.lock().take() else {
            return;
        };
        let transcript = self.transcript.clone();
        drop(tokio::spawn(async move {
            while let Some(err) = drops.recv().await {
                let _ = transcript.append(Message::error(err.user_message()));
            }
        }));
    }

    /// Submit operator input.
    pub fn submit(&self, text: &str) -> SubmitStatus {
        self.dispatcher.submit(text)
    }

    /// Start progress polling. No-op if already running.
    pub fn start_progress(&self) {
        let mut poller = self.poller.lock();
        if poller.as_ref().is_some_and(|p| !p.is_finished()) {
            return;
        }
        *poller = Some(self.progress.start());
    }

    /// Stop polling and close the connection.
    pub async fn shutdown(&self) {
        let poller = self.poller.lock().take();
        if let Some(poller) = poller {
            poller.stop().await;
        }
        self.transport.close();
        info!("session shut down");
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("backend", &self.backend)
            .field("state", &self.transport.state())
            .finish_non_exhaustive()
    }
}
