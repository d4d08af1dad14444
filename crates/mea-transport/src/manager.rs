//! Connection lifecycle and request routing.
//!
//! One [`TransportManager`] owns one logical connection, either a WebSocket
//! or the HTTP fallback. The lifecycle is
//! `Idle -> Connecting -> Open -> Closed | Failed(reason)`; a new
//! [`connect`](TransportManager::connect) from any state starts over.
//!
//! Each connect bumps a generation counter. A socket task or HTTP request
//! started under an older generation can neither move the state nor resolve
//! a request after that, so a stale socket never clobbers a fresh one.

use std::sync::{Arc, Weak};
use std::time::Duration;

use mea_core::{ClientError, ConnectionState, QueryRequest, RequestId, SendError};
use mea_settings::{HttpRoute, MeaSettings, TransportKind};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

use crate::channel::QueryChannel;
use crate::http::BackendClient;
use crate::policy::{ManualReconnect, ReconnectPolicy};
use crate::reply::{PendingReply, ReplySender};
use crate::socket::{self, Outbound, SocketExit};

/// Stream of connection state transitions.
pub type StateEvents = mpsc::UnboundedReceiver<ConnectionState>;

/// Stream of connections lost without a local `close` or `connect`.
pub type DropEvents = mpsc::UnboundedReceiver<ClientError>;

/// Static transport configuration.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Channel kind.
    pub kind: TransportKind,
    /// Streaming endpoint (`ws://` or `wss://`).
    pub endpoint: Url,
    /// Query route in HTTP mode.
    pub http_route: HttpRoute,
    /// Result bound for retrieval queries in HTTP mode.
    pub top_k: usize,
    /// Handshake timeout.
    pub connect_timeout: Duration,
}

impl TransportConfig {
    /// Derive the transport configuration from loaded settings.
    pub fn from_settings(settings: &MeaSettings) -> Result<Self, ClientError> {
        let endpoint = settings
            .server
            .ws_url()
            .map_err(|e| ClientError::Validation(e.to_string()))?;
        Ok(Self {
            kind: settings.server.transport,
            endpoint,
            http_route: settings.server.http_route,
            top_k: settings.chat.top_k,
            connect_timeout: Duration::from_millis(settings.server.request_timeout_ms),
        })
    }
}

/// Handle to the single logical connection. Clones share it.
#[derive(Clone)]
pub struct TransportManager {
    inner: Arc<Inner>,
}

struct Inner {
    kind: TransportKind,
    http_route: HttpRoute,
    top_k: usize,
    connect_timeout: Duration,
    backend: BackendClient,
    policy: Arc<dyn ReconnectPolicy>,
    shared: Mutex<Shared>,
}

struct Shared {
    state: ConnectionState,
    generation: u64,
    endpoint: Url,
    link: Link,
    subscribers: Vec<mpsc::UnboundedSender<ConnectionState>>,
    drop_subscribers: Vec<mpsc::UnboundedSender<ClientError>>,
    drops: u32,
}

enum Link {
    Down,
    Socket(mpsc::UnboundedSender<Outbound>),
    Http,
}

impl Shared {
    /// Move to `next`, notifying every live subscriber once.
    fn set(&mut self, next: ConnectionState) {
        if self.state == next {
            return;
        }
        info!(state = %next, generation = self.generation, "transport state changed");
        self.state = next.clone();
        self.subscribers.retain(|tx| tx.send(next.clone()).is_ok());
    }

    /// Detach the current link; a socket is told to close.
    fn drop_link(&mut self) {
        if let Link::Socket(tx) = std::mem::replace(&mut self.link, Link::Down) {
            let _ = tx.send(Outbound::Close);
        }
    }
}

impl TransportManager {
    /// Manager in `Idle`, never reconnecting on its own.
    pub fn new(config: TransportConfig, backend: BackendClient) -> Self {
        Self::with_policy(config, backend, Arc::new(ManualReconnect))
    }

    /// Manager consulting `policy` after unexpected drops.
    pub fn with_policy(
        config: TransportConfig,
        backend: BackendClient,
        policy: Arc<dyn ReconnectPolicy>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                kind: config.kind,
                http_route: config.http_route,
                top_k: config.top_k,
                connect_timeout: config.connect_timeout,
                backend,
                policy,
                shared: Mutex::new(Shared {
                    state: ConnectionState::Idle,
                    generation: 0,
                    endpoint: config.endpoint,
                    link: Link::Down,
                    subscribers: Vec::new(),
                    drop_subscribers: Vec::new(),
                    drops: 0,
                }),
            }),
        }
    }

    /// Channel kind.
    pub fn kind(&self) -> TransportKind {
        self.inner.kind
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.inner.shared.lock().state.clone()
    }

    /// Streaming endpoint used by the next connect.
    pub fn endpoint(&self) -> Url {
        self.inner.shared.lock().endpoint.clone()
    }

    /// REST client used for the HTTP channel and health check.
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Subscribe to every subsequent state transition, in order.
    pub fn subscribe(&self) -> StateEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.shared.lock().subscribers.push(tx);
        rx
    }

    /// Subscribe to unexpected drops of an open socket. Each carries the
    /// [`ClientError::Connection`] describing the loss. A local
    /// [`close`](Self::close) or a fresh connect never reports here.
    pub fn subscribe_drops(&self) -> DropEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.shared.lock().drop_subscribers.push(tx);
        rx
    }

    /// Connect to `endpoint`, replacing the configured one.
    pub async fn connect_to(&self, endpoint: Url) -> Result<(), ClientError> {
        self.inner.shared.lock().endpoint = endpoint;
        self.connect().await
    }

    /// Open the channel. Any previous connection is closed first and its
    /// pending requests fail.
    ///
    /// WebSocket mode performs the handshake (with a bearer header when a
    /// token is available); HTTP mode checks `GET /health`.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let (generation, endpoint) = {
            let mut shared = self.inner.shared.lock();
            shared.generation += 1;
            shared.drop_link();
            shared.set(ConnectionState::Connecting);
            (shared.generation, shared.endpoint.clone())
        };

        match self.inner.kind {
            TransportKind::WebSocket => self.connect_socket(generation, &endpoint).await,
            TransportKind::Http => self.connect_http(generation).await,
        }
    }

    async fn connect_socket(&self, generation: u64, endpoint: &Url) -> Result<(), ClientError> {
        let token = self.inner.backend.tokens().current_token();
        let ws = match socket::open(endpoint, token.as_ref(), self.inner.connect_timeout).await {
            Ok(ws) => ws,
            Err(reason) => {
                warn!(%endpoint, %reason, "websocket handshake failed");
                self.inner.fail_connect(generation, &reason);
                return Err(ClientError::Connection(reason));
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut shared = self.inner.shared.lock();
            if shared.generation != generation {
                return Err(superseded());
            }
            shared.link = Link::Socket(tx);
            shared.drops = 0;
            shared.set(ConnectionState::Open);
        }

        let weak = Arc::downgrade(&self.inner);
        let _ = tokio::spawn(async move {
            let exit = socket::run(ws, rx).await;
            if let Some(inner) = weak.upgrade() {
                Inner::socket_ended(&inner, generation, exit);
            }
        });
        Ok(())
    }

    async fn connect_http(&self, generation: u64) -> Result<(), ClientError> {
        match self.inner.backend.health().await {
            Ok(health) => {
                let mut shared = self.inner.shared.lock();
                if shared.generation != generation {
                    return Err(superseded());
                }
                if !health.is_ok() {
                    warn!(status = %health.status, "backend reachable but not healthy");
                }
                shared.link = Link::Http;
                shared.drops = 0;
                shared.set(ConnectionState::Open);
                Ok(())
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(%reason, "health check failed");
                self.inner.fail_connect(generation, &reason);
                Err(ClientError::Connection(reason))
            }
        }
    }

    /// Close the channel. Pending requests fail with a connection error.
    /// No-op unless `Connecting` or `Open`.
    pub fn close(&self) {
        let mut shared = self.inner.shared.lock();
        if !matches!(
            shared.state,
            ConnectionState::Connecting | ConnectionState::Open
        ) {
            return;
        }
        shared.generation += 1;
        shared.drop_link();
        shared.set(ConnectionState::Closed);
    }

    /// Send `payload` without waiting for a reply.
    pub fn send(&self, payload: &str) -> Result<(), SendError> {
        self.dispatch(payload, None)
    }

    /// Send `text` as a query and return a future for its reply.
    pub fn request(&self, text: &str) -> Result<PendingReply, SendError> {
        let (tx, pending) = PendingReply::pair(RequestId::new());
        self.dispatch_with_id(pending.request_id().clone(), text, Some(tx))?;
        Ok(pending)
    }

    fn dispatch(&self, text: &str, reply: Option<ReplySender>) -> Result<(), SendError> {
        self.dispatch_with_id(RequestId::new(), text, reply)
    }

    fn dispatch_with_id(
        &self,
        id: RequestId,
        text: &str,
        reply: Option<ReplySender>,
    ) -> Result<(), SendError> {
        let shared = self.inner.shared.lock();
        if !shared.state.is_open() {
            debug!(state = %shared.state, "send rejected");
            return Err(SendError::NotReady {
                state: shared.state.clone(),
            });
        }

        match &shared.link {
            Link::Socket(tx) => tx
                .send(Outbound::Request {
                    id,
                    text: text.to_string(),
                    reply,
                })
                .map_err(|_| SendError::ChannelClosed),
            Link::Http => {
                self.spawn_http_query(shared.generation, id, text.to_string(), reply);
                Ok(())
            }
            Link::Down => Err(SendError::NotReady {
                state: shared.state.clone(),
            }),
        }
    }

    fn spawn_http_query(
        &self,
        generation: u64,
        id: RequestId,
        text: String,
        reply: Option<ReplySender>,
    ) {
        let backend = self.inner.backend.clone();
        let route = self.inner.http_route;
        let top_k = self.inner.top_k;
        let weak = Arc::downgrade(&self.inner);

        let _ = tokio::spawn(async move {
            let result = match route {
                HttpRoute::Retrieval => {
                    backend
                        .query(&QueryRequest::new(text).with_top_k(top_k))
                        .await
                }
                HttpRoute::Assistant => backend.assistant_query(&text).await,
            };
            let result = if Inner::is_current(&weak, generation) {
                result
            } else {
                Err(ClientError::Connection("connection closed".into()))
            };
            match reply {
                Some(tx) => {
                    let _ = tx.send(result);
                }
                None => {
                    if let Err(e) = result {
                        warn!(request_id = %id, error = %e, "fire-and-forget query failed");
                    }
                }
            }
        });
    }
}

impl QueryChannel for TransportManager {
    fn connection_state(&self) -> ConnectionState {
        self.state()
    }

    fn request(&self, text: &str) -> Result<PendingReply, SendError> {
        Self::request(self, text)
    }
}

impl Inner {
    fn is_current(weak: &Weak<Self>, generation: u64) -> bool {
        weak.upgrade()
            .is_some_and(|inner| inner.shared.lock().generation == generation)
    }

    fn fail_connect(&self, generation: u64, reason: &str) {
        let mut shared = self.shared.lock();
        if shared.generation == generation {
            shared.set(ConnectionState::Failed(reason.to_string()));
        }
    }

    fn socket_ended(inner: &Arc<Self>, generation: u64, exit: SocketExit) {
        let (next, lost) = match exit {
            SocketExit::Failed(reason) => (
                ConnectionState::Failed(reason.clone()),
                Some(ClientError::Connection(reason)),
            ),
            SocketExit::PeerClosed => (
                ConnectionState::Closed,
                Some(ClientError::Connection("the server closed the connection".into())),
            ),
            SocketExit::Local => (ConnectionState::Closed, None),
        };

        let delay = {
            let mut shared = inner.shared.lock();
            if shared.generation != generation {
                debug!(generation, "stale socket ended");
                return;
            }
            shared.link = Link::Down;
            shared.set(next.clone());
            if let Some(err) = lost {
                warn!(error = %err, "connection lost");
                shared.drop_subscribers.retain(|tx| tx.send(err.clone()).is_ok());
            }
            shared.drops += 1;
            inner.policy.next_delay(shared.drops, &next)
        };

        if let Some(delay) = delay {
            info!(delay_ms = delay.as_millis(), "scheduling reconnect");
            let manager = TransportManager {
                inner: Arc::clone(inner),
            };
            let _ = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                // a manual connect or close in the meantime wins
                if manager.inner.shared.lock().generation != generation {
                    return;
                }
                if let Err(e) = manager.connect().await {
                    warn!(error = %e, "reconnect failed");
                }
            });
        }
    }
}

fn superseded() -> ClientError {
    ClientError::Connection("connection attempt superseded".into())
}
