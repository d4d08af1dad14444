//! Streaming connection: handshake, socket task, reply correlation.
//!
//! Only the socket task writes to the WebSocket. Callers hand it
//! [`Outbound`] commands over an unbounded channel; replies are routed back
//! through per-request oneshots held in [`PendingReplies`].

use std::collections::VecDeque;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use mea_auth::AuthToken;
use mea_core::query::decode_reply_value;
use mea_core::{ClientError, Reply, RequestId};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};
use url::Url;

use crate::reply::ReplySender;

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Command for the socket task.
pub(crate) enum Outbound {
    /// Send a query. `reply` is `None` for fire-and-forget sends.
    Request {
        id: RequestId,
        text: String,
        reply: Option<ReplySender>,
    },
    /// Close cleanly and exit.
    Close,
}

/// Wire form of an outgoing query.
#[derive(Serialize)]
struct OutboundFrame<'a> {
    text: &'a str,
    request_id: &'a RequestId,
}

/// How the socket task ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum SocketExit {
    /// `Outbound::Close` received or every sender dropped.
    Local,
    /// The peer closed the connection.
    PeerClosed,
    /// Read or write error.
    Failed(String),
}

/// Perform the WebSocket handshake, with a bearer header when `token` is set.
pub(crate) async fn open(
    url: &Url,
    token: Option<&AuthToken>,
    timeout: Duration,
) -> Result<WsStream, String> {
    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| e.to_string())?;
    if let Some(token) = token {
        let value = HeaderValue::from_str(&token.bearer())
            .map_err(|e| format!("invalid authorization header: {e}"))?;
        let _ = request.headers_mut().insert(AUTHORIZATION, value);
    }

    match tokio::time::timeout(timeout, connect_async(request)).await {
        Ok(Ok((ws, _response))) => Ok(ws),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("handshake timed out after {}ms", timeout.as_millis())),
    }
}

/// Drive the socket until it closes. Every request still pending at exit
/// resolves with a connection error.
pub(crate) async fn run(ws: WsStream, mut outbound: mpsc::UnboundedReceiver<Outbound>) -> SocketExit {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let mut pending = PendingReplies::default();

    let exit = loop {
        tokio::select! {
            cmd = outbound.recv() => match cmd {
                None | Some(Outbound::Close) => {
                    let _ = ws_tx.close().await;
                    break SocketExit::Local;
                }
                Some(Outbound::Request { id, text, reply }) => {
                    let frame = OutboundFrame { text: &text, request_id: &id };
                    let encoded = match serde_json::to_string(&frame) {
                        Ok(s) => s,
                        Err(e) => {
                            deliver(reply, Err(ClientError::Decode(e.to_string())));
                            continue;
                        }
                    };
                    pending.push(id, reply);
                    if let Err(e) = ws_tx.send(Message::Text(encoded.into())).await {
                        break SocketExit::Failed(e.to_string());
                    }
                }
            },
            msg = ws_rx.next() => match msg {
                None => break SocketExit::PeerClosed,
                Some(Err(e)) => break SocketExit::Failed(e.to_string()),
                Some(Ok(Message::Text(text))) => pending.resolve(text.as_str()),
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "peer closed the socket");
                    break SocketExit::PeerClosed;
                }
                Some(Ok(_)) => {}
            }
        }
    };

    let reason = match &exit {
        SocketExit::Failed(reason) => reason.clone(),
        SocketExit::Local | SocketExit::PeerClosed => "connection closed".to_string(),
    };
    pending.fail_all(&reason);
    exit
}

fn deliver(reply: Option<ReplySender>, result: Result<Reply, ClientError>) {
    match reply {
        Some(tx) => {
            let _ = tx.send(result);
        }
        None => debug!("reply to fire-and-forget send discarded"),
    }
}

/// Requests awaiting a reply, oldest first.
///
/// A reply echoing `request_id` resolves that request; a reply without one
/// resolves the oldest.
#[derive(Default)]
pub(crate) struct PendingReplies {
    queue: VecDeque<(RequestId, Option<ReplySender>)>,
}

impl PendingReplies {
    pub(crate) fn push(&mut self, id: RequestId, reply: Option<ReplySender>) {
        self.queue.push_back((id, reply));
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    fn take(&mut self, id: &RequestId) -> Option<(RequestId, Option<ReplySender>)> {
        let idx = self.queue.iter().position(|(pending, _)| pending == id)?;
        self.queue.remove(idx)
    }

    /// Route one inbound frame.
    pub(crate) fn resolve(&mut self, text: &str) {
        let value: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                // no id to match on; the oldest request owns it
                match self.queue.pop_front() {
                    Some((id, reply)) => {
                        warn!(request_id = %id, error = %e, "undecodable reply");
                        deliver(reply, Err(ClientError::Decode(e.to_string())));
                    }
                    None => warn!(error = %e, "undecodable unsolicited frame dropped"),
                }
                return;
            }
        };

        let echoed = value
            .get("request_id")
            .and_then(Value::as_str)
            .map(RequestId::from);
        let entry = match &echoed {
            Some(id) => self.take(id),
            None => self.queue.pop_front(),
        };
        let Some((id, reply)) = entry else {
            warn!(request_id = ?echoed, "unsolicited reply dropped");
            return;
        };

        debug!(request_id = %id, matched_by_id = echoed.is_some(), "reply received");
        deliver(reply, decode_reply_value(value));
    }

    /// Resolve everything still pending with a connection error.
    pub(crate) fn fail_all(&mut self, reason: &str) {
        for (id, reply) in self.queue.drain(..) {
            if let Some(tx) = reply {
                debug!(request_id = %id, "failing pending request");
                let _ = tx.send(Err(ClientError::Connection(reason.to_string())));
            }
        }
    }
}
