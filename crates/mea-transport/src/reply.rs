//! Future resolving to the reply of one request.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use mea_core::{ClientError, Reply, RequestId};
use tokio::sync::oneshot;

/// Sending half held by whoever will produce the reply.
pub type ReplySender = oneshot::Sender<Result<Reply, ClientError>>;

/// Reply of an in-flight request.
///
/// Resolves with [`ClientError::Connection`] if the connection is dropped
/// or replaced before the reply arrives.
#[derive(Debug)]
pub struct PendingReply {
    id: RequestId,
    rx: oneshot::Receiver<Result<Reply, ClientError>>,
}

impl PendingReply {
    /// A connected sender/future pair for request `id`.
    pub fn pair(id: RequestId) -> (ReplySender, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { id, rx })
    }

    /// Correlation id sent with the request.
    pub fn request_id(&self) -> &RequestId {
        &self.id
    }
}

impl Future for PendingReply {
    type Output = Result<Reply, ClientError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|result| {
            result.unwrap_or_else(|_| {
                Err(ClientError::Connection(
                    "connection closed before a reply arrived".into(),
                ))
            })
        })
    }
}
