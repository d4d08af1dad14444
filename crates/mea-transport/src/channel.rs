//! Seam between the chat layer and whichever transport carries queries.

use mea_core::{ConnectionState, SendError};

use crate::reply::PendingReply;

/// Something that can carry a query and hand back its reply.
pub trait QueryChannel: Send + Sync {
    /// Current connection state.
    fn connection_state(&self) -> ConnectionState;

    /// Send `text` and return a future for its reply. Fails immediately
    /// unless the channel is open.
    fn request(&self, text: &str) -> Result<PendingReply, SendError>;
}
