//! Reconnect decisions after an unexpected drop.

use std::time::Duration;

use mea_core::ConnectionState;

/// Decides whether, and after how long, to reconnect once the connection
/// ends without a local `close()`.
pub trait ReconnectPolicy: Send + Sync {
    /// Delay before reconnect attempt number `attempt` (1-based), or `None`
    /// to stay down until an explicit `connect`.
    fn next_delay(&self, attempt: u32, ended: &ConnectionState) -> Option<Duration>;
}

/// Never reconnects automatically.
#[derive(Clone, Copy, Debug, Default)]
pub struct ManualReconnect;

impl ReconnectPolicy for ManualReconnect {
    fn next_delay(&self, _attempt: u32, _ended: &ConnectionState) -> Option<Duration> {
        None
    }
}
