//! Reliable ordered message channel boundary.
//!
//! The transport guarantees in-order, at-least-once delivery within a
//! session. Outbound sends go through this trait; inbound payloads are fed
//! to [`SyncReceiver`](crate::receiver::SyncReceiver) as an mpsc stream of
//! raw bytes by the transport adapter.

use async_trait::async_trait;
use karasync_core::Result;

#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Send a payload to every other session participant.
    ///
    /// # Errors
    ///
    /// Returns an error when the transport rejects the send.
    async fn send(&self, payload: &[u8]) -> Result<()>;
}
