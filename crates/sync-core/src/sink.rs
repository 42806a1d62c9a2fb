//! Trait seam for the outbound event transport.

use crate::SyncError;
use async_trait::async_trait;

/// Transport that accepts serialized events for asynchronous delivery.
///
/// `Ok` from [`EventTransport::submit`] means the transport acknowledged
/// the submission, not that a consumer received the event; end-to-end
/// delivery is the transport's redelivery contract (at-least-once).
#[async_trait]
pub trait EventTransport: Send + Sync {
    /// Submit one event payload for delivery.
    async fn submit(&self, payload: Vec<u8>) -> Result<(), SyncError>;

    /// Release the underlying connection. Invoked once when the sync loop
    /// terminates.
    async fn shutdown(&self) -> Result<(), SyncError>;
}
