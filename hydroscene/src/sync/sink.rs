//! Delivery of scene updates to display connections.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;

use super::regime::SceneUpdate;
use crate::display::DisplayId;

/// Per-display delivery errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// No live connection for the display.
    #[error("display {0} is not connected")]
    Disconnected(DisplayId),

    /// The display refused the update.
    #[error("display {display} rejected update: {reason}")]
    Rejected { display: DisplayId, reason: String },
}

/// Boxed future returned by [`DisplaySink::deliver`].
pub type DeliveryFuture<'a> = Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + 'a>>;

/// Pushes one update to one display.
pub trait DisplaySink: Send + Sync + 'static {
    fn deliver<'a>(&'a self, display: &'a DisplayId, update: &'a SceneUpdate) -> DeliveryFuture<'a>;
}

/// Shared sink handle.
pub type SharedSink = Arc<dyn DisplaySink>;

/// An update addressed to one display.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressedUpdate {
    pub display: DisplayId,
    pub update: SceneUpdate,
}

/// Sink that publishes addressed updates on a broadcast channel.
///
/// Each display connection subscribes and keeps the updates addressed to
/// it. Delivery fails with [`DeliveryError::Disconnected`] when no
/// connection is subscribed at all.
#[derive(Debug, Clone)]
pub struct BroadcastDisplaySink {
    tx: broadcast::Sender<AddressedUpdate>,
}

impl BroadcastDisplaySink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe a display connection.
    pub fn subscribe(&self) -> broadcast::Receiver<AddressedUpdate> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastDisplaySink {
    fn default() -> Self {
        Self::new(256)
    }
}

impl DisplaySink for BroadcastDisplaySink {
    fn deliver<'a>(&'a self, display: &'a DisplayId, update: &'a SceneUpdate) -> DeliveryFuture<'a> {
        let result = self
            .tx
            .send(AddressedUpdate {
                display: display.clone(),
                update: update.clone(),
            })
            .map(|_| ())
            .map_err(|_| DeliveryError::Disconnected(display.clone()));
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneId;
    use chrono::Utc;

    #[tokio::test]
    async fn test_broadcast_sink_addresses_updates() {
        let sink = BroadcastDisplaySink::default();
        let mut rx = sink.subscribe();
        let update = SceneUpdate::new(SceneId::Emergency, Utc::now());

        sink.deliver(&DisplayId::new("wall-1"), &update).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.display.as_str(), "wall-1");
        assert_eq!(received.update.scene, SceneId::Emergency);
    }

    #[tokio::test]
    async fn test_broadcast_sink_without_connections() {
        let sink = BroadcastDisplaySink::default();
        let update = SceneUpdate::new(SceneId::Normal, Utc::now());

        let err = sink.deliver(&DisplayId::new("wall-1"), &update).await.unwrap_err();
        assert_eq!(err, DeliveryError::Disconnected(DisplayId::new("wall-1")));
    }
}
