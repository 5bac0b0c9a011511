//! Propagation of scene state to the display wall.

mod coordinator;
mod regime;
mod sink;

pub use coordinator::{
    DeliveryOutcome, DeliveryReport, SlotDelivery, SyncConfig, SyncCoordinator,
    DEFAULT_DELIVERY_RETRIES, DEFAULT_DELIVERY_TIMEOUT,
};
pub use regime::{SceneUpdate, SyncRegime, SyncState};
pub use sink::{
    AddressedUpdate, BroadcastDisplaySink, DeliveryError, DeliveryFuture, DisplaySink, SharedSink,
};
