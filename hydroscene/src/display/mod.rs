//! Display surfaces: registration, heartbeats and liveness.

mod registry;
mod sweeper;
mod types;

pub use registry::{
    DisplayEvent, DisplayRegistry, DisplayRegistryConfig, DEFAULT_HEARTBEAT_TIMEOUT,
    DEFAULT_SWEEP_INTERVAL,
};
pub use sweeper::HeartbeatSweeper;
pub use types::{
    Display, DisplayDescriptor, DisplayId, DisplayStatus, Resolution, WILDCARD_CAPABILITY,
};
