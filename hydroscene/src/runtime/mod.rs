//! Runtime for the control-room core.
//!
//! The runtime owns every component and background task. Trigger sources
//! never touch the scene snapshot directly: they hold a
//! [`SceneHandle`](crate::scene::SceneHandle) and send requests to the
//! single coordinator task.
//!
//! # Tasks
//!
//! | Task | Input | Output |
//! |------|-------|--------|
//! | Scene coordinator | `TransitionRequest` (mpsc) | snapshot (watch), `SceneEvent` (broadcast) |
//! | Heartbeat sweeper | fixed interval | `DisplayEvent` (broadcast) |
//! | Scene relay | `SceneEvent`, `DisplayEvent` | sync dispatch, resync, durable state |
//! | Threshold monitor | `MetricBatch` (mpsc) | alerts, emergency transitions |
//! | Suggestion arbiter | `SuggestionProposal` (mpsc) | suggestion transitions, pending slot |
//!
//! The playlist player spawns its own timer task while running.
//!
//! All tasks share one `CancellationToken`; [`ControlRoomRuntime::shutdown`]
//! cancels it and waits for every task before saving the final state.

mod health;
mod orchestrator;

pub use health::{ControlHealth, HealthSnapshot, HealthStatus, SharedControlHealth};
pub use orchestrator::{ControlRoomRuntime, RuntimeConfig, DEFAULT_ADVISORY_CAPACITY};
