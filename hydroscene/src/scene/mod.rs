//! Operating scenes and the scene state machine.
//!
//! - [`types`] - Scene ids, definitions and the static registry
//! - [`machine`] - Single-writer coordinator and its handle
//! - [`loader`] - Scene initializer abstraction

mod loader;
mod machine;
mod request;
mod snapshot;
mod types;

pub use loader::{
    LoadFuture, LoaderError, SceneContext, SceneContextLoader, SharedLoader, StaticSceneLoader,
};
pub use machine::{
    RecordOutcome, SceneCoordinator, SceneCoordinatorConfig, SceneEvent, SceneHandle,
    TransitionRecord, DEFAULT_AUDIT_CAPACITY, DEFAULT_INITIALIZER_TIMEOUT,
    DEFAULT_REQUEST_CAPACITY,
};
pub use request::{
    TransitionContext, TransitionOrigin, TransitionOutcome, TransitionRequest, TransitionResult,
};
pub use snapshot::SceneSnapshot;
pub use types::{LayerVisibility, Scene, SceneId, SceneRegistry, ViewKind, Viewport};
