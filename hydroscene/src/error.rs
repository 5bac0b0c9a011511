//! Error taxonomy for control-room operations.
//!
//! Every operation exposed to displays and the operator console returns
//! [`ControlError`]. Validation, lookup, capability and permission errors are
//! returned synchronously and never retried. Transition failures are reported
//! to whichever trigger source asked for the transition.
//!
//! Heartbeat timeouts are deliberately absent: a display that stops sending
//! heartbeats becomes [`DisplayStatus::Offline`](crate::display::DisplayStatus)
//! on the next sweep, and a display that misses a broadcast shows up as
//! [`DeliveryOutcome::TimedOut`](crate::sync::DeliveryOutcome) in the
//! delivery report.

use thiserror::Error;

use crate::display::DisplayId;
use crate::layout::LayoutId;
use crate::scene::SceneId;

/// Errors returned by control-room operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControlError {
    /// Malformed input: unknown scene name, bad layout spec, bad confidence, etc.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// No display is registered under this id.
    #[error("Display not found: {0}")]
    DisplayNotFound(DisplayId),

    /// No layout is defined under this id.
    #[error("Layout not found: {0}")]
    LayoutNotFound(LayoutId),

    /// A display assigned to a layout slot does not advertise the layout.
    #[error("Display {display} does not support layout {layout}")]
    IncompatibleDisplay {
        /// The display that failed the capability check.
        display: DisplayId,
        /// The layout being activated.
        layout: LayoutId,
    },

    /// An update came from a display that is not the current master.
    #[error("Display {display} is not the sync master (master: {master})")]
    PermissionDenied {
        /// The display that attempted the update.
        display: DisplayId,
        /// The display currently holding the master role.
        master: DisplayId,
    },

    /// The scene initializer failed or timed out; the snapshot was rolled back.
    #[error("Transition to {target} failed: {reason}")]
    TransitionFailed {
        /// The scene the transition was aiming for.
        target: SceneId,
        /// Human-readable failure cause from the initializer.
        reason: String,
    },

    /// The scene coordinator's request queue is full.
    #[error("Scene coordinator is busy, request dropped")]
    Busy,

    /// The scene coordinator task has stopped and no longer accepts requests.
    #[error("Scene coordinator is not running")]
    Unavailable,
}

impl ControlError {
    /// Convenience constructor for validation errors.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns true if this error left the system state unchanged and
    /// may be corrected by the caller (as opposed to a runtime failure).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::DisplayNotFound(_)
                | Self::LayoutNotFound(_)
                | Self::IncompatibleDisplay { .. }
                | Self::PermissionDenied { .. }
        )
    }
}
