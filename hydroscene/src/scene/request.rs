//! Transition request and response types.
//!
//! Every trigger source (operator, threshold monitor, suggestion arbiter,
//! playlist) talks to the scene coordinator with the same message:
//!
//! ```text
//! ┌──────────────┐
//! │ Operator     │──┐
//! ├──────────────┤  │
//! │ Threshold    │──┤                       ┌───────────────────┐
//! ├──────────────┤  ├─► TransitionRequest ─►│ SceneCoordinator  │
//! │ Suggestion   │──┤     (bounded mpsc)    │ (single writer)   │
//! ├──────────────┤  │                       └─────────┬─────────┘
//! │ Playlist     │──┘                                 │
//! └──────────────┘       ◄──── TransitionResult ──────┘
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::snapshot::SceneSnapshot;
use super::types::{SceneId, Viewport};
use crate::display::DisplayId;
use crate::error::ControlError;

/// Which trigger source asked for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionOrigin {
    /// Operator action on the console or a display.
    Manual,
    /// Critical threshold alert.
    Threshold,
    /// Advisory service proposal.
    Suggestion,
    /// Playlist auto-advance.
    Playlist,
}

impl fmt::Display for TransitionOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionOrigin::Manual => write!(f, "manual"),
            TransitionOrigin::Threshold => write!(f, "threshold"),
            TransitionOrigin::Suggestion => write!(f, "suggestion"),
            TransitionOrigin::Playlist => write!(f, "playlist"),
        }
    }
}

/// Extra information carried along with a transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionContext {
    /// Viewport to show after the transition; scene default if `None`.
    pub viewport: Option<Viewport>,
    /// Free-form reason recorded in the audit trail.
    pub reason: Option<String>,
    /// Display that initiated the change, if it came from a wall screen.
    pub originating_display: Option<DisplayId>,
}

impl TransitionContext {
    /// Context with only a reason.
    pub fn because(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Set the viewport.
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }

    /// Mark the change as coming from a display.
    pub fn from_display(mut self, display: DisplayId) -> Self {
        self.originating_display = Some(display);
        self
    }
}

/// Successful result of a transition request.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// The scene changed; carries the newly committed snapshot.
    Committed(SceneSnapshot),
    /// Target was already current; nothing ran and `entered_at` is unchanged.
    Unchanged(SceneSnapshot),
}

impl TransitionOutcome {
    /// The snapshot after the request was handled.
    pub fn snapshot(&self) -> &SceneSnapshot {
        match self {
            TransitionOutcome::Committed(s) | TransitionOutcome::Unchanged(s) => s,
        }
    }

    /// Returns true if the scene changed.
    pub fn is_committed(&self) -> bool {
        matches!(self, TransitionOutcome::Committed(_))
    }
}

/// Reply sent back to the requester.
pub type TransitionResult = Result<TransitionOutcome, ControlError>;

/// Message sent to the scene coordinator.
pub struct TransitionRequest {
    /// Scene to switch to.
    pub target: SceneId,
    /// Trigger source.
    pub origin: TransitionOrigin,
    /// Viewport, reason and originating display.
    pub context: TransitionContext,
    /// When the request was created.
    pub requested_at: DateTime<Utc>,
    /// Reply channel; dropped receivers are tolerated.
    pub response_tx: Option<oneshot::Sender<TransitionResult>>,
}

impl TransitionRequest {
    /// Create a request together with the receiver for its reply.
    pub fn new(
        target: SceneId,
        origin: TransitionOrigin,
        context: TransitionContext,
        requested_at: DateTime<Utc>,
    ) -> (Self, oneshot::Receiver<TransitionResult>) {
        let (tx, rx) = oneshot::channel();
        let request = Self {
            target,
            origin,
            context,
            requested_at,
            response_tx: Some(tx),
        };
        (request, rx)
    }

    /// Deliver the reply, ignoring requesters that stopped waiting.
    pub fn respond(&mut self, result: TransitionResult) {
        if let Some(tx) = self.response_tx.take() {
            let _ = tx.send(result);
        }
    }
}

impl fmt::Debug for TransitionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionRequest")
            .field("target", &self.target)
            .field("origin", &self.origin)
            .field("context", &self.context)
            .field("requested_at", &self.requested_at)
            .field("has_response_channel", &self.response_tx.is_some())
            .finish()
    }
}
