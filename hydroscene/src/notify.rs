//! Operator notification channel.
//!
//! Components publish [`ControlNotice`]s on a shared [`NoticeBus`]; the
//! operator console and display connections subscribe. Notices are
//! fire-and-forget: with no subscribers they are dropped.

use tokio::sync::broadcast;
use tracing::debug;

use crate::display::DisplayId;
use crate::scene::{SceneId, TransitionOrigin};
use crate::suggestion::SuggestionProposal;
use crate::threshold::ThresholdAlert;

/// Default capacity of the notice channel.
pub const DEFAULT_NOTICE_CAPACITY: usize = 128;

/// Something the operator should be told about.
#[derive(Debug, Clone)]
pub enum ControlNotice {
    /// A threshold rule matched.
    AlertFired(ThresholdAlert),
    /// A suggestion is waiting for operator confirmation.
    SuggestionPending(SuggestionProposal),
    /// A high-confidence suggestion was applied automatically.
    SuggestionApplied {
        /// Scene switched to.
        scene: SceneId,
        /// Confidence of the proposal.
        confidence: f64,
    },
    /// Applying a suggestion failed; the pending slot was cleared.
    SuggestionFailed {
        /// Scene the suggestion targeted.
        target: SceneId,
        /// Failure cause.
        reason: String,
    },
    /// A scene transition was rolled back.
    TransitionFailed {
        /// Scene the transition aimed for.
        target: SceneId,
        /// Trigger source.
        origin: TransitionOrigin,
        /// Failure cause.
        reason: String,
    },
    /// A display missed its heartbeat window.
    DisplayOffline(DisplayId),
    /// An offline display sent a heartbeat again.
    DisplayRecovered(DisplayId),
    /// Master/slave synchronization reverted to independent.
    RegimeFallback {
        /// The master that was lost.
        master: DisplayId,
        /// Why the regime fell back.
        reason: String,
    },
    /// A broadcast did not reach every slot of the active layout.
    DeliveryIncomplete {
        /// Scene that was broadcast.
        scene: SceneId,
        /// Human-readable summary, e.g. "3/4 screens updated".
        summary: String,
    },
}

/// Broadcast bus for operator notices.
#[derive(Debug, Clone)]
pub struct NoticeBus {
    tx: broadcast::Sender<ControlNotice>,
}

impl Default for NoticeBus {
    fn default() -> Self {
        Self::new(DEFAULT_NOTICE_CAPACITY)
    }
}

impl NoticeBus {
    /// Create a bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish a notice. Never blocks; dropped if nobody listens.
    pub fn publish(&self, notice: ControlNotice) {
        debug!(?notice, "Publishing operator notice");
        let _ = self.tx.send(notice);
    }

    /// Subscribe to notices published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ControlNotice> {
        self.tx.subscribe()
    }
}
