//! Suggestion arbiter.
//!
//! The advisory service pushes [`SuggestionProposal`]s. The arbiter applies
//! a confidence policy:
//!
//! - `ai_suggestions` off: the proposal is dropped.
//! - confidence at or above the auto-apply threshold and `auto_switch_scenes`
//!   on: the scene switches immediately.
//! - otherwise: the proposal becomes the single pending proposal, replacing
//!   any unacknowledged one, until the operator accepts or rejects it.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ControlError;
use crate::notify::{ControlNotice, NoticeBus};
use crate::preferences::SharedPreferences;
use crate::scene::{SceneHandle, SceneId, TransitionContext, TransitionOrigin, TransitionOutcome};

/// Default confidence at which proposals are applied without asking.
pub const DEFAULT_AUTO_APPLY_CONFIDENCE: f64 = 0.9;

/// A scene switch proposed by the advisory service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionProposal {
    pub target_scene: SceneId,
    pub rationale: String,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

impl SuggestionProposal {
    pub fn new(
        target_scene: SceneId,
        rationale: impl Into<String>,
        confidence: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            target_scene,
            rationale: rationale.into(),
            confidence,
            timestamp,
        }
    }

    pub fn validate(&self) -> Result<(), ControlError> {
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(ControlError::validation(format!(
                "suggestion confidence {} is outside [0, 1]",
                self.confidence
            )));
        }
        Ok(())
    }
}

/// What the arbiter did with a proposal.
#[derive(Debug, Clone, PartialEq)]
pub enum ArbiterDecision {
    /// Suggestions are disabled.
    Dropped,
    /// Applied immediately.
    Applied(TransitionOutcome),
    /// Stored for the operator; carries the proposal it displaced.
    Pending { replaced: Option<SuggestionProposal> },
}

/// Arbiter settings.
#[derive(Debug, Clone)]
pub struct ArbiterConfig {
    pub auto_apply_confidence: f64,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            auto_apply_confidence: DEFAULT_AUTO_APPLY_CONFIDENCE,
        }
    }
}

/// Applies the confidence policy to advisory proposals.
pub struct SuggestionArbiter {
    config: ArbiterConfig,
    scenes: SceneHandle,
    preferences: SharedPreferences,
    notices: NoticeBus,
    pending: Mutex<Option<SuggestionProposal>>,
}

impl SuggestionArbiter {
    pub fn new(
        config: ArbiterConfig,
        scenes: SceneHandle,
        preferences: SharedPreferences,
        notices: NoticeBus,
    ) -> Self {
        Self {
            config,
            scenes,
            preferences,
            notices,
            pending: Mutex::new(None),
        }
    }

    /// Handle one proposal.
    pub async fn submit(&self, proposal: SuggestionProposal) -> Result<ArbiterDecision, ControlError> {
        proposal.validate()?;

        if !self.preferences.ai_suggestions() {
            debug!(target = %proposal.target_scene, "Suggestions disabled, proposal dropped");
            return Ok(ArbiterDecision::Dropped);
        }

        let auto_apply = proposal.confidence >= self.config.auto_apply_confidence
            && self.preferences.auto_switch_scenes();

        if !auto_apply {
            let replaced = self
                .pending
                .lock()
                .ok()
                .and_then(|mut pending| pending.replace(proposal.clone()));
            info!(
                target = %proposal.target_scene,
                confidence = proposal.confidence,
                replaced = replaced.is_some(),
                "Suggestion pending operator confirmation"
            );
            self.notices
                .publish(ControlNotice::SuggestionPending(proposal));
            return Ok(ArbiterDecision::Pending { replaced });
        }

        // A newer proposal supersedes whatever was waiting.
        if let Ok(mut pending) = self.pending.lock() {
            pending.take();
        }

        info!(
            target = %proposal.target_scene,
            confidence = proposal.confidence,
            "Applying high-confidence suggestion"
        );
        let outcome = self.apply(&proposal).await?;
        self.notices.publish(ControlNotice::SuggestionApplied {
            scene: proposal.target_scene,
            confidence: proposal.confidence,
        });
        Ok(ArbiterDecision::Applied(outcome))
    }

    /// Apply the pending proposal and clear it.
    pub async fn accept_pending(&self) -> Result<TransitionOutcome, ControlError> {
        let proposal = self
            .pending
            .lock()
            .ok()
            .and_then(|mut pending| pending.take())
            .ok_or_else(|| ControlError::validation("no suggestion is pending"))?;

        info!(target = %proposal.target_scene, "Operator accepted suggestion");
        self.apply(&proposal).await
    }

    /// Discard the pending proposal without switching.
    pub fn reject_pending(&self) -> Option<SuggestionProposal> {
        let rejected = self.pending.lock().ok().and_then(|mut p| p.take());
        if let Some(proposal) = &rejected {
            info!(target = %proposal.target_scene, "Operator rejected suggestion");
        }
        rejected
    }

    pub fn pending(&self) -> Option<SuggestionProposal> {
        self.pending.lock().ok().and_then(|p| p.clone())
    }

    async fn apply(&self, proposal: &SuggestionProposal) -> Result<TransitionOutcome, ControlError> {
        let context = TransitionContext::because(proposal.rationale.clone());
        match self
            .scenes
            .transition(proposal.target_scene, TransitionOrigin::Suggestion, context)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(target = %proposal.target_scene, error = %e, "Suggestion could not be applied");
                // A proposal submitted while the transition ran stays pending
                if let Ok(mut pending) = self.pending.lock() {
                    if pending.as_ref() == Some(proposal) {
                        pending.take();
                    }
                }
                self.notices.publish(ControlNotice::SuggestionFailed {
                    target: proposal.target_scene,
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Create a feed for the advisory service.
    pub fn feed(capacity: usize) -> (AdvisoryFeed, mpsc::Receiver<SuggestionProposal>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (AdvisoryFeed { tx }, rx)
    }

    /// Handle pushed proposals until shutdown or until the feed closes.
    pub async fn run(
        self: Arc<Self>,
        mut rx: mpsc::Receiver<SuggestionProposal>,
        shutdown: CancellationToken,
    ) {
        info!(
            auto_apply_confidence = self.config.auto_apply_confidence,
            "Suggestion arbiter starting"
        );

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Suggestion arbiter shutting down");
                    break;
                }

                proposal = rx.recv() => {
                    let Some(proposal) = proposal else {
                        debug!("Suggestion arbiter stopped (feed closed)");
                        break;
                    };
                    match self.submit(proposal).await {
                        Ok(decision) => debug!(?decision, "Suggestion handled"),
                        Err(e) => warn!(error = %e, "Suggestion rejected"),
                    }
                }
            }
        }
    }
}

/// Sender side of the advisory push channel.
#[derive(Debug, Clone)]
pub struct AdvisoryFeed {
    tx: mpsc::Sender<SuggestionProposal>,
}

impl AdvisoryFeed {
    /// Queue a proposal. Returns false if the arbiter is backed up or gone.
    pub fn push(&self, proposal: SuggestionProposal) -> bool {
        match self.tx.try_send(proposal) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Advisory feed rejected proposal");
                false
            }
        }
    }
}
