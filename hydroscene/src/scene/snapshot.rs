//! The shared scene snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::SceneId;

/// Point-in-time view of the scene state machine.
///
/// Snapshots are only produced by the scene coordinator. The `current` and
/// `previous` fields always describe the last fully committed transition;
/// while an initializer is running the coordinator republishes the same
/// committed values with `transition_in_progress` raised, so observers never
/// see a half-applied scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    /// Scene currently shown.
    pub current: SceneId,
    /// Scene shown before the last committed transition.
    pub previous: Option<SceneId>,
    /// Raised while a transition initializer is running.
    #[serde(skip)]
    pub transition_in_progress: bool,
    /// When `current` was entered.
    pub entered_at: DateTime<Utc>,
}

impl SceneSnapshot {
    /// Initial state: `normal`, no history.
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            current: SceneId::Normal,
            previous: None,
            transition_in_progress: false,
            entered_at: now,
        }
    }

    /// Snapshot produced by committing a transition to `target`.
    pub fn committed(&self, target: SceneId, now: DateTime<Utc>) -> Self {
        Self {
            current: target,
            previous: Some(self.current),
            transition_in_progress: false,
            entered_at: now,
        }
    }

    /// Same committed values with the in-progress flag set.
    pub fn transitioning(&self) -> Self {
        Self {
            transition_in_progress: true,
            ..self.clone()
        }
    }

    /// Same committed values with the in-progress flag cleared.
    pub fn stable(&self) -> Self {
        Self {
            transition_in_progress: false,
            ..self.clone()
        }
    }

    /// Only stable reads are authoritative for observers.
    pub fn is_stable(&self) -> bool {
        !self.transition_in_progress
    }
}
