//! Operator preferences.
//!
//! Three switches govern automatic behavior:
//!
//! | Flag                 | Effect when off                                   |
//! |----------------------|---------------------------------------------------|
//! | `auto_switch_scenes` | Critical alerts no longer force the emergency scene |
//! | `ai_suggestions`     | Advisory proposals are dropped                    |
//! | `threshold_alerts`   | Metric batches are not evaluated at all           |
//!
//! [`SharedPreferences`] is read on every evaluation, so changes apply to the
//! next batch or proposal without restarting anything.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Plain preference values, as configured or persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Allow critical alerts to switch to the emergency scene.
    pub auto_switch_scenes: bool,
    /// Accept proposals from the advisory service.
    pub ai_suggestions: bool,
    /// Evaluate incoming metric batches.
    pub threshold_alerts: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            auto_switch_scenes: true,
            ai_suggestions: true,
            threshold_alerts: true,
        }
    }
}

#[derive(Debug)]
struct Flags {
    auto_switch_scenes: AtomicBool,
    ai_suggestions: AtomicBool,
    threshold_alerts: AtomicBool,
}

/// Preferences shared between components and changeable at runtime.
#[derive(Debug, Clone)]
pub struct SharedPreferences {
    flags: Arc<Flags>,
}

impl Default for SharedPreferences {
    fn default() -> Self {
        Self::new(Preferences::default())
    }
}

impl SharedPreferences {
    /// Create shared preferences from initial values.
    pub fn new(initial: Preferences) -> Self {
        Self {
            flags: Arc::new(Flags {
                auto_switch_scenes: AtomicBool::new(initial.auto_switch_scenes),
                ai_suggestions: AtomicBool::new(initial.ai_suggestions),
                threshold_alerts: AtomicBool::new(initial.threshold_alerts),
            }),
        }
    }

    pub fn auto_switch_scenes(&self) -> bool {
        self.flags.auto_switch_scenes.load(Ordering::Relaxed)
    }

    pub fn ai_suggestions(&self) -> bool {
        self.flags.ai_suggestions.load(Ordering::Relaxed)
    }

    pub fn threshold_alerts(&self) -> bool {
        self.flags.threshold_alerts.load(Ordering::Relaxed)
    }

    pub fn set_auto_switch_scenes(&self, enabled: bool) {
        self.flags.auto_switch_scenes.store(enabled, Ordering::Relaxed);
    }

    pub fn set_ai_suggestions(&self, enabled: bool) {
        self.flags.ai_suggestions.store(enabled, Ordering::Relaxed);
    }

    pub fn set_threshold_alerts(&self, enabled: bool) {
        self.flags.threshold_alerts.store(enabled, Ordering::Relaxed);
    }

    /// Replace all flags at once.
    pub fn apply(&self, values: Preferences) {
        self.set_auto_switch_scenes(values.auto_switch_scenes);
        self.set_ai_suggestions(values.ai_suggestions);
        self.set_threshold_alerts(values.threshold_alerts);
    }

    /// Current values.
    pub fn snapshot(&self) -> Preferences {
        Preferences {
            auto_switch_scenes: self.auto_switch_scenes(),
            ai_suggestions: self.ai_suggestions(),
            threshold_alerts: self.threshold_alerts(),
        }
    }
}
