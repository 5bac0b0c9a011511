//! Synchronization regimes and the update message.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::display::DisplayId;
use crate::error::ControlError;
use crate::scene::{LayerVisibility, SceneId, Viewport};

/// How scene updates propagate across the display wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncRegime {
    /// Displays are driven individually; the core relays nothing.
    #[default]
    Independent,
    /// Only the master display (or the core itself) may drive the wall.
    MasterSlave,
    /// Every update goes to every online display of the active layout.
    Synchronized,
}

impl SyncRegime {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncRegime::Independent => "independent",
            SyncRegime::MasterSlave => "master_slave",
            SyncRegime::Synchronized => "synchronized",
        }
    }
}

impl fmt::Display for SyncRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncRegime {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "independent" => Ok(SyncRegime::Independent),
            "master_slave" | "masterslave" | "master" => Ok(SyncRegime::MasterSlave),
            "synchronized" | "sync" => Ok(SyncRegime::Synchronized),
            other => Err(ControlError::validation(format!(
                "unknown sync regime '{other}' (expected independent, master_slave or synchronized)"
            ))),
        }
    }
}

/// Regime plus the master display when the regime is master/slave.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncState {
    pub regime: SyncRegime,
    pub master: Option<DisplayId>,
}

/// State pushed to each display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneUpdate {
    pub scene: SceneId,
    pub viewport: Option<Viewport>,
    pub layers: Vec<LayerVisibility>,
    pub timestamp: DateTime<Utc>,
    /// Display that initiated the change; `None` for changes made by the core.
    pub originating_display: Option<DisplayId>,
}

impl SceneUpdate {
    pub fn new(scene: SceneId, timestamp: DateTime<Utc>) -> Self {
        Self {
            scene,
            viewport: None,
            layers: Vec::new(),
            timestamp,
            originating_display: None,
        }
    }

    pub fn with_viewport(mut self, viewport: Option<Viewport>) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn with_layers(mut self, layers: Vec<LayerVisibility>) -> Self {
        self.layers = layers;
        self
    }

    pub fn from_display(mut self, display: Option<DisplayId>) -> Self {
        self.originating_display = display;
        self
    }
}
