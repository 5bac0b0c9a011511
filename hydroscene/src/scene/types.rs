//! Scene reference data.
//!
//! - [`SceneId`] - The five operating scenes
//! - [`Scene`] - Immutable definition: view kind, refresh policy, default layers
//! - [`SceneRegistry`] - Static table of scene definitions
//! - [`Viewport`] - Camera position shared with display surfaces

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ControlError;

/// Identity of an operating scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneId {
    /// Routine monitoring of the whole plant.
    #[default]
    Normal,
    /// Focused view for dam and turbine inspection rounds.
    Inspection,
    /// Alarm response; entered automatically on critical threshold alerts.
    Emergency,
    /// Water and power dispatch planning.
    Dispatch,
    /// Historical and trend analysis.
    Analysis,
}

impl SceneId {
    /// All scene ids in registry order.
    pub const ALL: [SceneId; 5] = [
        SceneId::Normal,
        SceneId::Inspection,
        SceneId::Emergency,
        SceneId::Dispatch,
        SceneId::Analysis,
    ];

    /// Lowercase name used in config files, the console and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            SceneId::Normal => "normal",
            SceneId::Inspection => "inspection",
            SceneId::Emergency => "emergency",
            SceneId::Dispatch => "dispatch",
            SceneId::Analysis => "analysis",
        }
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SceneId {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        SceneId::ALL
            .into_iter()
            .find(|id| id.as_str() == lowered)
            .ok_or_else(|| {
                ControlError::validation(format!(
                    "unknown scene '{}' (expected one of: normal, inspection, emergency, dispatch, analysis)",
                    s.trim()
                ))
            })
    }
}

/// Default presentation used when a scene is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    /// 2D basin overview map.
    Overview,
    /// 3D terrain with reservoir surface.
    Terrain3d,
    /// Plant schematic (penstocks, turbines, gates).
    Schematic,
    /// Chart-heavy dashboard.
    Dashboard,
}

/// Visibility of a named map layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerVisibility {
    /// Layer name as understood by the rendering surfaces.
    pub name: String,
    /// Whether the layer is shown.
    pub visible: bool,
}

impl LayerVisibility {
    /// A visible layer.
    pub fn shown(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visible: true,
        }
    }

    /// A hidden layer.
    pub fn hidden(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visible: false,
        }
    }
}

/// Camera position shared with display surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Latitude of the view center in degrees.
    pub latitude: f64,
    /// Longitude of the view center in degrees.
    pub longitude: f64,
    /// Map zoom level.
    pub zoom: f64,
    /// Camera pitch in degrees (0 = top-down).
    pub pitch: f64,
    /// Camera bearing in degrees clockwise from north.
    pub bearing: f64,
}

impl Viewport {
    /// Top-down viewport centered on a point.
    pub fn centered(latitude: f64, longitude: f64, zoom: f64) -> Self {
        Self {
            latitude,
            longitude,
            zoom,
            pitch: 0.0,
            bearing: 0.0,
        }
    }

    /// Tilt the camera.
    pub fn with_pitch(mut self, pitch: f64) -> Self {
        self.pitch = pitch;
        self
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::centered(0.0, 0.0, 10.0)
    }
}

/// Immutable scene definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// Scene identity.
    pub id: SceneId,
    /// Name shown on the operator console.
    pub display_name: &'static str,
    /// Presentation used when the scene is entered.
    pub default_view_kind: ViewKind,
    /// Whether displays refresh data on a timer while in this scene.
    pub auto_refresh: bool,
    /// Refresh period when `auto_refresh` is set.
    pub refresh_interval: Duration,
    /// Layers visible by default.
    pub default_layers: &'static [&'static str],
}

impl Scene {
    /// Default layer visibility for this scene.
    pub fn layers(&self) -> Vec<LayerVisibility> {
        self.default_layers
            .iter()
            .map(|name| LayerVisibility::shown(*name))
            .collect()
    }
}

static BUILTIN_SCENES: [Scene; 5] = [
    Scene {
        id: SceneId::Normal,
        display_name: "Normal Operation",
        default_view_kind: ViewKind::Overview,
        auto_refresh: true,
        refresh_interval: Duration::from_secs(30),
        default_layers: &["basin", "reservoirs", "stations"],
    },
    Scene {
        id: SceneId::Inspection,
        display_name: "Inspection",
        default_view_kind: ViewKind::Terrain3d,
        auto_refresh: true,
        refresh_interval: Duration::from_secs(15),
        default_layers: &["terrain", "dam_structures", "sensors"],
    },
    Scene {
        id: SceneId::Emergency,
        display_name: "Emergency Response",
        default_view_kind: ViewKind::Overview,
        auto_refresh: true,
        refresh_interval: Duration::from_secs(5),
        default_layers: &["reservoirs", "sensors", "alarms", "evacuation_routes"],
    },
    Scene {
        id: SceneId::Dispatch,
        display_name: "Dispatch",
        default_view_kind: ViewKind::Schematic,
        auto_refresh: true,
        refresh_interval: Duration::from_secs(10),
        default_layers: &["units", "gates", "grid_tie"],
    },
    Scene {
        id: SceneId::Analysis,
        display_name: "Analysis",
        default_view_kind: ViewKind::Dashboard,
        auto_refresh: false,
        refresh_interval: Duration::ZERO,
        default_layers: &["inflow_history", "forecast"],
    },
];

/// Static table of scene definitions.
#[derive(Debug, Clone, Copy)]
pub struct SceneRegistry {
    scenes: &'static [Scene],
}

impl Default for SceneRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SceneRegistry {
    /// The built-in hydropower scene table.
    pub fn builtin() -> Self {
        Self {
            scenes: &BUILTIN_SCENES,
        }
    }

    /// Look up a scene definition.
    pub fn get(&self, id: SceneId) -> &'static Scene {
        // Every SceneId has an entry in the built-in table
        self.scenes
            .iter()
            .find(|scene| scene.id == id)
            .unwrap_or(&BUILTIN_SCENES[0])
    }

    /// All scene definitions.
    pub fn all(&self) -> &'static [Scene] {
        self.scenes
    }
}
