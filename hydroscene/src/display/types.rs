//! Display identity, descriptors and status.

use std::fmt;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::layout::LayoutId;

/// Capability that matches every layout.
pub const WILDCARD_CAPABILITY: &str = "*";

/// Identity of a registered display surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayId(String);

impl DisplayId {
    /// Wrap a display id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pixel resolution of a display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// What a display sends when it connects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayDescriptor {
    /// Stable id requested by the display; generated when absent.
    pub id: Option<String>,
    /// Operator-facing name.
    pub name: String,
    /// Native resolution.
    pub resolution: Resolution,
    /// Layout ids this display can take part in; `"*"` matches any layout.
    pub capabilities: Vec<String>,
}

impl DisplayDescriptor {
    /// Descriptor without a requested id.
    pub fn new(name: impl Into<String>, resolution: Resolution) -> Self {
        Self {
            id: None,
            name: name.into(),
            resolution,
            capabilities: Vec::new(),
        }
    }

    /// Request a stable id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a supported layout id (or `"*"`).
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }
}

/// Liveness of a display, derived from heartbeat recency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStatus {
    Online,
    Offline,
}

impl DisplayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayStatus::Online => "online",
            DisplayStatus::Offline => "offline",
        }
    }
}

impl fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered display.
#[derive(Debug, Clone, PartialEq)]
pub struct Display {
    pub id: DisplayId,
    pub name: String,
    pub resolution: Resolution,
    pub capabilities: Vec<String>,
    /// Only the registry changes this, from heartbeat age.
    pub status: DisplayStatus,
    pub last_heartbeat: Instant,
    pub registered_at: DateTime<Utc>,
}

impl Display {
    /// Returns true if the display may take a slot in `layout`.
    pub fn supports(&self, layout: &LayoutId) -> bool {
        self.capabilities
            .iter()
            .any(|c| c == WILDCARD_CAPABILITY || c == layout.as_str())
    }

    pub fn is_online(&self) -> bool {
        self.status == DisplayStatus::Online
    }
}
