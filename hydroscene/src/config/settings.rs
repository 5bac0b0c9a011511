//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

use crate::threshold::ThresholdRule;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Scene coordinator settings
    pub scenes: SceneSettings,
    /// Operator preference flags applied at startup
    pub preferences: PreferenceSettings,
    /// Threshold monitor settings, including `[threshold.rules]`
    pub threshold: ThresholdSettings,
    /// Suggestion arbiter settings
    pub suggestion: SuggestionSettings,
    /// Display registry and delivery settings
    pub display: DisplaySettings,
    /// Playlist player settings
    pub playlist: PlaylistSettings,
    /// Durable state settings
    pub state: StateSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Scene coordinator configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSettings {
    /// Seconds allowed for a scene's data initializer.
    pub initializer_timeout_secs: u64,
    /// Number of transition audit records retained.
    pub audit_capacity: usize,
}

/// Preference flags.
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceSettings {
    pub auto_switch_scenes: bool,
    pub ai_suggestions: bool,
    pub threshold_alerts: bool,
}

/// Threshold monitor configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSettings {
    /// Seconds between two alerts from the same rule.
    pub cooldown_secs: u64,
    /// Batches older than this (milliseconds) are dropped unevaluated.
    pub batch_deadline_ms: u64,
    /// Size of the recent-alert ring.
    pub alert_capacity: usize,
    /// Capacity of the metric feed queue.
    pub feed_capacity: usize,
    /// Rules from `[threshold.rules]`, in file order.
    pub rules: Vec<ThresholdRule>,
}

/// Suggestion arbiter configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionSettings {
    /// Proposals at or above this confidence are applied immediately.
    pub auto_apply_confidence: f64,
}

/// Display registry and delivery configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySettings {
    pub heartbeat_timeout_secs: u64,
    pub sweep_interval_secs: u64,
    pub delivery_timeout_ms: u64,
    pub delivery_retries: u32,
}

/// Playlist configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistSettings {
    /// Pause a running playlist when a threshold alert forces the emergency scene.
    pub pause_on_emergency: bool,
}

/// Durable state configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSettings {
    /// Location of the JSON state file.
    pub path: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Directory for log files. Relative paths resolve against the working directory.
    pub directory: PathBuf,
    /// Log file name inside `directory`.
    pub file: String,
}
