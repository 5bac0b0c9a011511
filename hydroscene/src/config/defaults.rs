//! Default values and constants for all configuration settings.
//!
//! Component defaults are re-used from the modules that own them so the
//! INI defaults and the in-code defaults cannot drift apart.

use std::path::PathBuf;

use super::file::config_directory;
use super::settings::*;
use crate::display::{DEFAULT_HEARTBEAT_TIMEOUT, DEFAULT_SWEEP_INTERVAL};
use crate::scene::{DEFAULT_AUDIT_CAPACITY, DEFAULT_INITIALIZER_TIMEOUT};
use crate::suggestion::DEFAULT_AUTO_APPLY_CONFIDENCE;
use crate::sync::{DEFAULT_DELIVERY_RETRIES, DEFAULT_DELIVERY_TIMEOUT};
use crate::threshold::{
    DEFAULT_ALERT_CAPACITY, DEFAULT_BATCH_DEADLINE, DEFAULT_COOLDOWN, DEFAULT_FEED_CAPACITY,
};

/// Default log directory, relative to the working directory.
pub const DEFAULT_LOG_DIRECTORY: &str = "logs";

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "hydroscene.log";

/// Default state file name inside the config directory.
pub const DEFAULT_STATE_FILE: &str = "state.json";

/// Default location of the durable state file (~/.hydroscene/state.json).
pub fn default_state_path() -> PathBuf {
    config_directory().join(DEFAULT_STATE_FILE)
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            scenes: SceneSettings {
                initializer_timeout_secs: DEFAULT_INITIALIZER_TIMEOUT.as_secs(),
                audit_capacity: DEFAULT_AUDIT_CAPACITY,
            },
            preferences: PreferenceSettings {
                auto_switch_scenes: true,
                ai_suggestions: true,
                threshold_alerts: true,
            },
            threshold: ThresholdSettings {
                cooldown_secs: DEFAULT_COOLDOWN.as_secs(),
                batch_deadline_ms: DEFAULT_BATCH_DEADLINE.as_millis() as u64,
                alert_capacity: DEFAULT_ALERT_CAPACITY,
                feed_capacity: DEFAULT_FEED_CAPACITY,
                rules: Vec::new(),
            },
            suggestion: SuggestionSettings {
                auto_apply_confidence: DEFAULT_AUTO_APPLY_CONFIDENCE,
            },
            display: DisplaySettings {
                heartbeat_timeout_secs: DEFAULT_HEARTBEAT_TIMEOUT.as_secs(),
                sweep_interval_secs: DEFAULT_SWEEP_INTERVAL.as_secs(),
                delivery_timeout_ms: DEFAULT_DELIVERY_TIMEOUT.as_millis() as u64,
                delivery_retries: DEFAULT_DELIVERY_RETRIES,
            },
            playlist: PlaylistSettings {
                pause_on_emergency: false,
            },
            state: StateSettings {
                path: default_state_path(),
            },
            logging: LoggingSettings {
                directory: PathBuf::from(DEFAULT_LOG_DIRECTORY),
                file: DEFAULT_LOG_FILE.to_string(),
            },
        }
    }
}
