//! Configuration file handling for ~/.hydroscene/config.ini.
//!
//! Loads and saves user configuration with sensible defaults.
//! Settings structs live in [`super::settings`], constants in [`super::defaults`],
//! parsing in [`super::parser`], and serialization in [`super::writer`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

pub use super::settings::*;

use crate::display::DisplayRegistryConfig;
use crate::preferences::Preferences;
use crate::runtime::RuntimeConfig;
use crate::scene::SceneCoordinatorConfig;
use crate::suggestion::ArbiterConfig;
use crate::sync::SyncConfig;
use crate::threshold::ThresholdConfig;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path (~/.hydroscene/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        let path = config_file_path();
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to the default path (~/.hydroscene/config.ini).
    pub fn save(&self) -> Result<(), ConfigFileError> {
        let path = config_file_path();
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Create the default config file if it doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            let config = Self::default();
            config.save_to(&path)?;
        }
        Ok(path)
    }

    /// Convert file settings into the component configurations used by the runtime.
    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            scenes: SceneCoordinatorConfig {
                initializer_timeout: Duration::from_secs(self.scenes.initializer_timeout_secs),
                audit_capacity: self.scenes.audit_capacity,
                ..SceneCoordinatorConfig::default()
            },
            preferences: Preferences {
                auto_switch_scenes: self.preferences.auto_switch_scenes,
                ai_suggestions: self.preferences.ai_suggestions,
                threshold_alerts: self.preferences.threshold_alerts,
            },
            threshold: ThresholdConfig {
                rules: self.threshold.rules.clone(),
                cooldown: Duration::from_secs(self.threshold.cooldown_secs),
                batch_deadline: Duration::from_millis(self.threshold.batch_deadline_ms),
                alert_capacity: self.threshold.alert_capacity,
                feed_capacity: self.threshold.feed_capacity,
            },
            arbiter: ArbiterConfig {
                auto_apply_confidence: self.suggestion.auto_apply_confidence,
            },
            display: DisplayRegistryConfig {
                heartbeat_timeout: Duration::from_secs(self.display.heartbeat_timeout_secs),
                sweep_interval: Duration::from_secs(self.display.sweep_interval_secs),
            },
            sync: SyncConfig {
                delivery_timeout: Duration::from_millis(self.display.delivery_timeout_ms),
                delivery_retries: self.display.delivery_retries,
                ..SyncConfig::default()
            },
            pause_on_emergency: self.playlist.pause_on_emergency,
            state_path: Some(self.state.path.clone()),
            ..RuntimeConfig::default()
        }
    }
}

/// Get the path to the config directory (~/.hydroscene).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".hydroscene")
}

/// Get the path to the config file (~/.hydroscene/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
