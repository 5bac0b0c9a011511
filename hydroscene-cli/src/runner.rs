//! CLI runner for common setup.
//!
//! Loads the config file and initializes logging for commands that start
//! the control room.

use std::path::{Path, PathBuf};

use hydroscene::config::{config_file_path, ConfigFile};
use hydroscene::logging::{init_logging, LoggingGuard};
use tracing::info;

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
    config_path: PathBuf,
}

impl CliRunner {
    /// Load config (default path unless `config_path` is given) and start logging.
    pub fn new(config_path: Option<&Path>) -> Result<Self, CliError> {
        let config_path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(config_file_path);
        let config = ConfigFile::load_from(&config_path)?;

        let logging_guard = init_logging(&config.logging.directory, &config.logging.file)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
            config_path,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("hydroscene v{}", hydroscene::VERSION);
        info!(
            config = %self.config_path.display(),
            log = %self.logging_guard.log_path().display(),
            "hydroscene CLI: {} command",
            command
        );
    }
}
