//! Control-room configuration.
//!
//! Settings are read from `~/.hydroscene/config.ini`. Each `[section]` maps
//! to one settings struct; [`ConfigFile::runtime_config`] turns them into
//! the component configurations the runtime is built from.
//!
//! # Example
//!
//! ```
//! use hydroscene::config::ConfigFile;
//!
//! let config = ConfigFile::default();
//! let runtime = config.runtime_config();
//! assert_eq!(runtime.threshold.alert_capacity, 10);
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    ConfigFile, DisplaySettings, LoggingSettings, PlaylistSettings, PreferenceSettings,
    SceneSettings, StateSettings, SuggestionSettings, ThresholdSettings,
};
pub use defaults::{default_state_path, DEFAULT_LOG_DIRECTORY, DEFAULT_LOG_FILE, DEFAULT_STATE_FILE};
