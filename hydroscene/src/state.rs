//! Durable control-room state.
//!
//! Only the small set of values that must survive a restart is persisted:
//! the committed scene snapshot, the preference flags, the active layout
//! and the sync regime. The alert ring and the pending suggestion are
//! in-memory only.
//!
//! The file is JSON, written to a uniquely named temporary sibling and
//! renamed into place, so a crash mid-write leaves the previous state intact
//! and concurrent saves never share a scratch file.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

use crate::layout::PersistedLayout;
use crate::preferences::Preferences;
use crate::scene::SceneSnapshot;
use crate::sync::SyncState;

/// Format version written to new state files.
pub const STATE_VERSION: u32 = 1;

/// State restored across restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurableState {
    pub version: u32,
    pub snapshot: SceneSnapshot,
    pub preferences: Preferences,
    #[serde(default)]
    pub active_layout: Option<PersistedLayout>,
    #[serde(default)]
    pub sync: SyncState,
    pub saved_at: DateTime<Utc>,
}

impl DurableState {
    pub fn new(
        snapshot: SceneSnapshot,
        preferences: Preferences,
        active_layout: Option<PersistedLayout>,
        sync: SyncState,
    ) -> Self {
        Self {
            version: STATE_VERSION,
            snapshot: snapshot.stable(),
            preferences,
            active_layout,
            sync,
            saved_at: Utc::now(),
        }
    }
}

/// State file errors.
#[derive(Debug, Error)]
pub enum StateStoreError {
    /// Failed to read or write the state file
    #[error("State file I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The state file is not valid JSON for this version
    #[error("Invalid state file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The state file was written by a newer version
    #[error("Unsupported state file version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// Reads and writes [`DurableState`] at a fixed path.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved state. Returns `None` if nothing was saved yet.
    pub fn load(&self) -> Result<Option<DurableState>, StateStoreError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No saved control-room state");
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path).map_err(|source| StateStoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        let state: DurableState =
            serde_json::from_str(&content).map_err(|source| StateStoreError::Parse {
                path: self.path.clone(),
                source,
            })?;
        if state.version > STATE_VERSION {
            return Err(StateStoreError::UnsupportedVersion {
                found: state.version,
                expected: STATE_VERSION,
            });
        }

        info!(
            path = %self.path.display(),
            scene = %state.snapshot.current,
            saved_at = %state.saved_at,
            "Control-room state loaded"
        );
        Ok(Some(state))
    }

    /// Save the state atomically.
    pub fn save(&self, state: &DurableState) -> Result<(), StateStoreError> {
        let io_err = |source| StateStoreError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(io_err)?;

        let content = serde_json::to_string_pretty(state).map_err(|source| StateStoreError::Parse {
            path: self.path.clone(),
            source,
        })?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(content.as_bytes()).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;

        debug!(path = %self.path.display(), scene = %state.snapshot.current, "Control-room state saved");
        Ok(())
    }
}
