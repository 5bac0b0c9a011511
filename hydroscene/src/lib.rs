//! hydroscene - Control-room orchestration core for hydropower plants
//!
//! This library decides which operating scene the control room shows,
//! switches scenes on operator action, threshold alerts, advisory
//! suggestions and playlists, and keeps a wall of displays in step.
//!
//! # High-Level API
//!
//! For most use cases, the [`runtime`] module wires every component:
//!
//! ```ignore
//! use std::sync::Arc;
//! use hydroscene::clock::SystemClock;
//! use hydroscene::config::ConfigFile;
//! use hydroscene::runtime::ControlRoomRuntime;
//! use hydroscene::scene::StaticSceneLoader;
//! use hydroscene::sync::BroadcastDisplaySink;
//!
//! let config = ConfigFile::load()?.runtime_config();
//! let sink = Arc::new(BroadcastDisplaySink::default());
//! let runtime = ControlRoomRuntime::new(
//!     config,
//!     Arc::new(StaticSceneLoader::new()),
//!     sink.clone(),
//!     SystemClock::shared(),
//! );
//! ```

pub mod clock;
pub mod config;
pub mod display;
pub mod error;
pub mod layout;
pub mod logging;
pub mod notify;
pub mod playlist;
pub mod preferences;
pub mod runtime;
pub mod scene;
pub mod state;
pub mod suggestion;
pub mod sync;
pub mod threshold;

pub use error::ControlError;

/// Version of the hydroscene library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
