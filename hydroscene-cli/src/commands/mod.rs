//! CLI command implementations.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (path, show, init)
//! - [`run`] - Start the control room with the operator console
//! - [`scenes`] - List the built-in scenes

pub mod config;
pub mod run;
pub mod scenes;
