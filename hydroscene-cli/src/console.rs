//! Operator console command parsing.
//!
//! One command per line on stdin, parsed with the same clap derive model as
//! the binary's own arguments. Parsing is kept separate from execution so
//! every form can be tested without a runtime.

use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use hydroscene::display::DisplayId;
use hydroscene::scene::SceneId;
use hydroscene::sync::SyncRegime;

/// One console line.
#[derive(Parser, Debug)]
#[command(name = "console", no_binary_name = true, disable_help_flag = true)]
#[command(about = "Operator console", long_about = None)]
struct ConsoleLine {
    #[command(subcommand)]
    command: ConsoleCommand,
}

/// A parsed console command.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// Request a scene transition
    Switch {
        #[arg(value_parser = parse_scene)]
        scene: SceneId,
        /// Display the request comes from
        #[arg(long, value_parser = parse_display)]
        from: Option<DisplayId>,
    },

    /// Return to the previous scene
    Revert,

    /// Push a telemetry batch of metric=value readings
    Sample {
        #[arg(required = true, value_name = "METRIC=VALUE", value_parser = parse_reading)]
        readings: Vec<(String, f64)>,
    },

    /// Submit an advisory proposal
    Suggest {
        #[arg(value_parser = parse_scene)]
        scene: SceneId,
        confidence: f64,
        #[arg(trailing_var_arg = true)]
        rationale: Vec<String>,
    },

    /// Show the pending proposal
    Pending,

    /// Apply the pending proposal
    Accept,

    /// Discard the pending proposal
    Reject,

    /// Show recent threshold alerts
    Alerts,

    /// Register, heartbeat, remove or list displays
    Display {
        #[command(subcommand)]
        action: DisplayAction,
    },

    /// Define, activate and inspect layouts
    Layout {
        #[command(subcommand)]
        action: LayoutAction,
    },

    /// Set the sync regime
    Regime {
        #[arg(value_parser = parse_regime)]
        regime: SyncRegime,
        /// Master display for master_slave
        #[arg(value_parser = parse_display)]
        master: Option<DisplayId>,
    },

    /// Edit and control the scene playlist
    Playlist {
        #[command(subcommand)]
        action: PlaylistAction,
    },

    /// Show preferences, or set one flag
    Prefs {
        #[arg(requires = "enabled")]
        flag: Option<PreferenceFlag>,
        #[arg(value_parser = parse_switch)]
        enabled: Option<bool>,
    },

    /// Show scene, regime and health
    Status,

    /// Show the transition audit trail
    Audit,

    /// Stop the control room
    #[command(alias = "exit")]
    Quit,
}

/// Display sub-commands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum DisplayAction {
    /// Register a display (default capability *)
    Register { id: String, capabilities: Vec<String> },
    /// Record a heartbeat
    Heartbeat {
        #[arg(value_parser = parse_display)]
        id: DisplayId,
    },
    /// Unregister a display
    Remove {
        #[arg(value_parser = parse_display)]
        id: DisplayId,
    },
    /// List displays
    List,
}

/// Layout sub-commands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum LayoutAction {
    /// Define a grid layout
    Grid { id: String, rows: u32, cols: u32 },
    /// Define a single-row layout
    Linear { id: String, cells: usize },
    /// Activate a layout, one display per slot
    Activate {
        id: String,
        #[arg(required = true, value_parser = parse_display)]
        displays: Vec<DisplayId>,
    },
    /// Swap the display in one slot
    Replace {
        slot: usize,
        #[arg(value_parser = parse_display)]
        display: DisplayId,
    },
    /// Show the active layout
    Show,
}

/// Playlist sub-commands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum PlaylistAction {
    /// Append an entry
    Add {
        #[arg(value_parser = parse_scene)]
        scene: SceneId,
        #[arg(value_name = "DWELL_SECS", value_parser = parse_dwell)]
        dwell: Duration,
    },
    /// Remove all entries
    Clear,
    Start,
    Pause,
    Resume,
    Stop,
    Status,
}

/// Preference flags accepted by `prefs`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceFlag {
    #[value(name = "auto_switch", alias = "auto_switch_scenes")]
    AutoSwitch,
    #[value(name = "suggestions", alias = "ai_suggestions")]
    Suggestions,
    #[value(name = "alerts", alias = "threshold_alerts")]
    Alerts,
}

impl ConsoleCommand {
    /// Parse one console line. Blank lines parse to `None`.
    ///
    /// `help` and usage mistakes come back as a [`clap::Error`] whose
    /// rendering is shown to the operator.
    pub fn parse(line: &str) -> Result<Option<Self>, clap::Error> {
        if line.trim().is_empty() {
            return Ok(None);
        }
        let parsed = ConsoleLine::try_parse_from(line.split_whitespace())?;
        Ok(Some(parsed.command))
    }
}

fn parse_scene(value: &str) -> Result<SceneId, String> {
    value.parse().map_err(|e| format!("{e}"))
}

fn parse_regime(value: &str) -> Result<SyncRegime, String> {
    value.parse().map_err(|e| format!("{e}"))
}

fn parse_display(value: &str) -> Result<DisplayId, String> {
    Ok(DisplayId::new(value))
}

fn parse_reading(value: &str) -> Result<(String, f64), String> {
    let (metric, reading) = value
        .split_once('=')
        .ok_or_else(|| format!("expected METRIC=VALUE, got '{value}'"))?;
    let reading = reading
        .parse()
        .map_err(|_| format!("{metric} must be a number, got '{reading}'"))?;
    Ok((metric.to_string(), reading))
}

fn parse_dwell(value: &str) -> Result<Duration, String> {
    value
        .parse()
        .map(Duration::from_secs)
        .map_err(|_| format!("dwell must be whole seconds, got '{value}'"))
}

fn parse_switch(value: &str) -> Result<bool, String> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => Err(format!("expected on or off, got '{other}'")),
    }
}
