//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::parser::RULES_SECTION;
use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let rules: String = config
        .threshold
        .rules
        .iter()
        .map(|rule| format!("{} = {}\n", rule.id, rule.definition()))
        .collect();

    format!(
        r#"[scenes]
; Seconds a scene's data initializer may run before the transition fails (default: 10)
initializer_timeout_secs = {}
; Number of transition audit records kept in memory (default: 256)
audit_capacity = {}

[preferences]
; Let threshold alerts switch to the emergency scene automatically
auto_switch_scenes = {}
; Accept scene proposals from the advisory service
ai_suggestions = {}
; Evaluate threshold rules against incoming telemetry
threshold_alerts = {}

[threshold]
; Seconds before the same rule may alert again (default: 30)
cooldown_secs = {}
; Telemetry batches older than this are dropped unevaluated (default: 1000)
batch_deadline_ms = {}
; Number of recent alerts kept for the operator (default: 10)
alert_capacity = {}
; Batches queued for evaluation before new ones are dropped (default: 64)
feed_capacity = {}

[{}]
; One rule per line: <id> = <metric> <op> <limit> <severity>
;   op       - one of >, >=, <, <=, ==
;   severity - warning, danger or critical (critical may trigger the emergency scene)
; Example: reservoir_high = reservoir_level >= 98.5 critical
{}
[suggestion]
; Proposals at or above this confidence are applied without operator review (default: 0.9)
auto_apply_confidence = {}

[display]
; Seconds without a heartbeat before a display is marked offline (default: 15)
heartbeat_timeout_secs = {}
; Seconds between liveness sweeps, must be less than heartbeat_timeout_secs (default: 5)
sweep_interval_secs = {}
; Milliseconds allowed for one delivery attempt to a display (default: 2000)
delivery_timeout_ms = {}
; Retries after a failed delivery attempt (default: 2)
delivery_retries = {}

[playlist]
; Pause a running playlist when a threshold alert forces the emergency scene
pause_on_emergency = {}

[state]
; Where scene, preferences, layout and sync regime are saved between restarts
path = {}

[logging]
; Log directory, relative paths resolve against the working directory (default: logs)
directory = {}
; Log file name, cleared at every start (default: hydroscene.log)
file = {}
"#,
        config.scenes.initializer_timeout_secs,
        config.scenes.audit_capacity,
        config.preferences.auto_switch_scenes,
        config.preferences.ai_suggestions,
        config.preferences.threshold_alerts,
        config.threshold.cooldown_secs,
        config.threshold.batch_deadline_ms,
        config.threshold.alert_capacity,
        config.threshold.feed_capacity,
        RULES_SECTION,
        rules,
        config.suggestion.auto_apply_confidence,
        config.display.heartbeat_timeout_secs,
        config.display.sweep_interval_secs,
        config.display.delivery_timeout_ms,
        config.display.delivery_retries,
        config.playlist.pause_on_emergency,
        path_to_string(&config.state.path),
        path_to_string(&config.logging.directory),
        config.logging.file,
    )
}

/// Convert path to string, collapsing home dir to ~.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
