//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::Ini;

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::threshold::ThresholdRule;

/// Section holding one threshold rule per key.
pub(super) const RULES_SECTION: &str = "threshold.rules";

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [scenes] section
    if let Some(section) = ini.section(Some("scenes")) {
        if let Some(v) = section.get("initializer_timeout_secs") {
            config.scenes.initializer_timeout_secs =
                parse_positive("scenes", "initializer_timeout_secs", v, "seconds")?;
        }
        if let Some(v) = section.get("audit_capacity") {
            config.scenes.audit_capacity =
                parse_positive("scenes", "audit_capacity", v, "records")?;
        }
    }

    // [preferences] section
    if let Some(section) = ini.section(Some("preferences")) {
        if let Some(v) = section.get("auto_switch_scenes") {
            config.preferences.auto_switch_scenes = parse_bool(v);
        }
        if let Some(v) = section.get("ai_suggestions") {
            config.preferences.ai_suggestions = parse_bool(v);
        }
        if let Some(v) = section.get("threshold_alerts") {
            config.preferences.threshold_alerts = parse_bool(v);
        }
    }

    // [threshold] section
    if let Some(section) = ini.section(Some("threshold")) {
        if let Some(v) = section.get("cooldown_secs") {
            config.threshold.cooldown_secs =
                v.trim().parse().map_err(|_| ConfigFileError::InvalidValue {
                    section: "threshold".to_string(),
                    key: "cooldown_secs".to_string(),
                    value: v.to_string(),
                    reason: "must be a non-negative integer (seconds)".to_string(),
                })?;
        }
        if let Some(v) = section.get("batch_deadline_ms") {
            config.threshold.batch_deadline_ms =
                parse_positive("threshold", "batch_deadline_ms", v, "milliseconds")?;
        }
        if let Some(v) = section.get("alert_capacity") {
            config.threshold.alert_capacity =
                parse_positive("threshold", "alert_capacity", v, "alerts")?;
        }
        if let Some(v) = section.get("feed_capacity") {
            config.threshold.feed_capacity =
                parse_positive("threshold", "feed_capacity", v, "batches")?;
        }
    }

    // [threshold.rules] section
    if let Some(section) = ini.section(Some(RULES_SECTION)) {
        for (id, definition) in section.iter() {
            let rule = ThresholdRule::parse(id, definition).map_err(|e| {
                ConfigFileError::InvalidValue {
                    section: RULES_SECTION.to_string(),
                    key: id.to_string(),
                    value: definition.to_string(),
                    reason: e.to_string(),
                }
            })?;
            config.threshold.rules.push(rule);
        }
    }

    // [suggestion] section
    if let Some(section) = ini.section(Some("suggestion")) {
        if let Some(v) = section.get("auto_apply_confidence") {
            let parsed: f64 = v.trim().parse().unwrap_or(f64::NAN);
            if !(0.0..=1.0).contains(&parsed) {
                return Err(ConfigFileError::InvalidValue {
                    section: "suggestion".to_string(),
                    key: "auto_apply_confidence".to_string(),
                    value: v.to_string(),
                    reason: "must be a number between 0 and 1".to_string(),
                });
            }
            config.suggestion.auto_apply_confidence = parsed;
        }
    }

    // [display] section
    if let Some(section) = ini.section(Some("display")) {
        if let Some(v) = section.get("heartbeat_timeout_secs") {
            config.display.heartbeat_timeout_secs =
                parse_positive("display", "heartbeat_timeout_secs", v, "seconds")?;
        }
        if let Some(v) = section.get("sweep_interval_secs") {
            config.display.sweep_interval_secs =
                parse_positive("display", "sweep_interval_secs", v, "seconds")?;
        }
        if let Some(v) = section.get("delivery_timeout_ms") {
            config.display.delivery_timeout_ms =
                parse_positive("display", "delivery_timeout_ms", v, "milliseconds")?;
        }
        if let Some(v) = section.get("delivery_retries") {
            config.display.delivery_retries =
                v.trim().parse().map_err(|_| ConfigFileError::InvalidValue {
                    section: "display".to_string(),
                    key: "delivery_retries".to_string(),
                    value: v.to_string(),
                    reason: "must be a non-negative integer".to_string(),
                })?;
        }
    }
    if config.display.sweep_interval_secs >= config.display.heartbeat_timeout_secs {
        return Err(ConfigFileError::InvalidValue {
            section: "display".to_string(),
            key: "sweep_interval_secs".to_string(),
            value: config.display.sweep_interval_secs.to_string(),
            reason: format!(
                "must be less than heartbeat_timeout_secs ({})",
                config.display.heartbeat_timeout_secs
            ),
        });
    }

    // [playlist] section
    if let Some(section) = ini.section(Some("playlist")) {
        if let Some(v) = section.get("pause_on_emergency") {
            config.playlist.pause_on_emergency = parse_bool(v);
        }
    }

    // [state] section
    if let Some(section) = ini.section(Some("state")) {
        if let Some(v) = section.get("path") {
            let v = v.trim();
            if !v.is_empty() {
                config.state.path = expand_tilde(v);
            }
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = v.to_string();
            }
        }
    }

    Ok(config)
}

/// Parse a strictly positive integer, reporting `unit` in the error message.
fn parse_positive<T>(section: &str, key: &str, value: &str, unit: &str) -> Result<T, ConfigFileError>
where
    T: FromStr + Default + PartialEq,
{
    match value.trim().parse::<T>() {
        Ok(parsed) if parsed != T::default() => Ok(parsed),
        _ => Err(ConfigFileError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: format!("must be a positive integer ({unit})"),
        }),
    }
}

/// Parse a boolean value from a config string.
/// Accepts: true/false, yes/no, 1/0, on/off (case-insensitive)
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
