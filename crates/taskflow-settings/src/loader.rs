//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`TaskflowSettings::default()`]
//! 2. If `~/.taskflow/settings.json` exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::TaskflowSettings;

/// Directory holding the settings file and the default database.
pub fn taskflow_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".taskflow")
}

/// Resolve the path to the settings file (`~/.taskflow/settings.json`).
pub fn settings_path() -> PathBuf {
    taskflow_home().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<TaskflowSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON or an out-of-range value, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<TaskflowSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

fn load_file_layer(path: &Path) -> Result<TaskflowSettings> {
    let defaults = serde_json::to_value(TaskflowSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `TASKFLOW_*` environment variable overrides.
///
/// Invalid values are ignored with a warning (falling back to file/default).
pub fn apply_env_overrides(settings: &mut TaskflowSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable source.
pub fn apply_overrides_from(
    settings: &mut TaskflowSettings,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = read("TASKFLOW_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read("TASKFLOW_PORT") {
        match parse_u16_range(&v, 0, u16::MAX) {
            Some(port) => settings.server.port = port,
            None => warn_invalid("TASKFLOW_PORT", &v),
        }
    }

    // ── Database ────────────────────────────────────────────────────
    if let Some(v) = read("TASKFLOW_DB_PATH") {
        settings.database.path = v;
    }
    if let Some(v) = read("TASKFLOW_POOL_SIZE") {
        match parse_u32_range(&v, 1, 256) {
            Some(size) => settings.database.pool_size = size,
            None => warn_invalid("TASKFLOW_POOL_SIZE", &v),
        }
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read("TASKFLOW_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read("TASKFLOW_LOG_JSON") {
        match parse_bool(&v) {
            Some(json) => settings.logging.json = json,
            None => warn_invalid("TASKFLOW_LOG_JSON", &v),
        }
    }

    // ── Engine ──────────────────────────────────────────────────────
    if let Some(v) = read("TASKFLOW_ROLLUP_MODE") {
        match parse_enum(&v) {
            Some(mode) => settings.engine.rollup_mode = mode,
            None => warn_invalid("TASKFLOW_ROLLUP_MODE", &v),
        }
    }
    if let Some(v) = read("TASKFLOW_DELETE_POLICY") {
        match parse_enum(&v) {
            Some(policy) => settings.engine.delete_policy = policy,
            None => warn_invalid("TASKFLOW_DELETE_POLICY", &v),
        }
    }
}

/// Reject values that would make the service unusable.
pub fn validate(settings: &TaskflowSettings) -> Result<()> {
    if settings.database.pool_size == 0 {
        return Err(SettingsError::InvalidValue(
            "database.poolSize must be at least 1".into(),
        ));
    }
    if settings.database.path.trim().is_empty() {
        return Err(SettingsError::InvalidValue(
            "database.path must not be empty".into(),
        ));
    }
    Ok(())
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u32` within a range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a snake_case enum value through its serde representation.
fn parse_enum<T: DeserializeOwned>(val: &str) -> Option<T> {
    serde_json::from_value(Value::String(val.to_lowercase())).ok()
}

fn warn_invalid(key: &str, value: &str) {
    tracing::warn!(key, value, "invalid env var, ignoring");
}
