//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`ParleySettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
//! 3. Apply `PARLEY_*` environment variable overrides (highest priority)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::ParleySettings;

/// Resolve the settings file: `$PARLEY_SETTINGS_PATH`, else `~/.parley/settings.json`.
pub fn settings_path() -> PathBuf {
    if let Some(path) = read_env_string("PARLEY_SETTINGS_PATH") {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".parley").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<ParleySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; a malformed one is an error.
pub fn load_settings_from_path(path: &Path) -> Result<ParleySettings> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<ParleySettings> {
    let defaults = serde_json::to_value(ParleySettings::default())?;

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
///
/// Objects merge per key, everything else is replaced by `source`.
/// Nulls in `source` keep the target value.
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

/// Apply process environment overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut ParleySettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary lookup. Invalid values are ignored.
pub fn apply_overrides<F>(settings: &mut ParleySettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = read("PARLEY_OLLAMA_BASE_URL") {
        settings.ollama.base_url = v;
    }
    if let Some(v) = read("PARLEY_OLLAMA_MODEL") {
        settings.ollama.model = v;
    }
    if let Some(v) = read("PARLEY_OLLAMA_TIMEOUT_SECS")
        .and_then(|raw| checked("PARLEY_OLLAMA_TIMEOUT_SECS", &raw, parse_u64_range(&raw, 1, 3600)))
    {
        settings.ollama.request_timeout_secs = v;
    }
    if let Some(v) = read("PARLEY_SIMULATION_TIMEOUT_SECS")
        .and_then(|raw| checked("PARLEY_SIMULATION_TIMEOUT_SECS", &raw, parse_secs(&raw)))
    {
        settings.simulation.timeout_secs = Some(v);
    }
    if let Some(v) = read("PARLEY_GENERATION_TIMEOUT_SECS")
        .and_then(|raw| checked("PARLEY_GENERATION_TIMEOUT_SECS", &raw, parse_secs(&raw)))
    {
        settings.simulation.generation_timeout_secs = Some(v);
    }
    if let Some(v) = read("PARLEY_MAX_TOKENS_PER_MESSAGE")
        .and_then(|raw| checked("PARLEY_MAX_TOKENS_PER_MESSAGE", &raw, raw.parse::<u32>().ok()))
    {
        settings.simulation.max_tokens_per_message = Some(v);
    }
    if let Some(v) = read("PARLEY_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) =
        read("PARLEY_LOG_JSON").and_then(|raw| checked("PARLEY_LOG_JSON", &raw, parse_bool(&raw)))
    {
        settings.logging.json = v;
    }
}

fn checked<T>(key: &str, raw: &str, parsed: Option<T>) -> Option<T> {
    if parsed.is_none() {
        warn!(key, value = %raw, "invalid env var, ignoring");
    }
    parsed
}

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

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a non-negative number of seconds (fractions allowed) that fits a `Duration`.
pub fn parse_secs(val: &str) -> Option<f64> {
    let n: f64 = val.trim().parse().ok()?;
    (n >= 0.0 && Duration::try_from_secs_f64(n).is_ok()).then_some(n)
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
