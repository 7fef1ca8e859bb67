//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`ConsoleSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply `WA_CONSOLE_*` environment overrides (highest priority)
//! 4. Validate the result

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::ConsoleSettings;

/// Resolve the path to the settings file (`~/.wa-console/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".wa-console").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<ConsoleSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON or an invalid merged value
/// is an error.
pub fn load_settings_from_path(path: &Path) -> Result<ConsoleSettings> {
    load_with_overrides(path, |name| std::env::var(name).ok())
}

/// Same as [`load_settings_from_path`] with a custom override source.
pub fn load_with_overrides<F>(path: &Path, lookup: F) -> Result<ConsoleSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = serde_json::to_value(ConsoleSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: ConsoleSettings = serde_json::from_value(merged)?;
    apply_overrides(&mut settings, lookup);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply overrides from `lookup` (normally the process environment).
///
/// Invalid values are logged and ignored, falling back to file/default.
pub fn apply_overrides<F>(settings: &mut ConsoleSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let string = |name: &str| lookup(name).filter(|v| !v.is_empty());
    let millis = |name: &str, min: u64, max: u64| {
        let val = lookup(name)?;
        let parsed = parse_u64_range(&val, min, max);
        if parsed.is_none() {
            warn!(key = name, value = %val, "invalid millisecond env var, ignoring");
        }
        parsed
    };

    // ── Gateway ─────────────────────────────────────────────────────
    if let Some(v) = string("WA_CONSOLE_BASE_URL") {
        settings.gateway.base_url = v;
    }
    if let Some(v) = string("WA_CONSOLE_EVENTS_URL") {
        settings.gateway.events_url = Some(v);
    }
    if let Some(v) = string("WA_CONSOLE_SESSION") {
        settings.gateway.session_name = v;
    }
    if let Some(v) = millis("WA_CONSOLE_TIMEOUT_MS", 100, 600_000) {
        settings.gateway.request_timeout_ms = v;
    }

    // ── Sync ────────────────────────────────────────────────────────
    if let Some(v) = millis("WA_CONSOLE_STATUS_POLL_MS", 250, 600_000) {
        settings.sync.status_poll_interval_ms = v;
    }
    if let Some(v) = millis("WA_CONSOLE_QR_REFRESH_MS", 1_000, 3_600_000) {
        settings.sync.qr_refresh_interval_ms = v;
    }
    if let Some(val) = lookup("WA_CONSOLE_STOP_ON_FAILURE") {
        match parse_bool(&val) {
            Some(v) => settings.sync.stop_polling_on_failure = v,
            None => warn!(key = "WA_CONSOLE_STOP_ON_FAILURE", value = %val, "invalid boolean env var, ignoring"),
        }
    }

    // ── Phone / logging ─────────────────────────────────────────────
    if let Some(v) = string("WA_CONSOLE_COUNTRY_CODE") {
        settings.phone.country_code = v;
    }
    if let Some(v) = string("WA_CONSOLE_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
