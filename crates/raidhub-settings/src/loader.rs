//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`RaidhubSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `RAIDHUB_*` environment overrides
//! 4. Validate
//!
//! CLI flags are applied by the binary on top of the returned value.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::RaidhubSettings;

/// Resolve the default settings file (`~/.raidhub/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".raidhub").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<RaidhubSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from `path` with env var overrides.
///
/// A missing file yields defaults. Unreadable or malformed files are errors.
pub fn load_settings_from_path(path: &Path) -> Result<RaidhubSettings> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<RaidhubSettings> {
    let defaults = serde_json::to_value(RaidhubSettings::default())?;

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
/// Objects merge per key, arrays and scalars in `source` replace, and nulls
/// in `source` leave the target untouched.
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

/// Apply `RAIDHUB_*` environment variables.
pub fn apply_env_overrides(settings: &mut RaidhubSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides using `lookup` as the variable source.
///
/// Invalid values are ignored with a warning.
pub fn apply_overrides_from<F>(settings: &mut RaidhubSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = read_string(&lookup, "RAIDHUB_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_parsed(&lookup, "RAIDHUB_PORT", |s| parse_u16_range(s, 1, 65535)) {
        settings.server.port = v;
    }
    if let Some(v) = read_string(&lookup, "RAIDHUB_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_parsed(&lookup, "RAIDHUB_LOG_JSON", parse_bool) {
        settings.logging.json = v;
    }
    if let Some(v) = read_parsed(&lookup, "RAIDHUB_MATCH_TIMEOUT_SECS", |s| {
        parse_u64_range(s, 1, 86_400)
    }) {
        settings.matches.timeout_secs = v;
    }
    if let Some(v) = read_parsed(&lookup, "RAIDHUB_HEADLESS_LIVENESS_SECS", |s| {
        parse_u64_range(s, 1, 86_400)
    }) {
        settings.headless.liveness_window_secs = v;
    }
    if let Some(v) = read_string(&lookup, "RAIDHUB_PROFILES_PATH") {
        settings.profiles_path = Some(v);
    }
}

/// Reject combinations the runtime cannot operate with.
pub fn validate(settings: &RaidhubSettings) -> Result<()> {
    let checks = [
        (settings.server.port == 0, "server.port must be non-zero"),
        (settings.server.max_send_queue == 0, "server.maxSendQueue must be at least 1"),
        (
            settings.server.heartbeat_interval_secs == 0,
            "server.heartbeatIntervalSecs must be at least 1",
        ),
        (
            settings.server.heartbeat_timeout_secs < settings.server.heartbeat_interval_secs,
            "server.heartbeatTimeoutSecs must not be shorter than the interval",
        ),
        (
            settings.server.request_timeout_secs == 0,
            "server.requestTimeoutSecs must be at least 1",
        ),
        (
            settings.matches.sweep_interval_secs == 0,
            "matches.sweepIntervalSecs must be at least 1",
        ),
        (settings.matches.timeout_secs == 0, "matches.timeoutSecs must be at least 1"),
        (
            settings.headless.liveness_window_secs == 0,
            "headless.livenessWindowSecs must be at least 1",
        ),
    ];
    match checks.iter().find(|(failed, _)| *failed) {
        Some((_, msg)) => Err(SettingsError::InvalidValue((*msg).to_string())),
        None => Ok(()),
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a boolean. Accepts `true`/`1`/`yes`/`on` and `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a `u16` within `min..=max`.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse a `u64` within `min..=max`.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

fn read_string<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|v| !v.is_empty())
}

fn read_parsed<F, T>(lookup: &F, name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
{
    let val = lookup(name)?;
    let result = parse(&val);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid env var, ignoring");
    }
    result
}
