//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`FeedscopeSettings::default()`]
//! 2. If `~/.feedscope/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `FEEDSCOPE_*` environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::FeedscopeSettings;

/// Window size override.
pub const ENV_MAX_BLOCKS: &str = "FEEDSCOPE_MAX_BLOCKS";
/// Initial emission delay override.
pub const ENV_INITIAL_EMIT_DELAY_MS: &str = "FEEDSCOPE_INITIAL_EMIT_DELAY_MS";
/// Log level override.
pub const ENV_LOG_LEVEL: &str = "FEEDSCOPE_LOG_LEVEL";

/// Resolve the path to the settings file (`~/.feedscope/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".feedscope").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<FeedscopeSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON, or a merged document that
/// fails validation, is an error.
pub fn load_settings_from_path(path: &Path) -> Result<FeedscopeSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Defaults merged with the file at `path`, without env overrides.
pub fn load_file_layer(path: &Path) -> Result<FeedscopeSettings> {
    let defaults = serde_json::to_value(FeedscopeSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let settings: FeedscopeSettings = serde_json::from_value(merged)?;
    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &FeedscopeSettings) -> Result<()> {
    if settings.devtools.default_max_blocks == 0 {
        return Err(SettingsError::InvalidValue(
            "devtools.defaultMaxBlocks must be at least 1".into(),
        ));
    }
    Ok(())
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

/// Apply overrides from the process environment.
pub fn apply_env_overrides(settings: &mut FeedscopeSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable lookup.
///
/// Invalid or out-of-range values are logged and ignored.
pub fn apply_overrides_from(
    settings: &mut FeedscopeSettings,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = read_usize(&lookup, ENV_MAX_BLOCKS, 1, 10_000) {
        settings.devtools.default_max_blocks = v;
    }
    if let Some(v) = read_u64(&lookup, ENV_INITIAL_EMIT_DELAY_MS, 0, 60_000) {
        settings.devtools.initial_emit_delay_ms = v;
    }
    if let Some(v) = lookup(ENV_LOG_LEVEL).filter(|v| !v.is_empty()) {
        settings.logging.level = v;
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

fn read_u64(lookup: &impl Fn(&str) -> Option<String>, name: &str, min: u64, max: u64) -> Option<u64> {
    let val = lookup(name)?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_usize(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    min: usize,
    max: usize,
) -> Option<usize> {
    let val = lookup(name)?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}
