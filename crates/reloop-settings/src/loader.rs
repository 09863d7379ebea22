//! Settings loading: defaults → JSON file → environment overrides.
//!
//! The file layer is deep-merged over compiled defaults, so a settings
//! file only needs the keys it changes. Environment variables win over
//! both layers.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::errors::Result;
use crate::types::ReloopSettings;

/// Environment variable naming the settings file path.
pub const SETTINGS_PATH_ENV: &str = "RELOOP_SETTINGS_PATH";

/// Default settings file location: `~/.reloop/settings.json`.
#[must_use]
pub fn settings_path() -> PathBuf {
    if let Ok(path) = std::env::var(SETTINGS_PATH_ENV) {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".reloop").join("settings.json")
}

/// Recursively merge `overlay` into `base`.
///
/// Objects merge key-by-key; any other value type in `overlay` replaces
/// the `base` value wholesale.
#[must_use]
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                let _ = base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Load settings from the default path with env overrides applied.
///
/// A missing file is not an error — defaults are used. A malformed file
/// is an error so a typo doesn't silently revert the whole config.
pub fn load_settings() -> Result<ReloopSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific file path with env overrides applied.
pub fn load_settings_from_path(path: &Path) -> Result<ReloopSettings> {
    let defaults = serde_json::to_value(ReloopSettings::default())?;

    let merged = if path.exists() {
        let raw = std::fs::read_to_string(path)?;
        let file_value: Value = serde_json::from_str(&raw)?;
        deep_merge(defaults, file_value)
    } else {
        defaults
    };

    let mut settings: ReloopSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.validate();
    Ok(settings)
}

/// Apply `RELOOP_*` environment variable overrides.
///
/// Unparsable values are ignored with a warning rather than failing
/// startup.
fn apply_env_overrides(settings: &mut ReloopSettings) {
    fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
        let raw = std::env::var(name).ok()?;
        match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%name, %raw, "ignoring unparsable env override");
                None
            }
        }
    }

    if let Ok(host) = std::env::var("RELOOP_HOST") {
        settings.server.host = host;
    }
    if let Some(port) = parsed::<u16>("RELOOP_PORT") {
        settings.server.port = port;
    }
    if let Some(secs) = parsed::<u64>("RELOOP_HEARTBEAT_INTERVAL_SECS") {
        settings.events.heartbeat_interval_secs = secs;
    }
    if let Some(secs) = parsed::<u64>("RELOOP_IDLE_TIMEOUT_SECS") {
        settings.events.idle_timeout_secs = secs;
    }
    if let Some(capacity) = parsed::<usize>("RELOOP_CHANNEL_CAPACITY") {
        settings.events.channel_capacity = capacity;
    }
    if let Ok(role) = std::env::var("RELOOP_DEFAULT_ROLE") {
        settings.events.default_role = role;
    }
    if let Ok(level) = std::env::var("RELOOP_LOG_LEVEL") {
        settings.logging.level = level;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
