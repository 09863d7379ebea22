//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and
//! `#[serde(default)]` so partial JSON files are valid — missing fields
//! get their production default during deserialization.

use serde::{Deserialize, Serialize};

/// Root settings for the reloop service.
///
/// Loaded from an optional JSON file with defaults applied for missing
/// fields; `RELOOP_*` environment variables override individual values.
///
/// # JSON Format
///
/// ```json
/// {
///   "server": { "port": 8085 },
///   "events": { "heartbeatIntervalSecs": 30 }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReloopSettings {
    /// Settings schema version.
    pub version: String,
    /// HTTP server network settings.
    pub server: ServerSettings,
    /// Fan-out and connection lifecycle settings.
    pub events: EventSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for ReloopSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            server: ServerSettings::default(),
            events: EventSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl ReloopSettings {
    /// Correct out-of-range values instead of rejecting them, so a bad
    /// settings file degrades to working behavior with a warning.
    pub fn validate(&mut self) {
        if self.events.heartbeat_interval_secs == 0 {
            tracing::warn!("heartbeatIntervalSecs must be at least 1, correcting");
            self.events.heartbeat_interval_secs = 1;
        }
        if self.events.idle_timeout_secs == 0 {
            tracing::warn!("idleTimeoutSecs must be at least 1, correcting");
            self.events.idle_timeout_secs = 1;
        }
        if self.events.channel_capacity == 0 {
            tracing::warn!("channelCapacity must be at least 1, correcting");
            self.events.channel_capacity = 1;
        }
    }
}

/// HTTP server network settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8085,
        }
    }
}

/// Fan-out and connection lifecycle settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventSettings {
    /// Liveness pulse period in seconds.
    pub heartbeat_interval_secs: u64,
    /// Per-connection idle timeout in seconds. A subscription that
    /// receives no event for this long is closed and removed.
    pub idle_timeout_secs: u64,
    /// Bounded per-connection buffer size. A connection whose buffer is
    /// full fails its push and is pruned.
    pub channel_capacity: usize,
    /// Role applied when a subscription request omits one.
    pub default_role: String,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 30,
            idle_timeout_secs: 30 * 60,
            channel_capacity: 64,
            default_role: "Citizen".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum log level (`error`, `warn`, `info`, `debug`, `trace`).
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
