//! Settings structures and their compiled defaults.
//!
//! Every struct uses `#[serde(default)]` so a partial JSON file only needs to
//! name the keys it changes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root settings object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RaidhubSettings {
    /// HTTP and WebSocket listener.
    pub server: ServerSettings,
    /// Match registry housekeeping.
    pub matches: MatchSettings,
    /// Headless worker pool timing.
    pub headless: HeadlessSettings,
    /// Log output.
    pub logging: LoggingSettings,
    /// Optional JSON file seeding the in-memory profile store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profiles_path: Option<String>,
}

/// Listener and connection settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Outbound notification queue length per connection.
    pub max_send_queue: usize,
    /// Seconds between heartbeat pings.
    pub heartbeat_interval_secs: u64,
    /// Seconds without a pong before a connection is closed.
    pub heartbeat_timeout_secs: u64,
    /// Per-request handler timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 6969,
            max_send_queue: 256,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            request_timeout_secs: 30,
        }
    }
}

impl ServerSettings {
    /// Heartbeat ping interval.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Pong deadline.
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    /// Handler timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Stale-match sweeping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchSettings {
    /// A match with no ping for this long is ended.
    pub timeout_secs: u64,
    /// How often the sweeper runs.
    pub sweep_interval_secs: u64,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            sweep_interval_secs: 60,
        }
    }
}

impl MatchSettings {
    /// Ping timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Sweep period.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Headless worker timing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeadlessSettings {
    /// A worker with no status report for this long is OFFLINE.
    pub liveness_window_secs: u64,
    /// How long a READY report is ignored after an assignment.
    pub assignment_timeout_secs: u64,
}

impl Default for HeadlessSettings {
    fn default() -> Self {
        Self {
            liveness_window_secs: 60,
            assignment_timeout_secs: 60,
        }
    }
}

impl HeadlessSettings {
    /// Liveness window.
    pub fn liveness_window(&self) -> Duration {
        Duration::from_secs(self.liveness_window_secs)
    }

    /// Assignment hold.
    pub fn assignment_timeout(&self) -> Duration {
        Duration::from_secs(self.assignment_timeout_secs)
    }
}

/// Log output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// One JSON object per line instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
