//! Server configuration.

use std::time::Duration;

use raidhub_settings::RaidhubSettings;

/// Runtime parameters of the HTTP server and its background tasks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` picks a free port).
    pub port: u16,
    /// Outbound notification queue length per connection.
    pub max_send_queue: usize,
    /// Interval between server pings.
    pub heartbeat_interval: Duration,
    /// Close a connection after this long without a pong.
    pub heartbeat_timeout: Duration,
    /// Upper bound on a single handler call.
    pub request_timeout: Duration,
    /// A match without a ping for this long is ended.
    pub match_timeout: Duration,
    /// How often stale matches are swept.
    pub sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_send_queue: 256,
            heartbeat_interval: Duration::from_secs(30),
            heartbeat_timeout: Duration::from_secs(90),
            request_timeout: Duration::from_secs(30),
            match_timeout: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl From<&RaidhubSettings> for ServerConfig {
    fn from(settings: &RaidhubSettings) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            max_send_queue: settings.server.max_send_queue,
            heartbeat_interval: settings.server.heartbeat_interval(),
            heartbeat_timeout: settings.server.heartbeat_timeout(),
            request_timeout: settings.server.request_timeout(),
            match_timeout: settings.matches.timeout(),
            sweep_interval: settings.matches.sweep_interval(),
        }
    }
}

impl ServerConfig {
    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
