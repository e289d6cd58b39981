//! `/health` endpoint body.

use std::time::Instant;

use serde::Serialize;

/// Health check response.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"ok"` while the server runs.
    pub status: &'static str,
    /// Seconds since startup.
    pub uptime_secs: u64,
    /// Open notification connections.
    pub connections: usize,
    /// Live matches.
    pub matches: usize,
    /// Registered headless workers, stale ones included.
    pub headless_workers: usize,
}

/// Build a health response from live counters.
pub fn health_check(
    start_time: Instant,
    connections: usize,
    matches: usize,
    headless_workers: usize,
) -> HealthResponse {
    HealthResponse {
        status: "ok",
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
        matches,
        headless_workers,
    }
}
