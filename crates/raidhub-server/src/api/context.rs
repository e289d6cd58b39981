//! Shared state handed to every handler.

use std::sync::Arc;
use std::time::Instant;

use raidhub_runtime::SessionOrchestrator;

use crate::websocket::NotificationChannel;

/// Dependencies of the API handlers.
pub struct ApiContext {
    /// Session orchestration over matches and workers.
    pub orchestrator: Arc<SessionOrchestrator>,
    /// Open notification connections.
    pub channel: Arc<NotificationChannel>,
    /// When the server started.
    pub start_time: Instant,
}

impl ApiContext {
    /// Context starting its uptime clock now.
    pub fn new(orchestrator: Arc<SessionOrchestrator>, channel: Arc<NotificationChannel>) -> Self {
        Self {
            orchestrator,
            channel,
            start_time: Instant::now(),
        }
    }
}
