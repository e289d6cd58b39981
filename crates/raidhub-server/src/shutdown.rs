//! Graceful shutdown of the server and its background tasks.

use std::time::Duration;

use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long background tasks get to stop before being abandoned.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Owns the token every long-running task watches.
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Not yet shutting down.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// A handle on the shared token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Signal every task to stop.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel the token, then give `handles` up to `timeout` (10s when
    /// `None`) to finish. Returns how many had to be aborted.
    pub async fn graceful_shutdown(
        &self,
        handles: Vec<JoinHandle<()>>,
        timeout: Option<Duration>,
    ) -> usize {
        let grace = timeout.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT);
        self.shutdown();
        info!(tasks = handles.len(), ?grace, "draining tasks");

        let abort_handles: Vec<AbortHandle> = handles.iter().map(JoinHandle::abort_handle).collect();
        let drained = tokio::time::timeout(grace, futures::future::join_all(handles)).await;
        if drained.is_ok() {
            return 0;
        }

        let stragglers: Vec<_> = abort_handles.into_iter().filter(|h| !h.is_finished()).collect();
        warn!(stragglers = stragglers.len(), ?grace, "tasks outlived the grace period, aborting");
        for handle in &stragglers {
            handle.abort();
        }
        stragglers.len()
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
