//! Runtime error types.
//!
//! These are expected outcomes returned to callers as values, never panics.

use thiserror::Error;

/// Why a headless raid start was refused.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HeadlessStartError {
    /// No worker in the pool is ready and live.
    #[error("No headless clients available.")]
    NoWorkersAvailable,

    /// The requester is itself a registered headless worker.
    #[error(
        "You are trying to connect to a headless client while having Fika.Headless installed. Please remove Fika.Headless from your client and try again."
    )]
    RequesterIsWorker,

    /// Every candidate was unusable by the time selection ran.
    #[error("No headless client available at this time.")]
    NoWorkerReady,
}

impl HeadlessStartError {
    /// Machine-readable category for logs and metrics.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoWorkersAvailable => "no_workers_available",
            Self::RequesterIsWorker => "requester_is_worker",
            Self::NoWorkerReady => "no_worker_ready",
        }
    }

    /// Whether retrying later may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::RequesterIsWorker)
    }
}

/// Failures of the external profile store or player registrar.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// No profile exists for the session.
    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    /// Reading the profile seed file failed.
    #[error("failed to read profiles: {0}")]
    Io(#[from] std::io::Error),

    /// The profile seed file is malformed.
    #[error("failed to parse profiles: {0}")]
    Json(#[from] serde_json::Error),

    /// The registrar rejected the registration.
    #[error("player registration rejected: {0}")]
    Rejected(String),
}
