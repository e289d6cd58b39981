//! Pool of headless workers and the raid-start scheduler.
//!
//! Workers register implicitly with their first status report and are never
//! removed. A worker is usable only when its stored state is READY, its last
//! report is inside the liveness window, and its notification connection is
//! open. Selection holds the pool lock across scan and transition, so two
//! requesters can never be handed the same worker.
//!
//! Lock order is pool, then notifier. The notifier never calls back into the
//! pool.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use raidhub_core::headless::{HeadlessStatus, HeadlessWorkerInfo, ReportedStatus};
use raidhub_core::{Notifier, SessionId};
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::HeadlessStartError;

/// Pool timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// A worker silent for longer than this is OFFLINE.
    pub liveness_window: Duration,
    /// READY reports arriving this soon after an assignment do not release it.
    pub assignment_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            liveness_window: Duration::from_secs(60),
            assignment_timeout: Duration::from_secs(60),
        }
    }
}

struct WorkerEntry {
    state: HeadlessStatus,
    last_ping: Instant,
    last_ping_at: DateTime<Utc>,
    assigned_requester: Option<SessionId>,
    assigned_at: Option<Instant>,
}

impl WorkerEntry {
    fn is_stale(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.last_ping) > window
    }

    fn effective_state(&self, now: Instant, window: Duration) -> HeadlessStatus {
        if self.is_stale(now, window) {
            HeadlessStatus::Offline
        } else {
            self.state
        }
    }

    fn clear_assignment(&mut self) {
        self.assigned_requester = None;
        self.assigned_at = None;
    }
}

/// Owns every registered headless worker.
pub struct HeadlessWorkerPool {
    workers: Mutex<BTreeMap<SessionId, WorkerEntry>>,
    connections: Arc<dyn Notifier>,
    config: PoolConfig,
    availability: watch::Sender<bool>,
    turned_available: broadcast::Sender<()>,
}

impl HeadlessWorkerPool {
    /// Create an empty pool. `connections` answers the liveness question.
    pub fn new(connections: Arc<dyn Notifier>, config: PoolConfig) -> Self {
        let (availability, _) = watch::channel(false);
        let (turned_available, _) = broadcast::channel(16);
        Self {
            workers: Mutex::new(BTreeMap::new()),
            connections,
            config,
            availability,
            turned_available,
        }
    }

    /// Whether any worker is READY, fresh, and connected.
    pub fn is_available(&self) -> bool {
        let workers = self.workers.lock();
        self.any_usable(&workers, Instant::now())
    }

    /// Whether `session` is a registered worker.
    pub fn is_worker(&self, session: &SessionId) -> bool {
        self.workers.lock().contains_key(session)
    }

    /// Number of registered workers, stale ones included.
    pub fn count(&self) -> usize {
        self.workers.lock().len()
    }

    /// Record a status report, registering the worker on first contact.
    ///
    /// Returns the worker's stored state after the report.
    pub fn report_status(&self, session: &SessionId, reported: ReportedStatus) -> HeadlessStatus {
        let now = Instant::now();
        let mut workers = self.workers.lock();

        let entry = workers.entry(session.clone()).or_insert_with(|| {
            info!(worker_id = %session, "headless worker registered");
            WorkerEntry {
                state: HeadlessStatus::Ready,
                last_ping: now,
                last_ping_at: Utc::now(),
                assigned_requester: None,
                assigned_at: None,
            }
        });
        entry.last_ping = now;
        entry.last_ping_at = Utc::now();

        let previous = entry.state;
        entry.state = match (previous, reported) {
            (HeadlessStatus::Assigned, ReportedStatus::Ready)
                if entry
                    .assigned_at
                    .is_some_and(|at| now.saturating_duration_since(at) <= self.config.assignment_timeout) =>
            {
                HeadlessStatus::Assigned
            }
            (_, ReportedStatus::Ready) => {
                if let Some(requester) = entry.assigned_requester.take() {
                    debug!(worker_id = %session, %requester, "assignment released by READY report");
                }
                entry.clear_assignment();
                HeadlessStatus::Ready
            }
            (_, ReportedStatus::InRaid) => HeadlessStatus::InRaid,
        };
        let state = entry.state;

        if previous != state {
            debug!(worker_id = %session, from = ?previous, to = ?state, "headless state changed");
        }
        self.publish_availability(&workers, now);
        state
    }

    /// Assign the first usable worker to `requester`.
    pub fn select_and_assign(&self, requester: &SessionId) -> Result<SessionId, HeadlessStartError> {
        self.select_and_assign_excluding(requester, &[])
    }

    /// Like [`select_and_assign`](Self::select_and_assign), skipping the
    /// workers in `exclude`.
    pub fn select_and_assign_excluding(
        &self,
        requester: &SessionId,
        exclude: &[SessionId],
    ) -> Result<SessionId, HeadlessStartError> {
        let now = Instant::now();
        let mut workers = self.workers.lock();

        if workers.contains_key(requester) {
            warn!(%requester, "headless worker tried to request a headless worker");
            return Err(HeadlessStartError::RequesterIsWorker);
        }

        let window = self.config.liveness_window;
        let chosen = workers
            .iter()
            .find(|(id, entry)| {
                entry.state == HeadlessStatus::Ready
                    && !entry.is_stale(now, window)
                    && !exclude.contains(id)
                    && self.connections.is_connected(id)
            })
            .map(|(id, _)| id.clone());

        let Some(worker) = chosen else {
            debug!(%requester, "no usable headless worker");
            return Err(HeadlessStartError::NoWorkerReady);
        };

        if let Some(entry) = workers.get_mut(&worker) {
            entry.state = HeadlessStatus::Assigned;
            entry.assigned_requester = Some(requester.clone());
            entry.assigned_at = Some(now);
        }
        info!(worker_id = %worker, %requester, "headless worker assigned");
        self.publish_availability(&workers, now);
        Ok(worker)
    }

    /// Return an ASSIGNED worker to READY. Returns `false` if it was not
    /// assigned.
    pub fn release(&self, worker: &SessionId) -> bool {
        let now = Instant::now();
        let mut workers = self.workers.lock();
        let released = match workers.get_mut(worker) {
            Some(entry) if entry.state == HeadlessStatus::Assigned => {
                entry.state = HeadlessStatus::Ready;
                entry.clear_assignment();
                true
            }
            _ => false,
        };
        if released {
            debug!(worker_id = %worker, "headless assignment released");
            self.publish_availability(&workers, now);
        }
        released
    }

    /// Recompute availability after something outside the pool changed, such
    /// as a worker connection opening or closing.
    pub fn refresh_availability(&self) {
        let workers = self.workers.lock();
        self.publish_availability(&workers, Instant::now());
    }

    /// Observe availability. The value is `true` while some worker is usable.
    pub fn subscribe_availability(&self) -> watch::Receiver<bool> {
        self.availability.subscribe()
    }

    /// One event per false-to-true transition. Unlike the watch, flips that
    /// happen between two reads are not coalesced.
    pub fn subscribe_turned_available(&self) -> broadcast::Receiver<()> {
        self.turned_available.subscribe()
    }

    /// Snapshot of one worker with its effective state.
    pub fn worker(&self, session: &SessionId) -> Option<HeadlessWorkerInfo> {
        let now = Instant::now();
        self.workers
            .lock()
            .get(session)
            .map(|entry| self.info(session, entry, now))
    }

    /// Snapshot of every worker, in selection order.
    pub fn workers(&self) -> Vec<HeadlessWorkerInfo> {
        let now = Instant::now();
        self.workers
            .lock()
            .iter()
            .map(|(id, entry)| self.info(id, entry, now))
            .collect()
    }

    /// The worker currently serving `requester`, if any.
    pub fn assignment_for(&self, requester: &SessionId) -> Option<SessionId> {
        self.workers
            .lock()
            .iter()
            .find(|(_, entry)| entry.assigned_requester.as_ref() == Some(requester))
            .map(|(id, _)| id.clone())
    }

    fn info(&self, id: &SessionId, entry: &WorkerEntry, now: Instant) -> HeadlessWorkerInfo {
        HeadlessWorkerInfo {
            session_id: id.clone(),
            state: entry.effective_state(now, self.config.liveness_window),
            last_ping: entry.last_ping_at,
            assigned_requester: entry.assigned_requester.clone(),
        }
    }

    fn any_usable(&self, workers: &BTreeMap<SessionId, WorkerEntry>, now: Instant) -> bool {
        workers.iter().any(|(id, entry)| {
            entry.effective_state(now, self.config.liveness_window) == HeadlessStatus::Ready
                && self.connections.is_connected(id)
        })
    }

    fn publish_availability(&self, workers: &BTreeMap<SessionId, WorkerEntry>, now: Instant) {
        let available = self.any_usable(workers, now);
        let changed = self.availability.send_if_modified(|current| {
            if *current == available {
                false
            } else {
                *current = available;
                true
            }
        });
        if changed {
            info!(available, "headless availability changed");
            if available {
                let _ = self.turned_available.send(());
            }
        }
    }
}
