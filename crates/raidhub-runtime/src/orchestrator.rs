//! Request-handling façade over the match registry, the worker pool and the
//! notification channel.
//!
//! The orchestrator owns neither registry. It never holds one registry's lock
//! while calling into the other.

use std::sync::Arc;

use raidhub_core::headless::HeadlessWorkerInfo;
use raidhub_core::protocol::{
    CreateRaidRequest, CreateRaidResponse, GetHostResponse, HeadlessAvailabilityResponse,
    HeadlessStatusRequest, HeadlessStatusResponse, JoinRaidResponse, LeaveRaidRequest,
    PlayerSpawnRequest, RaidSettingsResponse, RegisterPlayerRequest, ServerIdRequest,
    SetStatusRequest, StartHeadlessRequest, UpdateResponse,
};
use raidhub_core::raid::{EndReason, MatchSummary};
use raidhub_core::{Notification, Notifier, SessionId};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::collaborators::{PlayerRegistrar, ProfileStore};
use crate::errors::{CollaboratorError, HeadlessStartError};
use crate::headless::HeadlessWorkerPool;
use crate::matches::MatchRegistry;

/// Composes the registries and the notifier into the public operations.
pub struct SessionOrchestrator {
    matches: Arc<MatchRegistry>,
    pool: Arc<HeadlessWorkerPool>,
    notifier: Arc<dyn Notifier>,
    profiles: Arc<dyn ProfileStore>,
    registrar: Arc<dyn PlayerRegistrar>,
}

impl SessionOrchestrator {
    /// Wire an orchestrator from its parts.
    pub fn new(
        matches: Arc<MatchRegistry>,
        pool: Arc<HeadlessWorkerPool>,
        notifier: Arc<dyn Notifier>,
        profiles: Arc<dyn ProfileStore>,
        registrar: Arc<dyn PlayerRegistrar>,
    ) -> Self {
        Self {
            matches,
            pool,
            notifier,
            profiles,
            registrar,
        }
    }

    /// The match registry.
    pub fn matches(&self) -> &Arc<MatchRegistry> {
        &self.matches
    }

    /// The worker pool.
    pub fn pool(&self) -> &Arc<HeadlessWorkerPool> {
        &self.pool
    }

    /// Announce and register a new raid.
    #[instrument(skip_all, fields(server_id = %request.server_id))]
    pub fn create(&self, request: CreateRaidRequest) -> CreateRaidResponse {
        let started = Notification::StartedRaid {
            nickname: request.host_username.clone(),
            location: request.settings.location.clone(),
        };
        let recipients = self.notifier.broadcast(&started);
        debug!(recipients, "raid start broadcast");

        CreateRaidResponse {
            success: self.matches.create_match(request),
        }
    }

    /// Connection details needed to join, or `None` if the match is gone.
    pub fn join(&self, request: &ServerIdRequest) -> Option<JoinRaidResponse> {
        self.matches
            .get_match(&request.server_id)
            .map(|m| JoinRaidResponse {
                server_id: m.server_id,
                timestamp: m.timestamp,
                game_version: m.game_version,
                fika_version: m.fika_version,
                raid_code: m.raid_code,
            })
    }

    /// A player leaves. The host leaving ends the whole match.
    #[instrument(skip_all, fields(server_id = %request.server_id, profile_id = %request.profile_id))]
    pub fn leave(&self, request: &LeaveRaidRequest) {
        if request.server_id.is_hosted_by(&request.profile_id) {
            let _ = self
                .matches
                .end_match(&request.server_id, EndReason::HostShutdown);
            return;
        }
        let _ = self
            .matches
            .remove_player(&request.server_id, &request.profile_id);
    }

    /// Where to connect, or `None` if the match is gone.
    pub fn get_host(&self, request: &ServerIdRequest) -> Option<GetHostResponse> {
        self.matches
            .get_match(&request.server_id)
            .map(|m| GetHostResponse {
                ips: m.ips,
                port: m.port,
                nat_punch: m.nat_punch,
                is_headless: m.is_headless,
            })
    }

    /// Raid configuration subset, or `None` if the match is gone.
    pub fn get_settings(&self, request: &ServerIdRequest) -> Option<RaidSettingsResponse> {
        self.matches
            .get_match(&request.server_id)
            .map(|m| RaidSettingsResponse::from(&m.raid_config))
    }

    /// Assign a headless worker to `requester` and send it the raid command.
    ///
    /// A worker whose connection refuses the command is released and the next
    /// candidate is tried.
    #[instrument(skip_all, fields(%requester))]
    pub fn headless_start(
        &self,
        requester: &SessionId,
        request: &StartHeadlessRequest,
    ) -> Result<SessionId, HeadlessStartError> {
        // Availability first: a busy worker asking for a worker is told none are free.
        if !self.pool.is_available() {
            debug!("no headless workers available");
            return Err(HeadlessStartError::NoWorkersAvailable);
        }
        if self.pool.is_worker(requester) {
            warn!("headless worker tried to request a headless worker");
            return Err(HeadlessStartError::RequesterIsWorker);
        }

        let mut refused: Vec<SessionId> = Vec::new();
        loop {
            let worker = self.pool.select_and_assign_excluding(requester, &refused)?;
            self.transfer_progression(requester, &worker);

            let command = Notification::HeadlessStartRaid {
                requester_session_id: requester.clone(),
                parameters: request.parameters.clone(),
            };
            if self.notifier.send_to(&worker, &command) {
                info!(worker_id = %worker, "sent fikaHeadlessStartRaid");
                return Ok(worker);
            }

            warn!(worker_id = %worker, "headless worker refused raid command, trying next");
            let _ = self.pool.release(&worker);
            refused.push(worker);
        }
    }

    /// Record a worker's status report and echo the normalized value.
    pub fn headless_status(
        &self,
        worker: &SessionId,
        request: &HeadlessStatusRequest,
    ) -> raidhub_core::Result<HeadlessStatusResponse> {
        let status = request.status.normalize()?;
        let state = self.pool.report_status(worker, status);
        debug!(worker_id = %worker, ?status, ?state, "headless status reported");
        Ok(HeadlessStatusResponse {
            session_id: worker.clone(),
            status,
        })
    }

    /// Whether a headless raid could start right now.
    pub fn headless_get_status(&self) -> HeadlessAvailabilityResponse {
        HeadlessAvailabilityResponse {
            available: self.pool.is_available(),
        }
    }

    /// Hand an in-raid registration to the registrar.
    pub fn register_player(
        &self,
        session: &SessionId,
        request: &RegisterPlayerRequest,
    ) -> Result<(), CollaboratorError> {
        self.registrar.register_player(session, request)
    }

    /// Host keep-alive.
    pub fn ping(&self, request: &ServerIdRequest) -> UpdateResponse {
        UpdateResponse {
            success: self.matches.ping_match(&request.server_id),
        }
    }

    /// A player spawned into a match.
    pub fn player_spawn(&self, request: &PlayerSpawnRequest) -> UpdateResponse {
        UpdateResponse {
            success: self
                .matches
                .add_player(&request.server_id, &request.profile_id),
        }
    }

    /// Host-reported match progress.
    pub fn set_status(&self, request: &SetStatusRequest) -> UpdateResponse {
        UpdateResponse {
            success: self.matches.set_status(&request.server_id, request.status),
        }
    }

    /// Live matches for the raid browser.
    pub fn list_raids(&self) -> Vec<MatchSummary> {
        self.matches.list_matches()
    }

    /// Every registered worker with its effective state.
    pub fn list_headless(&self) -> Vec<HeadlessWorkerInfo> {
        self.pool.workers()
    }

    /// Whether `session` has an open notification connection.
    pub fn is_connected(&self, session: &SessionId) -> bool {
        self.notifier.is_connected(session)
    }

    /// A notification connection opened or closed.
    pub fn connection_changed(&self, session: &SessionId) {
        if self.pool.is_worker(session) {
            self.pool.refresh_availability();
        }
    }

    /// Broadcast `HeadlessAvailable` every time the pool turns available,
    /// until `cancel` fires.
    pub fn spawn_availability_watcher(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let mut events = this.pool.subscribe_turned_available();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    event = events.recv() => match event {
                        Ok(()) => {}
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            warn!(missed, "availability watcher lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
                let recipients = this.notifier.broadcast(&Notification::HeadlessAvailable);
                info!(recipients, "headless availability broadcast");
            }
            debug!("availability watcher stopped");
        })
    }

    fn transfer_progression(&self, requester: &SessionId, worker: &SessionId) {
        let progression = match self.profiles.progression(requester) {
            Ok(p) => p,
            Err(error) => {
                warn!(%requester, %error, "requester profile unavailable, progression not transferred");
                return;
            }
        };
        match self
            .profiles
            .set_progression(worker, progression.level, progression.experience)
        {
            Ok(()) => debug!(
                worker_id = %worker,
                level = progression.level,
                experience = progression.experience,
                "progression transferred to headless profile"
            ),
            Err(error) => warn!(worker_id = %worker, %error, "headless profile not updated"),
        }
    }
}
