//! Registry of live matches.
//!
//! The registry is the single owner of [`Match`] lifetimes. All state sits
//! behind one `RwLock`; notifications and lifecycle events are emitted only
//! after the lock is released so a slow client never holds up a mutation.

use std::collections::{BTreeSet, HashMap};
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use raidhub_core::protocol::CreateRaidRequest;
use raidhub_core::raid::{EndReason, Match, MatchStatus, MatchSummary};
use raidhub_core::{Notification, Notifier, ServerId, SessionId};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Capacity of the lifecycle event buffer. Slow subscribers lag, they do not
/// block the registry.
const LIFECYCLE_CAPACITY: usize = 256;

/// Registry state changes, for collaborators that care about match lifetimes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchLifecycle {
    /// A match was accepted.
    Created {
        /// Match key.
        server_id: ServerId,
    },
    /// A match was removed.
    Ended {
        /// Match key.
        server_id: ServerId,
        /// Why it ended.
        reason: EndReason,
        /// Host and joined players at the time it ended.
        players: Vec<SessionId>,
    },
}

struct MatchEntry {
    record: Match,
    last_ping: Instant,
}

/// Owns every live match.
pub struct MatchRegistry {
    matches: RwLock<HashMap<ServerId, MatchEntry>>,
    notifier: Arc<dyn Notifier>,
    events: broadcast::Sender<MatchLifecycle>,
}

impl MatchRegistry {
    /// Create an empty registry delivering end notices through `notifier`.
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        let (events, _) = broadcast::channel(LIFECYCLE_CAPACITY);
        Self {
            matches: RwLock::new(HashMap::new()),
            notifier,
            events,
        }
    }

    /// Insert a new match. Returns `false` without touching anything when the
    /// server id is already live.
    pub fn create_match(&self, request: CreateRaidRequest) -> bool {
        let server_id = request.server_id.clone();
        {
            let mut matches = self.matches.write();
            match matches.entry(server_id.clone()) {
                Entry::Occupied(_) => {
                    warn!(%server_id, "match already exists, create rejected");
                    return false;
                }
                Entry::Vacant(slot) => {
                    let _ = slot.insert(MatchEntry {
                        record: Match {
                            server_id: request.server_id,
                            host_username: request.host_username,
                            timestamp: request.timestamp,
                            game_version: request.game_version,
                            fika_version: request.fika_version,
                            raid_code: request.raid_code,
                            ips: request.ips,
                            port: request.port,
                            nat_punch: request.nat_punch,
                            is_headless: request.is_headless,
                            settings: request.settings,
                            raid_config: request.raid_config,
                            players: BTreeSet::new(),
                            status: MatchStatus::Loading,
                            created_at: Utc::now(),
                        },
                        last_ping: Instant::now(),
                    });
                }
            }
        }
        info!(%server_id, "match created");
        let _ = self.events.send(MatchLifecycle::Created { server_id });
        true
    }

    /// Snapshot of a match, or `None` if it is not live.
    pub fn get_match(&self, server_id: &ServerId) -> Option<Match> {
        let found = self.matches.read().get(server_id).map(|e| e.record.clone());
        if found.is_none() {
            debug!(%server_id, "match not found");
        }
        found
    }

    /// Whether a match is live.
    pub fn contains(&self, server_id: &ServerId) -> bool {
        self.matches.read().contains_key(server_id)
    }

    /// Number of live matches.
    pub fn count(&self) -> usize {
        self.matches.read().len()
    }

    /// Add a joined participant. Returns `false` when the match is not live.
    ///
    /// The host is an implicit member and is never listed.
    pub fn add_player(&self, server_id: &ServerId, profile_id: &SessionId) -> bool {
        let mut matches = self.matches.write();
        let Some(entry) = matches.get_mut(server_id) else {
            debug!(%server_id, %profile_id, "add player to missing match");
            return false;
        };
        if !server_id.is_hosted_by(profile_id) && entry.record.players.insert(profile_id.clone()) {
            debug!(%server_id, %profile_id, "player added");
        }
        true
    }

    /// Remove a joined participant. Removing an absent player, or from an
    /// absent match, is a no-op. Returns whether anything was removed.
    pub fn remove_player(&self, server_id: &ServerId, profile_id: &SessionId) -> bool {
        let removed = self
            .matches
            .write()
            .get_mut(server_id)
            .is_some_and(|e| e.record.players.remove(profile_id));
        debug!(%server_id, %profile_id, removed, "remove player");
        removed
    }

    /// Delete a match and tell its host and players why.
    ///
    /// Idempotent: returns `false` if the match was not live.
    pub fn end_match(&self, server_id: &ServerId, reason: EndReason) -> bool {
        let removed = self.matches.write().remove(server_id);
        match removed {
            Some(entry) => {
                self.announce_end(entry.record, reason);
                true
            }
            None => {
                debug!(%server_id, %reason, "end of missing match ignored");
                false
            }
        }
    }

    /// Refresh a match's keep-alive. Returns `false` when it is not live.
    pub fn ping_match(&self, server_id: &ServerId) -> bool {
        match self.matches.write().get_mut(server_id) {
            Some(entry) => {
                entry.last_ping = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Record host-reported progress. Returns `false` when it is not live.
    pub fn set_status(&self, server_id: &ServerId, status: MatchStatus) -> bool {
        let mut matches = self.matches.write();
        let Some(entry) = matches.get_mut(server_id) else {
            return false;
        };
        if entry.record.status != status {
            debug!(%server_id, from = ?entry.record.status, to = ?status, "match status changed");
            entry.record.status = status;
        }
        true
    }

    /// Summaries of every live match, ordered by creation time.
    pub fn list_matches(&self) -> Vec<MatchSummary> {
        let matches = self.matches.read();
        let mut records: Vec<&Match> = matches.values().map(|e| &e.record).collect();
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.server_id.cmp(&b.server_id))
        });
        records.into_iter().map(MatchSummary::from).collect()
    }

    /// End every match whose last ping is older than `timeout`.
    ///
    /// Returns the ended server ids.
    pub fn end_stale_matches(&self, timeout: Duration) -> Vec<ServerId> {
        let now = Instant::now();
        let stale: Vec<Match> = {
            let mut matches = self.matches.write();
            let expired: Vec<ServerId> = matches
                .iter()
                .filter(|(_, e)| now.saturating_duration_since(e.last_ping) > timeout)
                .map(|(id, _)| id.clone())
                .collect();
            expired
                .iter()
                .filter_map(|id| matches.remove(id))
                .map(|e| e.record)
                .collect()
        };

        let mut ended = Vec::with_capacity(stale.len());
        for record in stale {
            ended.push(record.server_id.clone());
            self.announce_end(record, EndReason::PingTimeout);
        }
        ended
    }

    /// Receive [`MatchLifecycle`] events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<MatchLifecycle> {
        self.events.subscribe()
    }

    fn announce_end(&self, record: Match, reason: EndReason) {
        let participants = record.participants();
        let notice = Notification::MatchEnded {
            server_id: record.server_id.clone(),
            reason,
        };
        let delivered = participants
            .iter()
            .filter(|p| self.notifier.send_to(p, &notice))
            .count();
        info!(
            server_id = %record.server_id,
            %reason,
            participants = participants.len(),
            delivered,
            "match ended"
        );
        let _ = self.events.send(MatchLifecycle::Ended {
            server_id: record.server_id,
            reason,
            players: participants,
        });
    }
}
