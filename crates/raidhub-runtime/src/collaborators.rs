//! Interfaces to the systems the coordinator consumes but does not own:
//! player profiles and in-raid player registration.
//!
//! In-memory implementations back the standalone binary and the tests.

use std::collections::HashMap;
use std::path::Path;

use dashmap::DashMap;
use raidhub_core::SessionId;
use raidhub_core::protocol::RegisterPlayerRequest;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::CollaboratorError;

/// Level and experience of a player profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progression {
    /// Display name.
    pub nickname: String,
    /// Character level.
    pub level: u32,
    /// Total experience.
    pub experience: u64,
}

/// Player profile lookup.
pub trait ProfileStore: Send + Sync {
    /// Current progression of `session`'s profile.
    fn progression(&self, session: &SessionId) -> Result<Progression, CollaboratorError>;

    /// Overwrite level and experience of `session`'s profile.
    fn set_progression(
        &self,
        session: &SessionId,
        level: u32,
        experience: u64,
    ) -> Result<(), CollaboratorError>;
}

/// Sink for in-raid player registrations.
pub trait PlayerRegistrar: Send + Sync {
    /// Register `session` for the raid described by `request`.
    fn register_player(
        &self,
        session: &SessionId,
        request: &RegisterPlayerRequest,
    ) -> Result<(), CollaboratorError>;
}

/// Profiles held in memory, optionally seeded from a JSON file of the form
/// `{"<sessionId>": {"nickname": "...", "level": 1, "experience": 0}}`.
#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: DashMap<SessionId, Progression>,
}

impl MemoryProfileStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded from `path`.
    pub fn load_from_path(path: &Path) -> Result<Self, CollaboratorError> {
        let content = std::fs::read_to_string(path)?;
        let seed: HashMap<SessionId, Progression> = serde_json::from_str(&content)?;
        info!(?path, profiles = seed.len(), "profiles loaded");
        let store = Self::new();
        for (id, progression) in seed {
            store.insert(id, progression);
        }
        Ok(store)
    }

    /// Add or replace a profile.
    pub fn insert(&self, session: SessionId, progression: Progression) {
        let _ = self.profiles.insert(session, progression);
    }

    /// Number of profiles.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl ProfileStore for MemoryProfileStore {
    fn progression(&self, session: &SessionId) -> Result<Progression, CollaboratorError> {
        self.profiles
            .get(session)
            .map(|p| p.clone())
            .ok_or_else(|| CollaboratorError::ProfileNotFound(session.to_string()))
    }

    fn set_progression(
        &self,
        session: &SessionId,
        level: u32,
        experience: u64,
    ) -> Result<(), CollaboratorError> {
        let mut profile = self
            .profiles
            .get_mut(session)
            .ok_or_else(|| CollaboratorError::ProfileNotFound(session.to_string()))?;
        profile.level = level;
        profile.experience = experience;
        Ok(())
    }
}

/// Registrar that remembers the latest registration per session.
#[derive(Default)]
pub struct MemoryPlayerRegistrar {
    registrations: DashMap<SessionId, RegisterPlayerRequest>,
}

impl MemoryPlayerRegistrar {
    /// Empty registrar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest registration of `session`.
    pub fn registration(&self, session: &SessionId) -> Option<RegisterPlayerRequest> {
        self.registrations.get(session).map(|r| r.clone())
    }
}

impl PlayerRegistrar for MemoryPlayerRegistrar {
    fn register_player(
        &self,
        session: &SessionId,
        request: &RegisterPlayerRequest,
    ) -> Result<(), CollaboratorError> {
        if request.location_id.is_empty() {
            return Err(CollaboratorError::Rejected("locationId is empty".into()));
        }
        debug!(session_id = %session, location = %request.location_id, "player registered");
        let _ = self.registrations.insert(session.clone(), request.clone());
        Ok(())
    }
}
