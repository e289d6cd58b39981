//! Raid (match) data model.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ServerId, SessionId};

/// Where players spawn relative to each other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayersSpawnPlace {
    /// Everyone spawns together.
    #[default]
    SamePlace,
    /// Players spread over distinct spawn points.
    DifferentPlaces,
    /// Players spawn at opposite ends of the map.
    AtTheEndsOfTheMap,
}

/// In-raid clock acceleration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeFlowType {
    /// Frozen clock.
    #[serde(rename = "x0")]
    X0,
    /// 0.14x.
    #[serde(rename = "x0_14")]
    X0_14,
    /// 0.25x.
    #[serde(rename = "x0_25")]
    X0_25,
    /// 0.5x.
    #[serde(rename = "x0_5")]
    X0_5,
    /// Real time.
    #[default]
    #[serde(rename = "x1")]
    X1,
    /// 2x.
    #[serde(rename = "x2")]
    X2,
    /// 4x.
    #[serde(rename = "x4")]
    X4,
    /// 8x.
    #[serde(rename = "x8")]
    X8,
}

/// Clock settings of a raid.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeAndWeatherSettings {
    /// Starting hour of the in-raid clock.
    pub hour_of_day: i32,
    /// Clock acceleration.
    pub time_flow_type: TimeFlowType,
}

/// Host-chosen raid configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaidConfig {
    /// Whether hunger/hydration are disabled.
    pub metabolism_disabled: bool,
    /// Spawn placement policy.
    pub players_spawn_place: PlayersSpawnPlace,
    /// Clock settings.
    pub time_and_weather_settings: TimeAndWeatherSettings,
}

/// Location-level settings sent by the host when creating a raid.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaidSettings {
    /// Map identifier (e.g. `"Customs"`).
    pub location: String,
    /// Faction the host plays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
    /// Time of day variant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

/// Progress of a match as reported by its host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    /// Host is loading the map.
    #[default]
    Loading,
    /// Raid is running.
    InGame,
    /// Raid finished on the host side.
    Complete,
}

/// Why a match ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndReason {
    /// The host left; the whole match goes with it.
    HostShutdown,
    /// The host stopped sending keep-alive pings.
    PingTimeout,
    /// Ended on request by an operator or collaborator.
    Explicit,
}

impl EndReason {
    /// Wire token for this reason.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HostShutdown => "host-shutdown",
            Self::PingTimeout => "ping-timeout",
            Self::Explicit => "explicit",
        }
    }
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One live multiplayer session.
///
/// Values handed out by the registry are snapshots; mutating one has no
/// effect on the registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    /// Unique key, equal to the host's session id.
    pub server_id: ServerId,
    /// Display name of the host.
    pub host_username: String,
    /// Opaque creation stamp supplied by the host.
    pub timestamp: String,
    /// Game client version of the host.
    pub game_version: String,
    /// Mod version of the host.
    pub fika_version: String,
    /// Raid instance code.
    pub raid_code: String,
    /// Addresses peers may connect to, in preference order.
    pub ips: Vec<String>,
    /// Port peers connect to.
    pub port: u16,
    /// Whether peers need NAT traversal assistance.
    pub nat_punch: bool,
    /// Whether a headless worker hosts this match.
    pub is_headless: bool,
    /// Location-level settings.
    pub settings: RaidSettings,
    /// Raid configuration.
    pub raid_config: RaidConfig,
    /// Joined participants. The host is an implicit member and not listed.
    pub players: BTreeSet<SessionId>,
    /// Host-reported progress.
    pub status: MatchStatus,
    /// When the registry accepted the match.
    pub created_at: DateTime<Utc>,
}

impl Match {
    /// Every session that should hear about this match ending: the host and
    /// all joined players.
    pub fn participants(&self) -> Vec<SessionId> {
        let host = self.server_id.host_session();
        let mut out = Vec::with_capacity(self.players.len() + 1);
        out.push(host.clone());
        out.extend(self.players.iter().filter(|p| **p != host).cloned());
        out
    }
}

/// Condensed view of a match for the raid browser.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    /// Match key.
    pub server_id: ServerId,
    /// Display name of the host.
    pub host_username: String,
    /// Map identifier.
    pub location: String,
    /// Host-reported progress.
    pub status: MatchStatus,
    /// Joined participants excluding the host.
    pub player_count: usize,
    /// Whether a headless worker hosts this match.
    pub is_headless: bool,
    /// Mod version of the host.
    pub fika_version: String,
}

impl From<&Match> for MatchSummary {
    fn from(m: &Match) -> Self {
        Self {
            server_id: m.server_id.clone(),
            host_username: m.host_username.clone(),
            location: m.settings.location.clone(),
            status: m.status,
            player_count: m.players.len(),
            is_headless: m.is_headless,
            fika_version: m.fika_version.clone(),
        }
    }
}
