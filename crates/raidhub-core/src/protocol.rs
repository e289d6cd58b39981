//! Request and response bodies of the HTTP surface.
//!
//! All bodies are camelCase JSON. Responses that may be "absent" are modelled
//! as `Option<T>` by the caller and serialize as `null`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::headless::{HeadlessStatus, ReportedStatus, WireStatus};
use crate::ids::{ServerId, SessionId};
use crate::raid::{MatchStatus, PlayersSpawnPlace, RaidConfig, RaidSettings, TimeFlowType};

/// `/fika/raid/create` body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRaidRequest {
    /// Key of the new match; equals the host's session id.
    pub server_id: ServerId,
    /// Host display name.
    pub host_username: String,
    /// Raid instance code.
    #[serde(default)]
    pub raid_code: String,
    /// Opaque creation stamp.
    #[serde(default)]
    pub timestamp: String,
    /// Host game version.
    #[serde(default)]
    pub game_version: String,
    /// Host mod version.
    #[serde(default)]
    pub fika_version: String,
    /// Location-level settings.
    pub settings: RaidSettings,
    /// Raid configuration.
    #[serde(default)]
    pub raid_config: RaidConfig,
    /// Addresses peers may connect to.
    #[serde(default)]
    pub ips: Vec<String>,
    /// Port peers connect to.
    #[serde(default)]
    pub port: u16,
    /// Whether NAT traversal is needed.
    #[serde(default)]
    pub nat_punch: bool,
    /// Whether a headless worker hosts the match.
    #[serde(default)]
    pub is_headless: bool,
}

/// `/fika/raid/create` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRaidResponse {
    /// False when the server id was already taken.
    pub success: bool,
}

/// Body carrying only a match key (join, gethost, getsettings, ping).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerIdRequest {
    /// Match key.
    pub server_id: ServerId,
}

/// `/fika/raid/join` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRaidResponse {
    /// Match key.
    pub server_id: ServerId,
    /// Opaque creation stamp.
    pub timestamp: String,
    /// Host game version.
    pub game_version: String,
    /// Host mod version.
    pub fika_version: String,
    /// Raid instance code.
    pub raid_code: String,
}

/// `/fika/raid/leave` body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRaidRequest {
    /// Match key.
    pub server_id: ServerId,
    /// Leaving player. Equal to `server_id` when the host leaves.
    pub profile_id: SessionId,
}

/// `/fika/raid/gethost` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetHostResponse {
    /// Addresses peers may connect to.
    pub ips: Vec<String>,
    /// Port peers connect to.
    pub port: u16,
    /// Whether NAT traversal is needed.
    pub nat_punch: bool,
    /// Whether a headless worker hosts the match.
    pub is_headless: bool,
}

/// `/fika/raid/getsettings` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaidSettingsResponse {
    /// Whether hunger/hydration are disabled.
    pub metabolism_disabled: bool,
    /// Spawn placement policy.
    pub players_spawn_place: PlayersSpawnPlace,
    /// Starting hour of the in-raid clock.
    pub hour_of_day: i32,
    /// Clock acceleration.
    pub time_flow_type: TimeFlowType,
}

impl From<&RaidConfig> for RaidSettingsResponse {
    fn from(cfg: &RaidConfig) -> Self {
        Self {
            metabolism_disabled: cfg.metabolism_disabled,
            players_spawn_place: cfg.players_spawn_place,
            hour_of_day: cfg.time_and_weather_settings.hour_of_day,
            time_flow_type: cfg.time_and_weather_settings.time_flow_type,
        }
    }
}

/// `/fika/raid/headless/start` body: raid parameters forwarded to the worker
/// untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StartHeadlessRequest {
    /// Arbitrary parameters (location, time, side, ...).
    #[serde(flatten)]
    pub parameters: Map<String, Value>,
}

/// `/fika/raid/headless/start` response. Exactly one field is non-null.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartHeadlessResponse {
    /// Worker that will host the raid.
    pub match_id: Option<SessionId>,
    /// Human-readable reason no worker was assigned.
    pub error: Option<String>,
}

impl StartHeadlessResponse {
    /// Successful assignment.
    pub fn assigned(worker: SessionId) -> Self {
        Self {
            match_id: Some(worker),
            error: None,
        }
    }

    /// Rejected request.
    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            match_id: None,
            error: Some(error.into()),
        }
    }
}

/// `/fika/raid/headless/status` body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadlessStatusRequest {
    /// Reporting worker. Informational; the caller's session identity wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    /// Status as sent by the worker.
    pub status: WireStatus,
}

/// `/fika/raid/headless/status` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadlessStatusResponse {
    /// Reporting worker.
    pub session_id: SessionId,
    /// Normalized status.
    pub status: ReportedStatus,
}

/// `/fika/raid/headless/getstatus` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadlessAvailabilityResponse {
    /// Whether any worker could take a raid right now.
    pub available: bool,
}

/// `/fika/raid/registerPlayer` body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPlayerRequest {
    /// Client integrity checksum.
    #[serde(default)]
    pub crc: i64,
    /// Map identifier.
    pub location_id: String,
    /// Map variant.
    #[serde(default)]
    pub variant_id: i64,
}

/// `/fika/update/playerspawn` body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSpawnRequest {
    /// Match key.
    pub server_id: ServerId,
    /// Spawned player.
    pub profile_id: SessionId,
}

/// `/fika/update/setstatus` body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetStatusRequest {
    /// Match key.
    pub server_id: ServerId,
    /// New progress state.
    pub status: MatchStatus,
}

/// Result of the update endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResponse {
    /// False when the match is not live.
    pub success: bool,
}

/// One row of `/fika/headless/list`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadlessWorkerRow {
    /// Worker identity.
    pub session_id: SessionId,
    /// Effective state.
    pub state: HeadlessStatus,
    /// Whether its notification connection is open.
    pub connected: bool,
}
