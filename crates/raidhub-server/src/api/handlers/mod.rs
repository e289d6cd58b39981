//! Route handlers and their registration.

pub mod headless;
pub mod raid;
pub mod update;

use raidhub_core::SessionId;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::errors::ApiError;
use super::registry::MethodRegistry;

/// Register every `/fika` route.
pub fn register_all(registry: &mut MethodRegistry) {
    // Raid
    registry.register("/fika/raid/create", raid::CreateRaidHandler);
    registry.register("/fika/raid/join", raid::JoinRaidHandler);
    registry.register("/fika/raid/leave", raid::LeaveRaidHandler);
    registry.register("/fika/raid/gethost", raid::GetHostHandler);
    registry.register("/fika/raid/getsettings", raid::GetSettingsHandler);
    registry.register("/fika/raid/registerPlayer", raid::RegisterPlayerHandler);

    // Headless
    registry.register("/fika/raid/headless/start", headless::StartHeadlessHandler);
    registry.register("/fika/raid/headless/status", headless::HeadlessStatusHandler);
    registry.register("/fika/raid/headless/getstatus", headless::GetStatusHandler);
    registry.register("/fika/headless/list", headless::ListWorkersHandler);

    // Match upkeep
    registry.register("/fika/update/ping", update::PingHandler);
    registry.register("/fika/update/playerspawn", update::PlayerSpawnHandler);
    registry.register("/fika/update/setstatus", update::SetStatusHandler);
    registry.register("/fika/location/raids", update::ListRaidsHandler);
}

/// Decode the request body into `T`.
pub(crate) fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, ApiError> {
    let params = params.ok_or_else(|| ApiError::invalid_params("Missing request body"))?;
    serde_json::from_value(params)
        .map_err(|e| ApiError::invalid_params(format!("Invalid request body: {e}")))
}

/// The caller's session id, required by this route.
pub(crate) fn require_session(caller: Option<&SessionId>) -> Result<&SessionId, ApiError> {
    caller.ok_or_else(|| ApiError::Unauthenticated {
        message: "Missing session id (X-Session-Id header or PHPSESSID cookie)".into(),
    })
}

/// Serialize a handler result.
pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Internal {
        message: format!("Failed to serialize response: {e}"),
    })
}
