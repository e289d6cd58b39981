//! Match upkeep handlers sent by hosts while a raid runs, plus the raid list.

use async_trait::async_trait;
use raidhub_core::SessionId;
use raidhub_core::protocol::{PlayerSpawnRequest, ServerIdRequest, SetStatusRequest};
use serde_json::Value;
use tracing::instrument;

use super::{parse_params, to_json};
use crate::api::context::ApiContext;
use crate::api::errors::ApiError;
use crate::api::registry::MethodHandler;

/// Host keep-alive.
pub struct PingHandler;

#[async_trait]
impl MethodHandler for PingHandler {
    #[instrument(skip(self, params, ctx), fields(method = "update.ping"))]
    async fn handle(
        &self,
        _caller: Option<&SessionId>,
        params: Option<Value>,
        ctx: &ApiContext,
    ) -> Result<Value, ApiError> {
        let request: ServerIdRequest = parse_params(params)?;
        to_json(&ctx.orchestrator.ping(&request))
    }
}

/// A player spawned into a match.
pub struct PlayerSpawnHandler;

#[async_trait]
impl MethodHandler for PlayerSpawnHandler {
    #[instrument(skip(self, params, ctx), fields(method = "update.playerspawn"))]
    async fn handle(
        &self,
        _caller: Option<&SessionId>,
        params: Option<Value>,
        ctx: &ApiContext,
    ) -> Result<Value, ApiError> {
        let request: PlayerSpawnRequest = parse_params(params)?;
        to_json(&ctx.orchestrator.player_spawn(&request))
    }
}

/// Host-reported match status.
pub struct SetStatusHandler;

#[async_trait]
impl MethodHandler for SetStatusHandler {
    #[instrument(skip(self, params, ctx), fields(method = "update.setstatus"))]
    async fn handle(
        &self,
        _caller: Option<&SessionId>,
        params: Option<Value>,
        ctx: &ApiContext,
    ) -> Result<Value, ApiError> {
        let request: SetStatusRequest = parse_params(params)?;
        to_json(&ctx.orchestrator.set_status(&request))
    }
}

/// Live matches, oldest first.
pub struct ListRaidsHandler;

#[async_trait]
impl MethodHandler for ListRaidsHandler {
    #[instrument(skip(self, _params, ctx), fields(method = "location.raids"))]
    async fn handle(
        &self,
        _caller: Option<&SessionId>,
        _params: Option<Value>,
        ctx: &ApiContext,
    ) -> Result<Value, ApiError> {
        to_json(&ctx.orchestrator.list_raids())
    }
}
