//! Raid handlers: create, join, leave, gethost, getsettings, registerPlayer.

use async_trait::async_trait;
use raidhub_core::SessionId;
use raidhub_core::protocol::{
    CreateRaidRequest, LeaveRaidRequest, RegisterPlayerRequest, ServerIdRequest,
};
use serde_json::Value;
use tracing::{instrument, warn};

use super::{parse_params, require_session, to_json};
use crate::api::context::ApiContext;
use crate::api::errors::{self, ApiError};
use crate::api::registry::MethodHandler;

/// Register a new match and announce it.
pub struct CreateRaidHandler;

#[async_trait]
impl MethodHandler for CreateRaidHandler {
    #[instrument(skip(self, params, ctx), fields(method = "raid.create"))]
    async fn handle(
        &self,
        _caller: Option<&SessionId>,
        params: Option<Value>,
        ctx: &ApiContext,
    ) -> Result<Value, ApiError> {
        let request: CreateRaidRequest = parse_params(params)?;
        to_json(&ctx.orchestrator.create(request))
    }
}

/// Join details of a live match, or `null`.
pub struct JoinRaidHandler;

#[async_trait]
impl MethodHandler for JoinRaidHandler {
    #[instrument(skip(self, params, ctx), fields(method = "raid.join"))]
    async fn handle(
        &self,
        _caller: Option<&SessionId>,
        params: Option<Value>,
        ctx: &ApiContext,
    ) -> Result<Value, ApiError> {
        let request: ServerIdRequest = parse_params(params)?;
        to_json(&ctx.orchestrator.join(&request))
    }
}

/// Leave a match; the host leaving ends it.
pub struct LeaveRaidHandler;

#[async_trait]
impl MethodHandler for LeaveRaidHandler {
    #[instrument(skip(self, params, ctx), fields(method = "raid.leave"))]
    async fn handle(
        &self,
        _caller: Option<&SessionId>,
        params: Option<Value>,
        ctx: &ApiContext,
    ) -> Result<Value, ApiError> {
        let request: LeaveRaidRequest = parse_params(params)?;
        ctx.orchestrator.leave(&request);
        Ok(Value::Null)
    }
}

/// Connection info of a match's host, or `null`.
pub struct GetHostHandler;

#[async_trait]
impl MethodHandler for GetHostHandler {
    #[instrument(skip(self, params, ctx), fields(method = "raid.gethost"))]
    async fn handle(
        &self,
        _caller: Option<&SessionId>,
        params: Option<Value>,
        ctx: &ApiContext,
    ) -> Result<Value, ApiError> {
        let request: ServerIdRequest = parse_params(params)?;
        to_json(&ctx.orchestrator.get_host(&request))
    }
}

/// Raid settings of a match, or `null`.
pub struct GetSettingsHandler;

#[async_trait]
impl MethodHandler for GetSettingsHandler {
    #[instrument(skip(self, params, ctx), fields(method = "raid.getsettings"))]
    async fn handle(
        &self,
        _caller: Option<&SessionId>,
        params: Option<Value>,
        ctx: &ApiContext,
    ) -> Result<Value, ApiError> {
        let request: ServerIdRequest = parse_params(params)?;
        to_json(&ctx.orchestrator.get_settings(&request))
    }
}

/// Pass an in-raid registration to the registrar.
pub struct RegisterPlayerHandler;

#[async_trait]
impl MethodHandler for RegisterPlayerHandler {
    #[instrument(skip(self, params, ctx), fields(method = "raid.registerPlayer"))]
    async fn handle(
        &self,
        caller: Option<&SessionId>,
        params: Option<Value>,
        ctx: &ApiContext,
    ) -> Result<Value, ApiError> {
        let session = require_session(caller)?;
        let request: RegisterPlayerRequest = parse_params(params)?;
        ctx.orchestrator
            .register_player(session, &request)
            .map_err(|e| {
                warn!(%session, error = %e, "player registration failed");
                ApiError::Custom {
                    code: errors::REGISTRATION_ERROR.into(),
                    message: e.to_string(),
                }
            })?;
        Ok(Value::Null)
    }
}
