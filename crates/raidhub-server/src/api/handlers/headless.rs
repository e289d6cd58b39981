//! Headless handlers: start, status report, availability, listing.

use async_trait::async_trait;
use raidhub_core::SessionId;
use raidhub_core::protocol::{
    HeadlessStatusRequest, HeadlessWorkerRow, StartHeadlessRequest, StartHeadlessResponse,
};
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::{parse_params, require_session, to_json};
use crate::api::context::ApiContext;
use crate::api::errors::ApiError;
use crate::api::registry::MethodHandler;

/// Assign a headless worker to the caller and send it the raid command.
///
/// Refusals are regular responses with a null `matchId` and an `error`.
pub struct StartHeadlessHandler;

#[async_trait]
impl MethodHandler for StartHeadlessHandler {
    #[instrument(skip(self, params, ctx), fields(method = "raid.headless.start"))]
    async fn handle(
        &self,
        caller: Option<&SessionId>,
        params: Option<Value>,
        ctx: &ApiContext,
    ) -> Result<Value, ApiError> {
        let requester = require_session(caller)?;
        let request: StartHeadlessRequest = match params {
            Some(p) => parse_params(Some(p))?,
            None => StartHeadlessRequest::default(),
        };

        let response = match ctx.orchestrator.headless_start(requester, &request) {
            Ok(worker) => {
                info!(%requester, worker_id = %worker, "headless raid assigned");
                StartHeadlessResponse::assigned(worker)
            }
            Err(error) => {
                warn!(%requester, code = error.code(), "headless start refused");
                StartHeadlessResponse::rejected(error.to_string())
            }
        };
        to_json(&response)
    }
}

/// A worker reports READY or IN_RAID.
pub struct HeadlessStatusHandler;

#[async_trait]
impl MethodHandler for HeadlessStatusHandler {
    #[instrument(skip(self, params, ctx), fields(method = "raid.headless.status"))]
    async fn handle(
        &self,
        caller: Option<&SessionId>,
        params: Option<Value>,
        ctx: &ApiContext,
    ) -> Result<Value, ApiError> {
        let request: HeadlessStatusRequest = parse_params(params)?;
        let worker = match (caller, request.session_id.as_ref()) {
            (Some(caller), _) => caller,
            (None, Some(body)) => body,
            (None, None) => require_session(None)?,
        };
        let response = ctx.orchestrator.headless_status(worker, &request)?;
        to_json(&response)
    }
}

/// Whether a headless raid could start right now.
pub struct GetStatusHandler;

#[async_trait]
impl MethodHandler for GetStatusHandler {
    #[instrument(skip(self, _params, ctx), fields(method = "raid.headless.getstatus"))]
    async fn handle(
        &self,
        _caller: Option<&SessionId>,
        _params: Option<Value>,
        ctx: &ApiContext,
    ) -> Result<Value, ApiError> {
        to_json(&ctx.orchestrator.headless_get_status())
    }
}

/// Every known worker with its effective state and connection.
pub struct ListWorkersHandler;

#[async_trait]
impl MethodHandler for ListWorkersHandler {
    #[instrument(skip(self, _params, ctx), fields(method = "headless.list"))]
    async fn handle(
        &self,
        _caller: Option<&SessionId>,
        _params: Option<Value>,
        ctx: &ApiContext,
    ) -> Result<Value, ApiError> {
        let rows: Vec<HeadlessWorkerRow> = ctx
            .orchestrator
            .list_headless()
            .into_iter()
            .map(|w| HeadlessWorkerRow {
                connected: ctx.orchestrator.is_connected(&w.session_id),
                session_id: w.session_id,
                state: w.state,
            })
            .collect();
        to_json(&rows)
    }
}
