//! `RaidServer`: the axum router, listener and background tasks.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use raidhub_runtime::SessionOrchestrator;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::api::context::ApiContext;
use crate::api::errors::ApiError;
use crate::api::handlers::register_all;
use crate::api::identity::session_from_headers;
use crate::api::registry::MethodRegistry;
use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;
use crate::sweeper::spawn_match_sweeper;
use crate::websocket::{NotificationChannel, run_notification_session};

/// State shared by the axum handlers.
#[derive(Clone)]
pub struct AppState {
    registry: Arc<MethodRegistry>,
    ctx: Arc<ApiContext>,
    config: Arc<ServerConfig>,
    shutdown: CancellationToken,
    metrics: Option<PrometheusHandle>,
}

/// The coordinator's HTTP and WebSocket server.
pub struct RaidServer {
    config: Arc<ServerConfig>,
    registry: Arc<MethodRegistry>,
    ctx: Arc<ApiContext>,
    shutdown: Arc<ShutdownCoordinator>,
    metrics: Option<PrometheusHandle>,
}

impl RaidServer {
    /// Build a server around an orchestrator and the channel it notifies
    /// through. Pass a metrics handle to serve `/metrics`.
    pub fn new(
        config: ServerConfig,
        orchestrator: Arc<SessionOrchestrator>,
        channel: Arc<NotificationChannel>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let mut registry = MethodRegistry::new(config.request_timeout);
        register_all(&mut registry);
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            ctx: Arc::new(ApiContext::new(orchestrator, channel)),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            metrics,
        }
    }

    /// Build the router with every route.
    pub fn router(&self) -> Router {
        let state = AppState {
            registry: self.registry.clone(),
            ctx: self.ctx.clone(),
            config: self.config.clone(),
            shutdown: self.shutdown.token(),
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/fika/notification", get(notification_handler))
            .route("/fika/{*path}", post(api_handler))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Bind the configured address and serve until shutdown.
    ///
    /// Returns the bound address, which differs from the configured one when
    /// the port is `0`.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let token = self.shutdown.token();

        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(error) = served {
                error!(%error, "server stopped with error");
            }
        });
        info!(%addr, "raidhub listening");
        Ok((addr, handle))
    }

    /// Start the stale-match sweeper and the headless availability watcher.
    /// Both stop on shutdown.
    pub fn start_background_tasks(&self) -> Vec<JoinHandle<()>> {
        let orchestrator = &self.ctx.orchestrator;
        vec![
            spawn_match_sweeper(
                orchestrator.matches().clone(),
                self.config.match_timeout,
                self.config.sweep_interval,
                self.shutdown.token(),
            ),
            orchestrator.spawn_availability_watcher(self.shutdown.token()),
        ]
    }

    /// Shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Route registry.
    pub fn registry(&self) -> &Arc<MethodRegistry> {
        &self.registry
    }

    /// Handler context.
    pub fn context(&self) -> &Arc<ApiContext> {
        &self.ctx
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let orchestrator = &state.ctx.orchestrator;
    Json(health::health_check(
        state.ctx.start_time,
        state.ctx.channel.connection_count(),
        orchestrator.matches().count(),
        orchestrator.pool().count(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            crate::metrics::render(handle),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

/// POST /fika/...
async fn api_handler(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let params = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(v) => Some(v),
            Err(e) => {
                return ApiError::invalid_params(format!("Malformed JSON body: {e}")).into_response();
            }
        }
    };
    let caller = session_from_headers(&headers);

    match state
        .registry
        .dispatch(uri.path(), caller.as_ref(), params, &state.ctx)
        .await
    {
        Ok(value) => Json(value).into_response(),
        Err(err) => {
            debug!(path = uri.path(), code = err.code(), "request failed");
            err.into_response()
        }
    }
}

/// GET /fika/notification
async fn notification_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Some(session_id) = session_from_headers(&headers) else {
        return ApiError::Unauthenticated {
            message: "Missing session id (X-Session-Id header or PHPSESSID cookie)".into(),
        }
        .into_response();
    };
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let channel = state.ctx.channel.clone();
    let orchestrator = state.ctx.orchestrator.clone();
    ws.on_upgrade(move |socket| async move {
        let _ = run_notification_session(
            socket,
            session_id,
            channel,
            orchestrator,
            state.config,
            state.shutdown,
        )
        .await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use raidhub_runtime::{
        HeadlessWorkerPool, MatchRegistry, MemoryPlayerRegistrar, MemoryProfileStore, PoolConfig,
    };
    use serde_json::json;
    use tower::ServiceExt;

    fn make_server() -> RaidServer {
        let channel = Arc::new(NotificationChannel::new());
        let orchestrator = Arc::new(SessionOrchestrator::new(
            Arc::new(MatchRegistry::new(channel.clone())),
            Arc::new(HeadlessWorkerPool::new(channel.clone(), PoolConfig::default())),
            channel.clone(),
            Arc::new(MemoryProfileStore::new()),
            Arc::new(MemoryPlayerRegistrar::new()),
        ));
        RaidServer::new(ServerConfig::default(), orchestrator, channel, None)
    }

    async fn post(app: Router, path: &str, body: &str, session: Option<&str>) -> (StatusCode, Value) {
        let mut req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json");
        if let Some(s) = session {
            req = req.header("x-session-id", s);
        }
        let resp = app
            .oneshot(req.body(Body::from(body.to_owned())).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn registry_has_every_route() {
        let server = make_server();
        assert!(server.registry().has_method("/fika/raid/create"));
        assert!(server.registry().has_method("/fika/headless/list"));
        assert!(!server.shutdown().is_shutting_down());
    }

    #[tokio::test]
    async fn health_reports_counts() {
        let app = make_server().router();
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let v: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["status"], "ok");
        assert_eq!(v["connections"], 0);
        assert_eq!(v["matches"], 0);
    }

    #[tokio::test]
    async fn create_then_gethost_over_http() {
        let server = make_server();
        let body = json!({
            "serverId": "alice",
            "hostUsername": "alice",
            "settings": {"location": "Customs"},
            "ips": ["1.2.3.4"],
            "port": 25565
        })
        .to_string();
        let (status, v) = post(server.router(), "/fika/raid/create", &body, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v, json!({"success": true}));

        let (status, v) =
            post(server.router(), "/fika/raid/gethost", r#"{"serverId":"alice"}"#, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["port"], 25565);
    }

    #[tokio::test]
    async fn join_absent_is_null() {
        let app = make_server().router();
        let (status, v) = post(app, "/fika/raid/join", r#"{"serverId":"ghost"}"#, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v, Value::Null);
    }

    #[tokio::test]
    async fn unknown_fika_path_is_404() {
        let app = make_server().router();
        let (status, v) = post(app, "/fika/raid/nope", "{}", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(v["code"], "METHOD_NOT_FOUND");
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let app = make_server().router();
        let (status, v) = post(app, "/fika/raid/join", "{not json", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(v["code"], "INVALID_PARAMS");
    }

    #[tokio::test]
    async fn headless_start_needs_session() {
        let server = make_server();
        let (status, v) = post(server.router(), "/fika/raid/headless/start", "{}", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(v["code"], "UNAUTHENTICATED");

        let (status, v) =
            post(server.router(), "/fika/raid/headless/start", "{}", Some("alice")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["matchId"], Value::Null);
        assert_eq!(v["error"], "No headless clients available.");
    }

    #[tokio::test]
    async fn notification_without_session_is_401() {
        let app = make_server().router();
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/fika/notification")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn metrics_disabled_without_handle() {
        let app = make_server().router();
        let resp = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn background_tasks_stop_on_shutdown() {
        let server = make_server();
        let handles = server.start_background_tasks();
        assert_eq!(handles.len(), 2);
        let aborted = server.shutdown().graceful_shutdown(handles, None).await;
        assert_eq!(aborted, 0);
        assert!(server.shutdown().is_shutting_down());
    }

    #[tokio::test]
    async fn listen_binds_ephemeral_port() {
        let server = make_server();
        let (addr, handle) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);
        server.shutdown().shutdown();
        handle.await.unwrap();
    }
}
