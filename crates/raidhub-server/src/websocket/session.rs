//! One notification socket, from upgrade to disconnect.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use raidhub_core::SessionId;
use raidhub_runtime::SessionOrchestrator;
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::channel::NotificationChannel;
use super::connection::ClientConnection;
use super::heartbeat::{HeartbeatResult, run_heartbeat};
use crate::config::ServerConfig;
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL,
};

/// Grace period for the outbound task to flush a close frame.
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Why a notification session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Client sent a close frame or the stream ended.
    ClientClosed,
    /// Reading from the socket failed.
    ReadError,
    /// A newer connection for the same session took over.
    Replaced,
    /// No pong within the heartbeat timeout.
    HeartbeatTimeout,
    /// The server is shutting down.
    Shutdown,
}

impl DisconnectReason {
    /// Metric label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClientClosed => "client_closed",
            Self::ReadError => "read_error",
            Self::Replaced => "replaced",
            Self::HeartbeatTimeout => "heartbeat_timeout",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Serve the notification socket of `session_id` until it goes away.
///
/// The connection is registered with `channel` for its lifetime. Outbound
/// notifications are forwarded from the connection's queue and pings are sent
/// every heartbeat interval. Incoming frames only count as signs of life.
#[instrument(skip_all, fields(%session_id))]
pub async fn run_notification_session(
    ws: WebSocket,
    session_id: SessionId,
    channel: Arc<NotificationChannel>,
    orchestrator: Arc<SessionOrchestrator>,
    config: Arc<ServerConfig>,
    shutdown: CancellationToken,
) -> DisconnectReason {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(config.max_send_queue.max(1));
    let connection = Arc::new(ClientConnection::new(session_id.clone(), send_tx));

    if let Some(previous) = channel.add(connection.clone()) {
        previous.close();
    }
    orchestrator.connection_changed(&session_id);

    let started = Instant::now();
    info!(conn_id = %connection.id, "notification client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    let stop = shutdown.child_token();

    let mut heartbeat = tokio::spawn(run_heartbeat(
        connection.clone(),
        config.heartbeat_interval,
        config.heartbeat_timeout,
        stop.clone(),
    ));

    let ping_every = config.heartbeat_interval;
    let outbound_stop = stop.clone();
    let mut outbound = tokio::spawn(async move {
        let mut ping = time::interval_at(time::Instant::now() + ping_every, ping_every);
        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    let Some(text) = msg else { break };
                    if ws_tx.send(Message::Text(text.as_str().into())).await.is_err() {
                        break;
                    }
                }
                _ = ping.tick() => {
                    if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
                () = outbound_stop.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    let reason = loop {
        tokio::select! {
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Close(_))) | None => break DisconnectReason::ClientClosed,
                Some(Ok(_)) => connection.mark_alive(),
                Some(Err(error)) => {
                    debug!(%error, "notification socket read failed");
                    break DisconnectReason::ReadError;
                }
            },
            () = connection.closed() => break DisconnectReason::Replaced,
            result = &mut heartbeat => match result {
                Ok(HeartbeatResult::TimedOut) => break DisconnectReason::HeartbeatTimeout,
                Ok(HeartbeatResult::Cancelled) | Err(_) => break DisconnectReason::Shutdown,
            },
            () = stop.cancelled() => break DisconnectReason::Shutdown,
        }
    };

    stop.cancel();
    if time::timeout(CLOSE_FLUSH_TIMEOUT, &mut outbound).await.is_err() {
        outbound.abort();
    }
    heartbeat.abort();

    connection.close();
    let _ = channel.remove(&session_id, &connection.id);
    orchestrator.connection_changed(&session_id);

    info!(conn_id = %connection.id, reason = reason.as_str(), "notification client disconnected");
    counter!(WS_DISCONNECTIONS_TOTAL, "reason" => reason.as_str()).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
    reason
}
