//! End-to-end tests against a real listener, HTTP client and WebSocket client.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;

use raidhub_runtime::{
    HeadlessWorkerPool, MatchRegistry, MemoryPlayerRegistrar, MemoryProfileStore, PoolConfig,
    Progression, SessionOrchestrator,
};
use raidhub_server::{NotificationChannel, RaidServer, ServerConfig};

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

struct TestServer {
    addr: SocketAddr,
    http: reqwest::Client,
    server: Arc<RaidServer>,
    profiles: Arc<MemoryProfileStore>,
}

/// Boot a server on an ephemeral port with its background tasks running.
async fn boot_server() -> TestServer {
    let channel = Arc::new(NotificationChannel::new());
    let profiles = Arc::new(MemoryProfileStore::new());
    let orchestrator = Arc::new(SessionOrchestrator::new(
        Arc::new(MatchRegistry::new(channel.clone())),
        Arc::new(HeadlessWorkerPool::new(channel.clone(), PoolConfig::default())),
        channel.clone(),
        profiles.clone(),
        Arc::new(MemoryPlayerRegistrar::new()),
    ));
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .build_recorder()
        .handle();
    let server = Arc::new(RaidServer::new(
        ServerConfig::default(),
        orchestrator,
        channel,
        Some(metrics_handle),
    ));
    let _tasks = server.start_background_tasks();
    let (addr, _handle) = server.listen().await.unwrap();

    TestServer {
        addr,
        http: reqwest::Client::new(),
        server,
        profiles,
    }
}

impl TestServer {
    async fn post(&self, path: &str, session: Option<&str>, body: Value) -> (u16, Value) {
        let mut req = self.http.post(format!("http://{}{path}", self.addr)).json(&body);
        if let Some(s) = session {
            req = req.header("x-session-id", s);
        }
        let resp = req.send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn health(&self) -> Value {
        self.http
            .get(format!("http://{}/health", self.addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    async fn connect(&self, session: &str) -> WsStream {
        let mut request = format!("ws://{}/fika/notification", self.addr)
            .into_client_request()
            .unwrap();
        let _ = request
            .headers_mut()
            .insert("x-session-id", HeaderValue::from_str(session).unwrap());
        let (ws, _) = connect_async(request).await.unwrap();
        ws
    }

    /// Poll `/health` until the connection count reaches `n`.
    async fn wait_for_connections(&self, n: u64) {
        timeout(TIMEOUT, async {
            loop {
                if self.health().await["connections"] == n {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("connection count never reached");
    }
}

/// Next text frame whose `type` is `kind`, skipping anything else.
async fn next_of_type(ws: &mut WsStream, kind: &str) -> Value {
    timeout(TIMEOUT, async {
        loop {
            let msg = ws.next().await.expect("socket closed").expect("socket error");
            if let Message::Text(text) = msg {
                let v: Value = serde_json::from_str(text.as_str()).unwrap();
                if v["type"] == kind {
                    return v;
                }
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no {kind} notification"))
}

fn create_body(server_id: &str) -> Value {
    json!({
        "serverId": server_id,
        "hostUsername": server_id,
        "raidCode": "RC-42",
        "timestamp": "1718000000",
        "gameVersion": "0.16.1",
        "fikaVersion": "1.2.0",
        "settings": {"location": "Customs"},
        "ips": ["10.0.0.2"],
        "port": 25565
    })
}

#[tokio::test]
async fn create_join_leave_scenario() {
    let t = boot_server().await;
    let mut bob = t.connect("bob").await;
    t.wait_for_connections(1).await;

    let (status, v) = t.post("/fika/raid/create", None, create_body("alice")).await;
    assert_eq!(status, 200);
    assert_eq!(v, json!({"success": true}));

    let started = next_of_type(&mut bob, "StartedRaid").await;
    assert_eq!(started["nickname"], "alice");
    assert_eq!(started["location"], "Customs");

    let (status, v) = t.post("/fika/raid/join", None, json!({"serverId": "alice"})).await;
    assert_eq!(status, 200);
    assert_eq!(v["raidCode"], "RC-42");

    let (_, v) = t
        .post("/fika/update/playerspawn", None, json!({"serverId": "alice", "profileId": "bob"}))
        .await;
    assert_eq!(v, json!({"success": true}));

    let (status, _) = t
        .post("/fika/raid/leave", None, json!({"serverId": "alice", "profileId": "alice"}))
        .await;
    assert_eq!(status, 200);

    let ended = next_of_type(&mut bob, "MatchEnded").await;
    assert_eq!(ended["serverId"], "alice");
    assert_eq!(ended["reason"], "host-shutdown");

    let (status, v) = t.post("/fika/raid/join", None, json!({"serverId": "alice"})).await;
    assert_eq!(status, 200);
    assert_eq!(v, Value::Null);
}

#[tokio::test]
async fn duplicate_create_is_refused() {
    let t = boot_server().await;
    let (_, first) = t.post("/fika/raid/create", None, create_body("srv1")).await;
    let (_, second) = t.post("/fika/raid/create", None, create_body("srv1")).await;
    assert_eq!(first["success"], true);
    assert_eq!(second["success"], false);
    assert_eq!(t.health().await["matches"], 1);
}

#[tokio::test]
async fn headless_start_flow() {
    let t = boot_server().await;
    t.profiles.insert(
        "alice".into(),
        Progression {
            nickname: "alice".into(),
            level: 42,
            experience: 1_000_000,
        },
    );
    t.profiles.insert(
        "hl_1".into(),
        Progression {
            nickname: "headless".into(),
            level: 1,
            experience: 0,
        },
    );

    let mut worker = t.connect("hl_1").await;
    let mut alice = t.connect("alice").await;
    t.wait_for_connections(2).await;

    let (_, v) = t.post("/fika/raid/headless/getstatus", None, json!({})).await;
    assert_eq!(v, json!({"available": false}));

    let (status, v) = t
        .post("/fika/raid/headless/status", Some("hl_1"), json!({"status": "READY"}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(v, json!({"sessionId": "hl_1", "status": "READY"}));

    let _ = next_of_type(&mut alice, "HeadlessAvailable").await;
    let (_, v) = t.post("/fika/raid/headless/getstatus", None, json!({})).await;
    assert_eq!(v, json!({"available": true}));

    let (status, v) = t
        .post(
            "/fika/raid/headless/start",
            Some("alice"),
            json!({"location": "factory4_day", "side": "Pmc"}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(v, json!({"matchId": "hl_1", "error": null}));

    let command = next_of_type(&mut worker, "fikaHeadlessStartRaid").await;
    assert_eq!(command["requesterSessionId"], "alice");
    assert_eq!(command["location"], "factory4_day");
    assert_eq!(command["side"], "Pmc");

    let (_, rows) = t.post("/fika/headless/list", None, json!({})).await;
    assert_eq!(rows[0]["sessionId"], "hl_1");
    assert_eq!(rows[0]["state"], "ASSIGNED");
    assert_eq!(rows[0]["connected"], true);

    // The worker is busy; a second requester is turned away.
    let (_, v) = t
        .post("/fika/raid/headless/start", Some("carol"), json!({}))
        .await;
    assert_eq!(v["matchId"], Value::Null);
    assert!(v["error"].is_string());
}

#[tokio::test]
async fn worker_cannot_request_itself() {
    let t = boot_server().await;
    let _worker = t.connect("hl_1").await;
    t.wait_for_connections(1).await;
    let _ = t
        .post("/fika/raid/headless/status", Some("hl_1"), json!({"status": 1}))
        .await;

    let (status, v) = t.post("/fika/raid/headless/start", Some("hl_1"), json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(v["matchId"], Value::Null);
    assert!(v["error"].as_str().unwrap().contains("Fika.Headless"));
}

#[tokio::test]
async fn status_report_accepts_session_cookie() {
    let t = boot_server().await;
    let resp = t
        .http
        .post(format!("http://{}/fika/raid/headless/status", t.addr))
        .header("cookie", "PHPSESSID=hl_7")
        .json(&json!({"status": "IN_RAID"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let v: Value = resp.json().await.unwrap();
    assert_eq!(v, json!({"sessionId": "hl_7", "status": "IN_RAID"}));
}

#[tokio::test]
async fn disconnected_worker_is_not_available() {
    let t = boot_server().await;
    let mut worker = t.connect("hl_1").await;
    t.wait_for_connections(1).await;
    let _ = t
        .post("/fika/raid/headless/status", Some("hl_1"), json!({"status": "READY"}))
        .await;
    let (_, v) = t.post("/fika/raid/headless/getstatus", None, json!({})).await;
    assert_eq!(v["available"], true);

    worker.close(None).await.unwrap();
    t.wait_for_connections(0).await;

    let (_, v) = t.post("/fika/raid/headless/getstatus", None, json!({})).await;
    assert_eq!(v["available"], false);
    let (_, v) = t.post("/fika/raid/headless/start", Some("alice"), json!({})).await;
    assert_eq!(v["matchId"], Value::Null);
}

#[tokio::test]
async fn reconnect_replaces_previous_socket() {
    let t = boot_server().await;
    let mut first = t.connect("alice").await;
    t.wait_for_connections(1).await;
    let _second = t.connect("alice").await;

    // The displaced socket is closed by the server.
    let closed = timeout(TIMEOUT, async {
        loop {
            match first.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok());
    t.wait_for_connections(1).await;
}

#[tokio::test]
async fn notification_requires_session() {
    let t = boot_server().await;
    let err = connect_async(format!("ws://{}/fika/notification", t.addr))
        .await
        .unwrap_err();
    match err {
        tokio_tungstenite::tungstenite::Error::Http(resp) => {
            assert_eq!(resp.status().as_u16(), 401);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn client_frames_are_ignored() {
    let t = boot_server().await;
    let mut ws = t.connect("alice").await;
    t.wait_for_connections(1).await;
    ws.send(Message::Text("keepalive".into())).await.unwrap();
    let (_, v) = t.post("/fika/raid/headless/getstatus", None, json!({})).await;
    assert_eq!(v["available"], false);
    assert_eq!(t.health().await["connections"], 1);
}

#[tokio::test]
async fn metrics_and_shutdown() {
    let t = boot_server().await;
    let resp = t
        .http
        .get(format!("http://{}/metrics", t.addr))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let mut ws = t.connect("alice").await;
    t.wait_for_connections(1).await;
    t.server.shutdown().shutdown();

    let closed = timeout(TIMEOUT, async {
        loop {
            match ws.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok());
}
