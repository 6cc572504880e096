//! End-to-end tests against a local axum WebSocket server.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::{any, post};
use axum::{Json, Router};
use bingo_sdk::{
    BingoRealtime, ClientConfig, ConnectionPool, KeyValueStore, LeaderboardSubscription,
    MemoryStore, SubscriptionRequest, SubscriptionState, WsConfig,
};
use bingo_sdk::ws::CredentialSource;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
enum Push {
    Frame(String),
    Close(u16),
}

#[derive(Default)]
struct Recorded {
    subscribes: Vec<(String, String)>,
    client_closes: Vec<Option<u16>>,
}

#[derive(Clone)]
struct TestServer {
    connections: Arc<AtomicUsize>,
    token_requests: Arc<AtomicUsize>,
    recorded: Arc<Mutex<Recorded>>,
    push: broadcast::Sender<Push>,
}

impl TestServer {
    fn new() -> Self {
        let (push, _) = broadcast::channel(64);
        Self {
            connections: Arc::new(AtomicUsize::new(0)),
            token_requests: Arc::new(AtomicUsize::new(0)),
            recorded: Arc::new(Mutex::new(Recorded::default())),
            push,
        }
    }

    fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    fn subscribes(&self) -> Vec<(String, String)> {
        self.recorded.lock().expect("recorded").subscribes.clone()
    }

    fn client_closes(&self) -> Vec<Option<u16>> {
        self.recorded.lock().expect("recorded").client_closes.clone()
    }

    fn send(&self, frame: Value) {
        let _ = self.push.send(Push::Frame(frame.to_string()));
    }

    fn send_raw(&self, text: &str) {
        let _ = self.push.send(Push::Frame(text.to_string()));
    }

    fn close_all(&self, code: u16) {
        let _ = self.push.send(Push::Close(code));
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<HashMap<String, String>>,
    State(server): State<TestServer>,
) -> impl IntoResponse {
    let token = params.get("token").cloned().unwrap_or_default();
    ws.on_upgrade(move |socket| handle_socket(socket, token, server))
}

async fn handle_socket(socket: WebSocket, token: String, server: TestServer) {
    server.connections.fetch_add(1, Ordering::SeqCst);
    let mut pushes = server.push.subscribe();
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let Ok(message) = serde_json::from_str::<Value>(text.as_str()) else {
                        continue;
                    };
                    if message["action"] == "subscribe" {
                        let game_id = message["gameId"].as_str().unwrap_or_default().to_string();
                        server
                            .recorded
                            .lock()
                            .expect("recorded")
                            .subscribes
                            .push((token.clone(), game_id.clone()));
                        let ack = json!({"type": "subscribed", "gameId": game_id});
                        if sender.send(Message::Text(ack.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    server
                        .recorded
                        .lock()
                        .expect("recorded")
                        .client_closes
                        .push(frame.map(|f| f.code));
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(_)) | None => break,
            },
            push = pushes.recv() => match push {
                Ok(Push::Frame(text)) => {
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Ok(Push::Close(code)) => {
                    let frame = CloseFrame {
                        code,
                        reason: "server restart".into(),
                    };
                    let _ = sender.send(Message::Close(Some(frame))).await;
                    break;
                }
                Err(_) => break,
            },
        }
    }
}

async fn public_token_handler(
    State(server): State<TestServer>,
    Json(body): Json<Value>,
) -> Json<Value> {
    server.token_requests.fetch_add(1, Ordering::SeqCst);
    let device_id = body["deviceId"].as_str().unwrap_or("device-from-server");
    Json(json!({
        "success": true,
        "deviceId": device_id,
        "publicToken": "public-token-abcdefghijklmnop"
    }))
}

async fn spawn_server() -> (SocketAddr, TestServer) {
    let server = TestServer::new();
    let app = Router::new()
        .route("/ws", any(ws_handler))
        .route("/public-token", post(public_token_handler))
        .with_state(server.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    (addr, server)
}

fn ws_config(addr: SocketAddr) -> WsConfig {
    WsConfig::new(format!("ws://{}/ws", addr))
        .with_reconnect_delay(Duration::from_millis(50))
        .with_max_reconnect_delay(Duration::from_millis(200))
}

fn session_subscription(pool: &ConnectionPool, game_id: &str) -> LeaderboardSubscription {
    LeaderboardSubscription::start(
        pool.clone(),
        Some(game_id.to_string()),
        CredentialSource::Session("session-token-alice-0123456789".to_string()),
    )
}

async fn wait_for(
    subscription: &LeaderboardSubscription,
    condition: impl FnMut(&SubscriptionState) -> bool,
) -> SubscriptionState {
    let mut rx = subscription.watch();
    let state = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(condition))
        .await
        .expect("state condition not reached")
        .expect("subscription alive")
        .clone();
    state
}

async fn until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("server condition not reached");
}

fn leaderboard(points: i64) -> Value {
    json!({
        "type": "leaderboard_update",
        "gameId": "g1",
        "leaderboard": [
            {"sessionId": "s1", "nickname": "Alice", "points": points, "rank": 1},
            {"sessionId": "s2", "nickname": "Bob", "points": 10, "rank": 2}
        ],
        "totalPlayers": 7,
        "timestamp": "2026-01-01T12:00:00Z"
    })
}

#[tokio::test]
async fn shared_socket_fans_out_frames() {
    let (addr, server) = spawn_server().await;
    let pool = ConnectionPool::with_tungstenite(ws_config(addr)).expect("pool");

    let a = session_subscription(&pool, "g1");
    let b = session_subscription(&pool, "g1");
    wait_for(&a, |s| s.is_connected && !s.is_loading).await;
    wait_for(&b, |s| s.is_connected && !s.is_loading).await;

    assert_eq!(server.connections(), 1);
    assert_eq!(
        server.subscribes(),
        vec![(
            "session-token-alice-0123456789".to_string(),
            "g1".to_string()
        )]
    );

    server.send(leaderboard(30));
    for subscription in [&a, &b] {
        let state = wait_for(subscription, |s| s.leaderboard.is_some()).await;
        let snapshot = state.leaderboard.expect("snapshot");
        assert_eq!(snapshot.total_players, 7);
        assert_eq!(snapshot.leaderboard[0].nickname, "Alice");
    }

    server.send(json!({
        "type": "activity_event",
        "event": {"id": "e1", "type": "bingo_called", "payload": {"nickname": "Alice"}, "timestamp": "T2"}
    }));
    server.send(json!({
        "type": "game_state_changed",
        "previousState": "active",
        "newState": "bingo",
        "winner": {"sessionId": "s1", "nickname": "Alice", "points": 30}
    }));

    let state = wait_for(&b, |s| s.winner.is_some()).await;
    assert_eq!(state.game_status.as_deref(), Some("bingo"));
    assert_eq!(state.events.latest().map(|e| e.event_type.as_str()), Some("bingo_called"));
}

#[tokio::test]
async fn last_unsubscribe_closes_normally() {
    let (addr, server) = spawn_server().await;
    let pool = ConnectionPool::with_tungstenite(ws_config(addr)).expect("pool");

    let a = session_subscription(&pool, "g1");
    let b = session_subscription(&pool, "g1");
    wait_for(&a, |s| s.is_connected).await;
    wait_for(&b, |s| s.is_connected).await;

    a.unsubscribe();
    server.send(leaderboard(40));
    wait_for(&b, |s| s.leaderboard.is_some()).await;
    assert!(server.client_closes().is_empty());

    b.unsubscribe();
    until(|| !server.client_closes().is_empty()).await;
    assert_eq!(server.client_closes(), vec![Some(1000)]);
    assert_eq!(pool.connection_count(), 0);
}

#[tokio::test]
async fn malformed_frames_do_not_break_the_socket() {
    let (addr, server) = spawn_server().await;
    let pool = ConnectionPool::with_tungstenite(ws_config(addr)).expect("pool");
    let subscription = session_subscription(&pool, "g1");
    wait_for(&subscription, |s| s.is_connected).await;

    server.send_raw("this is not json");
    server.send(json!({"type": "unknown_frame"}));
    server.send(leaderboard(55));

    let state = wait_for(&subscription, |s| s.leaderboard.is_some()).await;
    assert!(state.is_connected);
    assert_eq!(pool.metrics().frames_dropped(), 2);
}

#[tokio::test]
async fn abnormal_server_close_triggers_reconnect() {
    let (addr, server) = spawn_server().await;
    let pool = ConnectionPool::with_tungstenite(ws_config(addr)).expect("pool");
    let subscription = session_subscription(&pool, "g1");
    wait_for(&subscription, |s| s.is_connected).await;
    server.send(leaderboard(30));
    wait_for(&subscription, |s| s.leaderboard.is_some()).await;

    server.close_all(1011);

    let state = wait_for(&subscription, |s| !s.is_connected).await;
    assert!(state.leaderboard.is_some());

    wait_for(&subscription, |s| s.is_connected).await;
    until(|| server.subscribes().len() == 2).await;
    assert_eq!(server.connections(), 2);
}

#[tokio::test]
async fn anonymous_board_mints_and_caches_public_token() {
    let (addr, server) = spawn_server().await;
    let store = Arc::new(MemoryStore::new());

    let realtime = BingoRealtime::connect(
        ws_config(addr),
        ClientConfig::new(format!("http://{}", addr)),
        Arc::clone(&store),
    )
    .expect("realtime")
    .with_device_id("lobby-screen");

    let first = realtime.subscribe(SubscriptionRequest::game("g1"));
    wait_for(&first, |s| s.is_connected).await;
    let second = realtime.subscribe(SubscriptionRequest::game("g2"));
    wait_for(&second, |s| s.is_connected).await;

    assert_eq!(server.token_requests.load(Ordering::SeqCst), 1);
    assert_eq!(server.connections(), 2);
    until(|| server.subscribes().len() == 2).await;
    assert!(server
        .subscribes()
        .iter()
        .all(|(token, _)| token == "public-token-abcdefghijklmnop"));
    assert_eq!(
        store.get("bingo.deviceId").expect("store"),
        Some("lobby-screen".to_string())
    );

    realtime.shutdown();
    wait_for(&first, |s| !s.is_connected).await;
    assert_eq!(realtime.pool().connection_count(), 0);
}
