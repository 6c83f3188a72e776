//! End-to-end tests: a real server on a random port driven by
//! tokio-tungstenite clients.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use typerace::prelude::*;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

struct TestServer {
    addr: String,
    store: MemoryStore,
    code: RoomCode,
    hub: Hub<MemoryStore>,
}

/// A short race: 3-unit countdown, 30-unit race, 10ms units.
fn fast_config() -> HubConfig {
    HubConfig {
        countdown_units: 3,
        race_units: 30,
        grace_units: 5,
        time_unit: Duration::from_millis(10),
        ..HubConfig::default()
    }
}

/// Starts a server on a random port with alice, bob and carol registered
/// and one room owned by alice.
async fn start_server() -> TestServer {
    let store = MemoryStore::new();
    let alice = store.create_user("alice", "Alice").unwrap();
    store.create_user("bob", "Bob").unwrap();
    store.create_user("carol", "Carol").unwrap();
    let room = store.create_room(alice.id, "pack my box with five dozen liquor jugs").unwrap();

    let server = TyperaceServerBuilder::new()
        .bind("127.0.0.1:0")
        .hub_config(fast_config())
        .build(store.clone())
        .await
        .expect("server should build");
    let addr = server.local_addr().expect("should have local addr").to_string();
    let hub = server.hub().clone();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    TestServer {
        addr,
        store,
        code: room.code,
        hub,
    }
}

async fn connect(addr: &str, path: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}{path}"))
        .await
        .expect("should connect");
    ws
}

async fn join(server: &TestServer, name: &str) -> ClientWs {
    connect(&server.addr, &format!("/ws/{}?username={name}", server.code)).await
}

/// The next JSON event, skipping control frames.
async fn next_event(ws: &mut ClientWs) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for an event")
            .expect("stream ended")
            .expect("recv error");
        match msg {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Close(frame) => panic!("unexpected close: {frame:?}"),
            _ => continue,
        }
    }
}

async fn next_of(ws: &mut ClientWs, kind: &str) -> Value {
    loop {
        let event = next_event(ws).await;
        if event["type"] == kind {
            return event;
        }
    }
}

/// The reason of the close frame the server sends.
async fn close_reason(ws: &mut ClientWs) -> String {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for close")
            .expect("stream ended")
            .expect("recv error");
        if let Message::Close(Some(frame)) = msg {
            assert_eq!(frame.code, CloseCode::Policy);
            return frame.reason.as_str().to_string();
        }
    }
}

async fn send_json(ws: &mut ClientWs, value: Value) {
    ws.send(Message::text(value.to_string())).await.expect("send");
}

// =========================================================================
// Rejections
// =========================================================================

#[tokio::test]
async fn test_join_without_username_is_closed_with_reason() {
    let server = start_server().await;
    let mut ws = connect(&server.addr, &format!("/ws/{}", server.code)).await;
    assert_eq!(close_reason(&mut ws).await, "Missing room_code or username");
}

#[tokio::test]
async fn test_join_unknown_room_is_closed_with_reason() {
    let server = start_server().await;
    let mut ws = connect(&server.addr, "/ws/000000?username=alice").await;
    assert_eq!(close_reason(&mut ws).await, "Room not found");
    assert_eq!(server.hub.session_count().await, 0);
}

#[tokio::test]
async fn test_join_duplicate_username_is_closed_with_reason() {
    let server = start_server().await;
    let mut first = join(&server, "alice").await;
    next_of(&mut first, "player_list").await;

    let mut second = join(&server, "alice").await;
    assert_eq!(close_reason(&mut second).await, "Username already connected");
}

#[tokio::test]
async fn test_third_player_is_closed_with_reason() {
    let server = start_server().await;
    let mut alice = join(&server, "alice").await;
    let _bob = join(&server, "bob").await;
    next_of(&mut alice, "countdown").await;

    let mut carol = join(&server, "carol").await;
    assert_eq!(close_reason(&mut carol).await, "Room is full");
}

// =========================================================================
// Room flow
// =========================================================================

#[tokio::test]
async fn test_join_and_leave_update_player_list() {
    let server = start_server().await;
    let mut alice = join(&server, "alice").await;
    assert_eq!(
        next_event(&mut alice).await,
        json!({"type": "player_list", "payload": ["alice"]})
    );

    let mut bob = join(&server, "bob").await;
    assert_eq!(
        next_of(&mut alice, "player_list").await["payload"],
        json!(["alice", "bob"])
    );

    bob.close(None).await.expect("close");
    assert_eq!(
        next_of(&mut alice, "player_list").await["payload"],
        json!(["alice"])
    );
}

#[tokio::test]
async fn test_bad_frames_do_not_close_the_connection() {
    let server = start_server().await;
    let mut alice = join(&server, "alice").await;
    next_event(&mut alice).await;

    send_json(&mut alice, json!({"type": "chat", "payload": "hi"})).await;
    alice.send(Message::text("not json")).await.expect("send");
    send_json(&mut alice, json!({"type": "stats_update", "payload": {"wpm": "fast"}})).await;

    let _bob = join(&server, "bob").await;
    assert_eq!(
        next_of(&mut alice, "player_list").await["payload"],
        json!(["alice", "bob"])
    );
}

#[tokio::test]
async fn test_full_race_announces_winner_and_records_results() {
    let server = start_server().await;
    let mut alice = join(&server, "alice").await;
    let mut bob = join(&server, "bob").await;

    let first = next_of(&mut alice, "countdown").await;
    assert_eq!(first["payload"]["seconds"], 3);
    next_of(&mut alice, "start").await;
    next_of(&mut bob, "start").await;

    send_json(
        &mut alice,
        json!({"type": "stats_update", "payload": {"wpm": 85, "accuracy": 0.96, "errors": 1.0}}),
    )
    .await;
    send_json(
        &mut bob,
        json!({"type": "stats_update", "payload": {"wpm": 70, "accuracy": 0.99, "errors": 0.0}}),
    )
    .await;

    let update = next_of(&mut bob, "stats_update").await;
    assert!(update["payload"].get("alice").is_some() || update["payload"].get("bob").is_some());

    let over = next_of(&mut alice, "game_over").await;
    assert_eq!(over["payload"]["winner"], "alice");
    assert_eq!(over["payload"]["stats"]["bob"]["wpm"], 70);
    assert_eq!(next_of(&mut bob, "game_over").await, over);

    // Persistence runs right after the broadcast.
    let mut results = Vec::new();
    for _ in 0..50 {
        results = server.store.results();
        if results.len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(results.len(), 2);
    assert_eq!(results.iter().filter(|r| r.won).count(), 1);

    // Torn down after the grace delay.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.hub.session_count().await, 0);
    assert!(server.store.room(&server.code).is_none());
}
