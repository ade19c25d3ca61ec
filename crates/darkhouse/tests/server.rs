//! Integration tests for the Darkhouse server over real WebSocket
//! connections.

use std::time::Duration;

use darkhouse::prelude::*;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server on a random port and returns the address.
async fn start_server(tick_rate: u32) -> String {
    let server = DarkhouseServerBuilder::new()
        .bind("127.0.0.1:0")
        .tick_rate(tick_rate)
        .prune_interval(None)
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    addr
}

/// Connects and consumes the `welcome` event.
async fn connect(addr: &str) -> (ClientWs, ConnectionId) {
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    match recv(&mut ws).await {
        ServerEvent::Welcome { connection_id } => (ws, connection_id),
        other => panic!("expected welcome, got {other:?}"),
    }
}

async fn send(ws: &mut ClientWs, intent: serde_json::Value) {
    ws.send(Message::Text(intent.to_string().into()))
        .await
        .expect("send intent");
}

async fn recv(ws: &mut ClientWs) -> ServerEvent {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for event")
            .expect("stream ended")
            .expect("ws error");
        match msg {
            Message::Text(_) | Message::Binary(_) => {
                return serde_json::from_slice(&msg.into_data()).expect("decode event");
            }
            _ => continue,
        }
    }
}

/// Receives until an event other than `world_state` arrives.
async fn recv_lobby(ws: &mut ClientWs) -> ServerEvent {
    loop {
        match recv(ws).await {
            ServerEvent::WorldState { .. } => continue,
            event => return event,
        }
    }
}

/// Receives until a `world_state` satisfying `accept` arrives.
async fn recv_world(
    ws: &mut ClientWs,
    accept: impl Fn(&[PlayerSnapshot]) -> bool,
) -> (u64, Vec<PlayerSnapshot>) {
    loop {
        if let ServerEvent::WorldState { tick, players } = recv(ws).await {
            if accept(&players) {
                return (tick, players);
            }
        }
    }
}

/// Asserts nothing but `world_state` arrives within `wait`.
async fn assert_quiet(ws: &mut ClientWs, wait: Duration) {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        match tokio::time::timeout_at(deadline, ws.next()).await {
            Err(_) => return,
            Ok(Some(Ok(msg))) if msg.is_text() || msg.is_binary() => {
                let event: ServerEvent = serde_json::from_slice(&msg.into_data()).unwrap();
                assert!(
                    matches!(event, ServerEvent::WorldState { .. }),
                    "unexpected event {event:?}"
                );
            }
            Ok(_) => {}
        }
    }
}

async fn create_room(ws: &mut ClientWs) -> RoomId {
    send(ws, json!({"type": "create"})).await;
    match recv_lobby(ws).await {
        ServerEvent::Created { room_id } => room_id,
        other => panic!("expected created, got {other:?}"),
    }
}

// =========================================================================
// Connection
// =========================================================================

#[tokio::test]
async fn test_welcome_carries_unique_connection_ids() {
    let addr = start_server(20).await;
    let (_a, id_a) = connect(&addr).await;
    let (_b, id_b) = connect(&addr).await;
    assert_ne!(id_a, id_b);
}

#[tokio::test]
async fn test_malformed_frame_gets_400_and_connection_survives() {
    let addr = start_server(20).await;
    let (mut ws, _) = connect(&addr).await;

    ws.send(Message::Text("definitely not json".into())).await.unwrap();
    match recv(&mut ws).await {
        ServerEvent::Error { code, .. } => assert_eq!(code, 400),
        other => panic!("expected error, got {other:?}"),
    }

    send(&mut ws, json!({"type": "teleport"})).await;
    assert!(matches!(recv(&mut ws).await, ServerEvent::Error { code: 400, .. }));

    create_room(&mut ws).await;
}

// =========================================================================
// Rooms
// =========================================================================

#[tokio::test]
async fn test_create_and_join_flow() {
    let addr = start_server(20).await;
    let (mut host, host_id) = connect(&addr).await;
    let (mut guest, guest_id) = connect(&addr).await;

    let room_id = create_room(&mut host).await;

    send(&mut guest, json!({"type": "join", "room_id": room_id})).await;
    assert_eq!(
        recv(&mut guest).await,
        ServerEvent::Joined {
            room_id: room_id.clone(),
            members: vec![host_id],
        }
    );
    assert_eq!(
        recv(&mut host).await,
        ServerEvent::MemberJoined {
            room_id,
            connection_id: guest_id,
        }
    );
}

#[tokio::test]
async fn test_join_with_numeric_room_id() {
    let addr = start_server(20).await;
    let (mut host, _) = connect(&addr).await;
    let (mut guest, _) = connect(&addr).await;

    let room_id = create_room(&mut host).await;
    let numeric: u64 = room_id.as_str().parse().expect("numeric room code");

    send(&mut guest, json!({"type": "join", "room_id": numeric})).await;
    assert!(matches!(recv(&mut guest).await, ServerEvent::Joined { .. }));
}

#[tokio::test]
async fn test_join_and_start_unknown_room_not_found() {
    let addr = start_server(20).await;
    let (mut ws, _) = connect(&addr).await;

    send(&mut ws, json!({"type": "join", "room_id": "nowhere"})).await;
    assert_eq!(
        recv(&mut ws).await,
        ServerEvent::RoomNotFound {
            room_id: RoomId::new("nowhere")
        }
    );

    send(&mut ws, json!({"type": "start", "room_id": "nowhere"})).await;
    assert_eq!(
        recv(&mut ws).await,
        ServerEvent::RoomNotFound {
            room_id: RoomId::new("nowhere")
        }
    );
}

#[tokio::test]
async fn test_disconnect_notifies_remaining_members() {
    let addr = start_server(20).await;
    let (mut host, _) = connect(&addr).await;
    let (mut guest, guest_id) = connect(&addr).await;

    let room_id = create_room(&mut host).await;
    send(&mut guest, json!({"type": "join", "room_id": room_id})).await;
    recv(&mut guest).await;
    recv(&mut host).await;

    guest.close(None).await.unwrap();
    assert_eq!(
        recv(&mut host).await,
        ServerEvent::MemberLeft {
            connection_id: guest_id
        }
    );
    assert_quiet(&mut host, Duration::from_millis(200)).await;
}

#[tokio::test]
async fn test_joining_another_room_leaves_the_first() {
    let addr = start_server(20).await;
    let (mut a, _) = connect(&addr).await;
    let (mut b, b_id) = connect(&addr).await;
    let (mut c, _) = connect(&addr).await;

    let first = create_room(&mut a).await;
    send(&mut b, json!({"type": "join", "room_id": first})).await;
    recv(&mut b).await;
    recv(&mut a).await;

    let second = create_room(&mut c).await;
    send(&mut b, json!({"type": "join", "room_id": second})).await;
    assert!(matches!(recv(&mut b).await, ServerEvent::Joined { .. }));

    assert_eq!(
        recv(&mut a).await,
        ServerEvent::MemberLeft {
            connection_id: b_id
        }
    );
}

// =========================================================================
// Game loop
// =========================================================================

#[tokio::test]
async fn test_start_signals_members_and_streams_world_state() {
    let addr = start_server(20).await;
    let (mut host, host_id) = connect(&addr).await;
    let (mut guest, guest_id) = connect(&addr).await;

    let room_id = create_room(&mut host).await;
    send(&mut guest, json!({"type": "join", "room_id": room_id})).await;
    recv(&mut guest).await;
    recv(&mut host).await;

    // Any member may start the room.
    send(&mut guest, json!({"type": "start", "room_id": room_id})).await;
    assert_eq!(recv_lobby(&mut host).await, ServerEvent::Started);
    assert_eq!(recv_lobby(&mut guest).await, ServerEvent::Started);

    let (tick, players) = recv_world(&mut host, |players| players.len() == 2).await;
    assert!(tick >= 1);
    let ids: Vec<_> = players.iter().map(|p| p.connection_id).collect();
    assert!(ids.contains(&host_id) && ids.contains(&guest_id));

    let (x0, y0, _) = darkhouse::spawn_point(0);
    let host_state = players.iter().find(|p| p.connection_id == host_id).unwrap();
    assert_eq!(host_state.state.position.x, x0);
    assert_eq!(host_state.state.position.y, y0);
}

#[tokio::test]
async fn test_input_moves_player_and_flashlight_toggles() {
    let addr = start_server(20).await;
    let (mut host, host_id) = connect(&addr).await;

    let room_id = create_room(&mut host).await;
    send(&mut host, json!({"type": "start", "room_id": room_id})).await;
    assert_eq!(recv_lobby(&mut host).await, ServerEvent::Started);

    let (_, y0, _) = darkhouse::spawn_point(0);
    send(&mut host, json!({"type": "input", "keys": {"up": true}})).await;
    send(&mut host, json!({"type": "flashlight", "on": true})).await;

    let (_, players) = recv_world(&mut host, |players| {
        players
            .iter()
            .any(|p| p.state.position.y > y0 + 1.0 && p.state.flashlight_on)
    })
    .await;
    assert_eq!(players[0].connection_id, host_id);
    assert!(players[0].state.animation_step > 0.0);

    // Releasing every key brings the player to a stop; snapshots already in
    // flight may still show movement.
    send(&mut host, json!({"type": "input", "keys": {}})).await;
    let mut previous = recv_world(&mut host, |_| true).await.1[0].state;
    let mut stood_still = false;
    for _ in 0..40 {
        let current = recv_world(&mut host, |_| true).await.1[0].state;
        if current.position.y == previous.position.y {
            stood_still = true;
            assert_eq!(current.animation_step, previous.animation_step);
            assert!(current.flashlight_on);
            break;
        }
        previous = current;
    }
    assert!(stood_still, "player kept moving after keys were released");
}

#[tokio::test]
async fn test_late_joiner_enters_running_game() {
    let addr = start_server(20).await;
    let (mut host, _) = connect(&addr).await;
    let (mut late, late_id) = connect(&addr).await;

    let room_id = create_room(&mut host).await;
    send(&mut host, json!({"type": "start", "room_id": room_id})).await;
    assert_eq!(recv_lobby(&mut host).await, ServerEvent::Started);

    send(&mut late, json!({"type": "join", "room_id": room_id})).await;
    assert!(matches!(recv_lobby(&mut late).await, ServerEvent::Joined { .. }));

    let (_, players) = recv_world(&mut late, |players| players.len() == 2).await;
    assert!(players.iter().any(|p| p.connection_id == late_id));

    late.close(None).await.unwrap();
    assert_eq!(
        recv_lobby(&mut host).await,
        ServerEvent::MemberLeft {
            connection_id: late_id
        }
    );
    recv_world(&mut host, |players| players.len() == 1).await;
}
