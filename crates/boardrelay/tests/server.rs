//! End-to-end tests: a real server on a random port, driven by
//! `tokio-tungstenite` clients.

use std::sync::Arc;
use std::time::Duration;

use boardrelay::prelude::*;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

struct TestServer {
    addr: String,
    store: Arc<MemoryStore>,
    admin: AdminHandle<MemoryStore>,
}

/// Starts a server on a random port with `workers` workers.
async fn start_server(workers: usize) -> TestServer {
    start_server_with(workers, Credentials::default()).await
}

async fn start_server_with(workers: usize, credentials: Credentials) -> TestServer {
    let store = Arc::new(MemoryStore::default());
    let server = BoardRelayServerBuilder::new()
        .bind("127.0.0.1:0")
        .workers(workers)
        .credentials(credentials)
        .restart_backoff(Duration::from_secs(60))
        .build(Arc::clone(&store))
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();
    let admin = server.admin();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the workers a moment to log in and start accepting.
    tokio::time::sleep(Duration::from_millis(20)).await;
    TestServer { addr, store, admin }
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send_json(ws: &mut ClientWs, msg: &ClientMessage) {
    let text = serde_json::to_string(msg).expect("encode");
    ws.send(Message::Text(text.into())).await.expect("send");
}

/// Next data frame, skipping control frames. Panics after two seconds.
async fn next_frame(ws: &mut ClientWs) -> Message {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("frame should arrive")
            .expect("stream open")
            .expect("valid frame");
        if msg.is_text() || msg.is_binary() {
            return msg;
        }
    }
}

async fn recv_message(ws: &mut ClientWs) -> ServerMessage {
    let msg = next_frame(ws).await;
    assert!(msg.is_text(), "expected text frame, got {msg:?}");
    serde_json::from_str(msg.to_text().expect("utf8")).expect("decode")
}

async fn recv_record(ws: &mut ClientWs) -> EventRecord {
    let msg = next_frame(ws).await;
    assert!(msg.is_binary(), "expected binary frame, got {msg:?}");
    bincode::deserialize(&msg.into_data()).expect("decode record")
}

/// Asserts nothing arrives for a short while.
async fn assert_quiet(ws: &mut ClientWs) {
    let got = tokio::time::timeout(Duration::from_millis(150), ws.next()).await;
    assert!(got.is_err(), "expected no frame, got {got:?}");
}

/// Joins and returns whether the player became the hunter.
async fn initialize(ws: &mut ClientWs) -> bool {
    send_json(ws, &ClientMessage::Initialize).await;
    match recv_message(ws).await {
        ServerMessage::Initialize { is_hunter } => is_hunter,
        other => panic!("expected initialize reply, got {other:?}"),
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_first_player_is_hunter() {
    let server = start_server(1).await;
    let mut ws = connect(&server.addr).await;

    assert!(initialize(&mut ws).await);
    assert_eq!(server.store.boards().await.len(), 1);
}

#[tokio::test]
async fn test_two_player_round_from_join_to_hunter_win() {
    let server = start_server(1).await;
    let mut p1 = connect(&server.addr).await;
    let mut p2 = connect(&server.addr).await;

    assert!(initialize(&mut p1).await);
    assert!(!initialize(&mut p2).await);

    // P2 gets the board replayed: P1's record, then its own.
    let hunter = recv_record(&mut p2).await;
    assert_eq!(hunter.role, Role::Hunter);
    let own = recv_record(&mut p2).await;
    assert_eq!(own.role, Role::Target);

    send_json(&mut p2, &ClientMessage::TargetDead { id: own.connection }).await;
    assert_eq!(
        recv_message(&mut p1).await,
        ServerMessage::TargetDead { id: own.connection }
    );

    send_json(&mut p1, &ClientMessage::HunterWin).await;
    assert_eq!(recv_message(&mut p1).await, ServerMessage::HunterWin);
    assert_eq!(recv_message(&mut p2).await, ServerMessage::HunterWin);

    let boards = server.store.boards().await;
    assert_eq!(boards[0].capacity, CLOSED_SENTINEL);
    assert!(server.store.events().await.iter().all(|r| r.state == EventState::Dead));
}

#[tokio::test]
async fn test_position_reaches_others_but_not_sender() {
    let server = start_server(1).await;
    let mut p1 = connect(&server.addr).await;
    let mut p2 = connect(&server.addr).await;
    initialize(&mut p1).await;
    initialize(&mut p2).await;
    recv_record(&mut p2).await;
    recv_record(&mut p2).await;

    p1.send(Message::Binary(vec![10, 20, 30].into())).await.unwrap();

    let rec = recv_record(&mut p2).await;
    assert_eq!(rec.role, Role::Hunter);
    assert_eq!(rec.position, vec![10, 20, 30]);
    assert_quiet(&mut p1).await;
}

#[tokio::test]
async fn test_invalid_text_is_skipped() {
    let server = start_server(1).await;
    let mut ws = connect(&server.addr).await;

    ws.send(Message::Text("not json".into())).await.unwrap();
    ws.send(Message::Text("{\"type\":\"teleport\"}".into())).await.unwrap();

    assert!(initialize(&mut ws).await, "connection still usable");
}

#[tokio::test]
async fn test_disconnected_player_misses_close_but_board_still_ends() {
    let server = start_server(1).await;
    let mut p1 = connect(&server.addr).await;
    let mut p2 = connect(&server.addr).await;
    initialize(&mut p1).await;
    initialize(&mut p2).await;
    p2.close(None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(server.store.boards().await[0].member_count(), 2);

    send_json(&mut p1, &ClientMessage::Dead).await;
    assert_eq!(recv_message(&mut p1).await, ServerMessage::Dead);
    assert!(server.store.boards().await[0].is_closed());
}

#[tokio::test]
async fn test_workers_keep_boards_within_capacity() {
    let server = start_server(4).await;
    let mut clients = Vec::new();
    let mut hunters = 0;
    for _ in 0..12 {
        let mut ws = connect(&server.addr).await;
        if initialize(&mut ws).await {
            hunters += 1;
        }
        clients.push(ws);
    }

    let boards = server.store.boards().await;
    assert_eq!(hunters, boards.len(), "one hunter per board");
    assert!(boards.iter().all(|b| b.capacity <= 5));
    let seated: usize = boards.iter().map(|b| b.member_count()).sum();
    assert_eq!(seated, 12);
}

#[tokio::test]
async fn test_admin_reset_closes_live_boards() {
    let server = start_server(1).await;
    let mut ws = connect(&server.addr).await;
    initialize(&mut ws).await;

    let closed = server.admin.reset_boards().await.unwrap();

    assert_eq!(closed, 1);
    assert!(server.store.boards().await.iter().all(|b| b.is_closed()));

    // The player can start over on a fresh board.
    assert!(initialize(&mut ws).await);
    assert_eq!(server.store.boards().await.len(), 2);
}

#[tokio::test]
async fn test_worker_with_bad_credentials_never_accepts() {
    let server = start_server_with(1, Credentials::new("admin", "wrong")).await;

    let attempt = tokio::time::timeout(
        Duration::from_millis(300),
        tokio_tungstenite::connect_async(format!("ws://{}", server.addr)),
    )
    .await;

    assert!(attempt.is_err(), "handshake should never be answered");
}

#[tokio::test]
async fn test_silent_tcp_client_does_not_block_other_players() {
    let server = start_server(1).await;
    // Opens a socket but never sends the upgrade request.
    let _silent = tokio::net::TcpStream::connect(&server.addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let mut ws = tokio::time::timeout(Duration::from_secs(2), connect(&server.addr))
        .await
        .expect("handshake should not wait behind the silent client");

    assert!(initialize(&mut ws).await);
}
