//! End-to-end coverage of the socket protocol: register, create, join, play
//! a hand, and read the authoritative results off the wire.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use holdem_server::config::ServerDefaults;
use holdem_server::server::bootstrap::{build_context, serve, ServerConfig};
use holdem_server::server::dto::ServerMessage;

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server() -> SocketAddr {
    let mut defaults = ServerDefaults::default();
    defaults.table.post_hand_delay = Duration::from_secs(60);
    let config = ServerConfig {
        bind: "127.0.0.1:0".parse().unwrap(),
        database_url: None,
        defaults,
    };
    let context = build_context(&config).await.expect("context builds");
    let listener = TcpListener::bind(config.bind).await.expect("bind");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = serve(listener, context).await;
    });
    addr
}

async fn connect(addr: SocketAddr) -> WsClient {
    let (client, _) = connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("websocket connects");
    client
}

async fn send(client: &mut WsClient, json: serde_json::Value) {
    client
        .send(Message::Text(json.to_string()))
        .await
        .expect("send succeeds");
}

async fn next_message(client: &mut WsClient) -> ServerMessage {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match client.next().await.expect("stream open").expect("frame ok") {
                Message::Text(text) => {
                    return serde_json::from_str(&text).expect("valid server message")
                }
                _ => continue,
            }
        }
    })
    .await
    .expect("message before timeout")
}

async fn expect<F>(client: &mut WsClient, pred: F) -> ServerMessage
where
    F: Fn(&ServerMessage) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let msg = next_message(client).await;
            if pred(&msg) {
                return msg;
            }
        }
    })
    .await
    .expect("expected message before timeout")
}

async fn register(client: &mut WsClient, player: &str) {
    send(
        client,
        serde_json::json!({
            "type": "register",
            "playerId": player,
            "authToken": format!("dev:{player}"),
        }),
    )
    .await;
    let msg = expect(client, |m| matches!(m, ServerMessage::Registered { .. })).await;
    match msg {
        ServerMessage::Registered { player_id } => assert_eq!(player_id, player),
        _ => unreachable!(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn full_session_heads_up_fold() {
    let addr = spawn_server().await;

    let mut alice = connect(addr).await;
    register(&mut alice, "alice").await;

    send(&mut alice, serde_json::json!({"type": "createTable"})).await;
    let table_id = match expect(&mut alice, |m| {
        matches!(m, ServerMessage::TableCreated { .. })
    })
    .await
    {
        ServerMessage::TableCreated { table_id } => table_id,
        _ => unreachable!(),
    };
    assert_eq!(table_id.len(), 6);

    send(
        &mut alice,
        serde_json::json!({"type": "joinTable", "tableId": table_id}),
    )
    .await;
    expect(&mut alice, |m| matches!(m, ServerMessage::TableState { .. })).await;

    let mut bob = connect(addr).await;
    register(&mut bob, "bob").await;
    send(
        &mut bob,
        serde_json::json!({"type": "joinTable", "tableId": table_id}),
    )
    .await;
    expect(&mut bob, |m| matches!(m, ServerMessage::TableState { .. })).await;

    send(
        &mut alice,
        serde_json::json!({"type": "startTable", "tableId": table_id}),
    )
    .await;
    expect(&mut alice, |m| matches!(m, ServerMessage::HandStarted { .. })).await;

    // both seats hold exactly two private cards
    let hole = expect(&mut alice, |m| matches!(m, ServerMessage::HoleCards { .. })).await;
    match hole {
        ServerMessage::HoleCards { seat, .. } => assert_eq!(seat, 0),
        _ => unreachable!(),
    }
    expect(&mut bob, |m| matches!(m, ServerMessage::HoleCards { .. })).await;

    // heads-up: the button posts the small blind and acts first
    let turn = expect(&mut bob, |m| matches!(m, ServerMessage::TurnChanged { .. })).await;
    assert!(matches!(turn, ServerMessage::TurnChanged { seat: 0, .. }));
    let your_turn = expect(&mut alice, |m| matches!(m, ServerMessage::YourTurn { .. })).await;
    match your_turn {
        ServerMessage::YourTurn {
            seat, legal_actions, ..
        } => {
            assert_eq!(seat, 0);
            assert!(legal_actions.may_fold);
            assert_eq!(legal_actions.call_amount, Some(5));
        }
        _ => unreachable!(),
    }

    send(
        &mut alice,
        serde_json::json!({"type": "action", "tableId": table_id, "kind": "fold"}),
    )
    .await;

    let result = expect(&mut bob, |m| matches!(m, ServerMessage::HandResult { .. })).await;
    match result {
        ServerMessage::HandResult { result, .. } => {
            assert!(!result.aborted);
            assert!(result.revealed.is_empty());
            assert_eq!(result.pots.len(), 1);
            assert_eq!(result.pots[0].winners[0].seat, 1);
        }
        _ => unreachable!(),
    }

    // the sanitized resend reflects the settled stacks
    send(
        &mut bob,
        serde_json::json!({"type": "requestState", "tableId": table_id}),
    )
    .await;
    let state = expect(&mut bob, |m| matches!(m, ServerMessage::TableState { .. })).await;
    match state {
        ServerMessage::TableState { state, .. } => {
            let stacks: Vec<u64> = state.seats.iter().flatten().map(|s| s.stack).collect();
            assert_eq!(stacks, vec![995, 1005]);
        }
        _ => unreachable!(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unregistered_messages_are_rejected() {
    let addr = spawn_server().await;
    let mut client = connect(addr).await;

    send(&mut client, serde_json::json!({"type": "listTables"})).await;
    let msg = next_message(&mut client).await;
    assert!(matches!(msg, ServerMessage::Error { code, .. } if code == "not_registered"));

    send(
        &mut client,
        serde_json::json!({"type": "register", "playerId": "eve", "authToken": "dev:mallory"}),
    )
    .await;
    let msg = next_message(&mut client).await;
    assert!(matches!(msg, ServerMessage::Error { code, .. } if code == "auth_mismatch"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn illegal_action_is_rejected_without_state_change() {
    let addr = spawn_server().await;

    let mut alice = connect(addr).await;
    register(&mut alice, "alice").await;
    send(&mut alice, serde_json::json!({"type": "createTable"})).await;
    let table_id = match expect(&mut alice, |m| {
        matches!(m, ServerMessage::TableCreated { .. })
    })
    .await
    {
        ServerMessage::TableCreated { table_id } => table_id,
        _ => unreachable!(),
    };
    send(
        &mut alice,
        serde_json::json!({"type": "joinTable", "tableId": table_id}),
    )
    .await;

    let mut bob = connect(addr).await;
    register(&mut bob, "bob").await;
    send(
        &mut bob,
        serde_json::json!({"type": "joinTable", "tableId": table_id}),
    )
    .await;

    // only the creator may start the table
    send(
        &mut bob,
        serde_json::json!({"type": "startTable", "tableId": table_id}),
    )
    .await;
    let msg = expect(&mut bob, |m| matches!(m, ServerMessage::Error { .. })).await;
    assert!(matches!(msg, ServerMessage::Error { code, .. } if code == "not_creator"));

    send(
        &mut alice,
        serde_json::json!({"type": "startTable", "tableId": table_id}),
    )
    .await;
    expect(&mut bob, |m| matches!(m, ServerMessage::HandStarted { .. })).await;

    // bob is the big blind and not the current actor
    send(
        &mut bob,
        serde_json::json!({"type": "action", "tableId": table_id, "kind": "check"}),
    )
    .await;
    let msg = expect(&mut bob, |m| matches!(m, ServerMessage::Error { .. })).await;
    assert!(matches!(msg, ServerMessage::Error { kind, .. } if kind == "input"));
}
