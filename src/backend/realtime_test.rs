use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{RawQuery, State};
use axum::response::Response;
use axum::routing::get;
use serde_json::{Value, json};
use tokio::time::timeout;

use super::*;
use crate::backend::{ChangeKind, ChangeListener};

// =============================================================================
// MOCK REALTIME SERVER
// =============================================================================

#[derive(Clone)]
struct ServerState {
    reject_join: bool,
    queries: Arc<Mutex<Vec<String>>>,
    seen_tx: mpsc::UnboundedSender<Value>,
    push_rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Value>>>,
}

struct MockRealtimeServer {
    url: String,
    queries: Arc<Mutex<Vec<String>>>,
    seen: mpsc::UnboundedReceiver<Value>,
    push: mpsc::UnboundedSender<Value>,
}

impl MockRealtimeServer {
    async fn start(reject_join: bool) -> Self {
        let (seen_tx, seen) = mpsc::unbounded_channel();
        let (push, push_rx) = mpsc::unbounded_channel();
        let queries = Arc::new(Mutex::new(Vec::new()));
        let state = ServerState {
            reject_join,
            queries: queries.clone(),
            seen_tx,
            push_rx: Arc::new(tokio::sync::Mutex::new(push_rx)),
        };
        let app = Router::new().route("/realtime/v1/websocket", get(upgrade)).with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind mock realtime");
        let addr = listener.local_addr().expect("mock realtime addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self { url: format!("ws://{addr}/realtime/v1/websocket"), queries, seen, push }
    }

    /// Next envelope the client sent with the given event name.
    async fn next_event(&mut self, event: &str) -> Value {
        loop {
            let msg = timeout(Duration::from_secs(2), self.seen.recv())
                .await
                .expect("client frame in time")
                .expect("server open");
            if msg["event"] == event {
                return msg;
            }
        }
    }
}

async fn upgrade(State(state): State<ServerState>, RawQuery(query): RawQuery, ws: WebSocketUpgrade) -> Response {
    state.queries.lock().expect("mock mutex should lock").push(query.unwrap_or_default());
    ws.on_upgrade(move |socket| serve(socket, state))
}

async fn serve(mut socket: WebSocket, state: ServerState) {
    let mut push_rx = state.push_rx.lock().await;
    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let Some(Ok(WsMessage::Text(text))) = incoming else { break };
                let Ok(msg) = serde_json::from_str::<Value>(text.as_str()) else { continue };
                if msg["event"] == "phx_join" {
                    let status = if state.reject_join { "error" } else { "ok" };
                    let reply = json!({
                        "topic": msg["topic"],
                        "event": "phx_reply",
                        "payload": {"status": status, "response": {"reason": "unauthorized"}},
                        "ref": msg["ref"],
                    });
                    if socket.send(WsMessage::Text(reply.to_string().into())).await.is_err() {
                        break;
                    }
                }
                let _ = state.seen_tx.send(msg);
            }
            Some(push) = push_rx.recv() => {
                if socket.send(WsMessage::Text(push.to_string().into())).await.is_err() {
                    break;
                }
            }
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn inbox_spec(user_id: &str) -> ChannelSpec {
    ChannelSpec::new(format!("unread-messages:{user_id}"))
        .listen(ChangeListener::new(ChangeKind::Insert, "messages").where_eq("receiver_id", user_id))
}

fn change_envelope(topic: &str, receiver: &str) -> Value {
    json!({
        "topic": topic,
        "event": "postgres_changes",
        "payload": {
            "data": {
                "type": "INSERT",
                "schema": "public",
                "table": "messages",
                "record": {"id": 1, "receiver_id": receiver, "is_read": false},
                "old_record": null
            }
        },
        "ref": null
    })
}

fn socket_for(url: &str) -> RealtimeSocket {
    let config = BackendConfig { realtime_url: url.to_owned(), ..BackendConfig::new("http://127.0.0.1:1", "anon-key") };
    let token = AccessToken::default();
    token.set("user-jwt");
    RealtimeSocket::new(&config, token)
}

// =============================================================================
// TESTS
// =============================================================================

#[tokio::test]
async fn subscribe_joins_and_forwards_matching_changes() {
    let mut server = MockRealtimeServer::start(false).await;
    let socket = socket_for(&server.url);

    let mut sub = socket.subscribe(inbox_spec("u-1")).await.expect("subscribe");
    assert_eq!(sub.handle.channel(), "unread-messages:u-1");

    let join = server.next_event("phx_join").await;
    assert_eq!(join["topic"], "realtime:unread-messages:u-1");
    assert_eq!(join["payload"]["access_token"], "user-jwt");
    assert_eq!(join["payload"]["config"]["postgres_changes"][0]["filter"], "receiver_id=eq.u-1");

    let queries = server.queries.lock().expect("mock mutex should lock").clone();
    assert!(queries[0].contains("apikey=anon-key"));
    assert!(queries[0].contains("vsn=1.0.0"));

    server.push.send(change_envelope("realtime:unread-messages:u-1", "u-2")).expect("push");
    server.push.send(change_envelope("realtime:unread-messages:u-1", "u-1")).expect("push");

    let event = timeout(Duration::from_secs(2), sub.events.recv()).await.expect("event in time").expect("event");
    assert_eq!(event.record["receiver_id"], "u-1");
    assert!(sub.events.try_recv().is_err());
}

#[tokio::test]
async fn closing_the_handle_leaves_the_channel() {
    let mut server = MockRealtimeServer::start(false).await;
    let socket = socket_for(&server.url);
    let mut sub = socket.subscribe(inbox_spec("u-1")).await.expect("subscribe");
    server.next_event("phx_join").await;

    sub.handle.close();
    let leave = server.next_event("phx_leave").await;
    assert_eq!(leave["topic"], "realtime:unread-messages:u-1");

    let end = timeout(Duration::from_secs(2), sub.events.recv()).await.expect("stream ends in time");
    assert!(end.is_none());
}

#[tokio::test]
async fn dropping_the_handle_also_leaves() {
    let mut server = MockRealtimeServer::start(false).await;
    let socket = socket_for(&server.url);
    let Subscription { events, handle } = socket.subscribe(inbox_spec("u-1")).await.expect("subscribe");
    server.next_event("phx_join").await;

    drop(handle);
    server.next_event("phx_leave").await;
    drop(events);
}

#[tokio::test]
async fn heartbeats_are_sent_on_the_phoenix_topic() {
    let mut server = MockRealtimeServer::start(false).await;
    let socket = socket_for(&server.url).with_heartbeat(Duration::from_millis(50));
    let _sub = socket.subscribe(inbox_spec("u-1")).await.expect("subscribe");

    let beat = server.next_event("heartbeat").await;
    assert_eq!(beat["topic"], "phoenix");
}

#[tokio::test]
async fn rejected_join_is_an_error() {
    let server = MockRealtimeServer::start(true).await;
    let socket = socket_for(&server.url);
    let err = socket.subscribe(inbox_spec("u-1")).await.unwrap_err();
    let BackendError::Realtime(reason) = err else {
        panic!("expected realtime error");
    };
    assert!(reason.contains("unauthorized"));
}

#[tokio::test]
async fn unreachable_socket_is_an_error() {
    let socket = socket_for("ws://127.0.0.1:1/realtime/v1/websocket");
    let err = socket.subscribe(inbox_spec("u-1")).await.unwrap_err();
    assert!(matches!(err, BackendError::Realtime(_)));
}

#[tokio::test]
async fn stalled_handshake_times_out() {
    // Accepts TCP connections but never answers the websocket upgrade.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind silent listener");
    let addr = listener.local_addr().expect("silent listener addr");
    let accepted = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let config = BackendConfig {
        realtime_url: format!("ws://{addr}/realtime/v1/websocket"),
        connect_timeout_secs: 1,
        request_timeout_secs: 1,
        ..BackendConfig::new("http://127.0.0.1:1", "anon-key")
    };
    let socket = RealtimeSocket::new(&config, AccessToken::default());

    let err = timeout(Duration::from_secs(3), socket.subscribe(inbox_spec("u-1")))
        .await
        .expect("subscribe gives up within the connect timeout")
        .unwrap_err();
    let BackendError::Realtime(reason) = err else {
        panic!("expected realtime error");
    };
    assert!(reason.contains("timed out"));
    accepted.abort();
}
