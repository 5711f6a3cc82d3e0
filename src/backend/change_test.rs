use super::*;

fn inbox_channel(user_id: &str) -> ChannelSpec {
    ChannelSpec::new(format!("unread-messages:{user_id}"))
        .listen(ChangeListener::new(ChangeKind::Insert, "messages").where_eq("receiver_id", user_id))
        .listen(ChangeListener::new(ChangeKind::Update, "messages").where_eq("receiver_id", user_id))
}

fn change(kind: ChangeKind, receiver: &str) -> ChangeEvent {
    ChangeEvent {
        kind,
        schema: "public".into(),
        table: "messages".into(),
        record: json!({"id": 1, "receiver_id": receiver, "is_read": false}),
        old_record: Value::Null,
        commit_timestamp: None,
    }
}

#[test]
fn join_carries_postgres_changes_config() {
    let msg = PhoenixMessage::join(&inbox_channel("u-1"), Some("jwt"), "1");
    assert_eq!(msg.topic, "realtime:unread-messages:u-1");
    assert_eq!(msg.event, "phx_join");
    assert_eq!(msg.reference.as_deref(), Some("1"));
    assert_eq!(msg.payload["access_token"], "jwt");
    let listeners = msg.payload["config"]["postgres_changes"].as_array().expect("listeners");
    assert_eq!(listeners.len(), 2);
    assert_eq!(
        listeners[0],
        json!({"event": "INSERT", "schema": "public", "table": "messages", "filter": "receiver_id=eq.u-1"})
    );
    assert_eq!(listeners[1]["event"], "UPDATE");
}

#[test]
fn join_without_token_omits_access_token() {
    let msg = PhoenixMessage::join(&inbox_channel("u-1"), None, "1");
    assert!(msg.payload.get("access_token").is_none());
}

#[test]
fn heartbeat_and_leave_envelopes() {
    let hb = serde_json::to_value(PhoenixMessage::heartbeat("7")).expect("encode");
    assert_eq!(hb, json!({"topic": "phoenix", "event": "heartbeat", "payload": {}, "ref": "7"}));

    let leave = PhoenixMessage::leave("realtime:x", "8");
    assert_eq!(leave.event, "phx_leave");
    assert_eq!(leave.topic, "realtime:x");
}

#[test]
fn listener_matches_kind_table_and_filter() {
    let spec = inbox_channel("u-1");
    assert!(spec.matches(&change(ChangeKind::Insert, "u-1")));
    assert!(spec.matches(&change(ChangeKind::Update, "u-1")));
    assert!(!spec.matches(&change(ChangeKind::Insert, "u-2")));
    assert!(!spec.matches(&change(ChangeKind::Delete, "u-1")));
}

#[test]
fn listener_compares_numeric_columns_as_text() {
    let listener = ChangeListener::new(ChangeKind::Insert, "messages").where_eq("receiver_id", "42");
    let mut event = change(ChangeKind::Insert, "ignored");
    event.record = json!({"receiver_id": 42});
    assert!(listener.matches(&event));
}

#[test]
fn classify_decodes_postgres_changes() {
    let raw = json!({
        "topic": "realtime:unread-messages:u-1",
        "event": "postgres_changes",
        "payload": {
            "data": {
                "type": "INSERT",
                "schema": "public",
                "table": "messages",
                "commit_timestamp": "2024-05-01T10:00:00Z",
                "record": {"id": 9, "receiver_id": "u-1"},
                "old_record": null
            },
            "ids": [3]
        },
        "ref": null
    });
    let msg: PhoenixMessage = serde_json::from_value(raw).expect("decode");
    let Incoming::Change(event) = classify(&msg, "realtime:unread-messages:u-1", "1") else {
        panic!("expected change");
    };
    assert_eq!(event.kind, ChangeKind::Insert);
    assert_eq!(event.record["id"], 9);
}

#[test]
fn classify_join_replies_by_ref() {
    let ok = PhoenixMessage {
        topic: "realtime:c".into(),
        event: "phx_reply".into(),
        payload: json!({"status": "ok", "response": {}}),
        reference: Some("1".into()),
        join_ref: None,
    };
    assert_eq!(classify(&ok, "realtime:c", "1"), Incoming::JoinOk);
    assert_eq!(classify(&ok, "realtime:c", "2"), Incoming::Ignored);

    let rejected = PhoenixMessage {
        payload: json!({"status": "error", "response": {"reason": "unauthorized"}}),
        ..ok
    };
    assert_eq!(classify(&rejected, "realtime:c", "1"), Incoming::JoinRejected("unauthorized".into()));
}

#[test]
fn classify_ignores_other_topics_and_flags_closure() {
    let other = PhoenixMessage::leave("realtime:other", "1");
    assert_eq!(classify(&other, "realtime:c", "1"), Incoming::Ignored);

    let closed = PhoenixMessage {
        topic: "realtime:c".into(),
        event: "phx_close".into(),
        payload: json!({}),
        reference: None,
        join_ref: None,
    };
    assert!(matches!(classify(&closed, "realtime:c", "1"), Incoming::ChannelClosed(_)));

    let hb_reply = PhoenixMessage {
        topic: "phoenix".into(),
        event: "phx_reply".into(),
        payload: json!({"status": "ok"}),
        reference: Some("5".into()),
        join_ref: None,
    };
    assert_eq!(classify(&hb_reply, "realtime:c", "1"), Incoming::HeartbeatOk);
}
