//! Realtime change-subscription vocabulary and its Phoenix-channel wire form.
//!
//! DESIGN
//! ======
//! The hosted realtime service speaks Phoenix channels over a websocket: JSON
//! envelopes `{topic, event, payload, ref}`. A channel join carries the list
//! of `postgres_changes` listeners; change notifications arrive as
//! `postgres_changes` events. Building and classifying envelopes is pure so
//! the socket task stays a thin loop.

#[cfg(test)]
#[path = "change_test.rs"]
mod change_test;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::query::Filter;

pub const PHOENIX_TOPIC: &str = "phoenix";
pub const EVENT_JOIN: &str = "phx_join";
pub const EVENT_LEAVE: &str = "phx_leave";
pub const EVENT_REPLY: &str = "phx_reply";
pub const EVENT_ERROR: &str = "phx_error";
pub const EVENT_CLOSE: &str = "phx_close";
pub const EVENT_HEARTBEAT: &str = "heartbeat";
pub const EVENT_POSTGRES_CHANGES: &str = "postgres_changes";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

/// One `postgres_changes` listener: an event kind on one table, optionally
/// restricted by an exact match on one column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeListener {
    pub kind: ChangeKind,
    pub schema: String,
    pub table: String,
    pub filter: Option<(String, String)>,
}

impl ChangeListener {
    pub fn new(kind: ChangeKind, table: impl Into<String>) -> Self {
        Self { kind, schema: "public".to_owned(), table: table.into(), filter: None }
    }

    #[must_use]
    pub fn where_eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter = Some((column.into(), value.into()));
        self
    }

    fn to_config(&self) -> Value {
        let mut config = json!({
            "event": self.kind.as_str(),
            "schema": self.schema,
            "table": self.table,
        });
        if let Some((column, value)) = &self.filter {
            let (_, expr) = Filter::eq(column.as_str(), value).to_pair();
            config["filter"] = Value::String(format!("{column}={expr}"));
        }
        config
    }

    #[must_use]
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if self.kind != event.kind || self.table != event.table || self.schema != event.schema {
            return false;
        }
        let Some((column, expected)) = &self.filter else {
            return true;
        };
        let row = if event.kind == ChangeKind::Delete { &event.old_record } else { &event.record };
        match row.get(column) {
            Some(Value::String(s)) => s == expected,
            Some(Value::Null) | None => false,
            Some(other) => other.to_string() == *expected,
        }
    }
}

/// A named channel and the listeners joined on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelSpec {
    pub name: String,
    pub listeners: Vec<ChangeListener>,
}

impl ChannelSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), listeners: Vec::new() }
    }

    #[must_use]
    pub fn listen(mut self, listener: ChangeListener) -> Self {
        self.listeners.push(listener);
        self
    }

    #[must_use]
    pub fn topic(&self) -> String {
        format!("realtime:{}", self.name)
    }

    #[must_use]
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        self.listeners.iter().any(|l| l.matches(event))
    }
}

/// A row change pushed by the realtime service.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub schema: String,
    pub table: String,
    #[serde(default)]
    pub record: Value,
    #[serde(default)]
    pub old_record: Value,
    #[serde(default)]
    pub commit_timestamp: Option<String>,
}

/// Phoenix channel envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_ref: Option<String>,
}

impl PhoenixMessage {
    #[must_use]
    pub fn join(spec: &ChannelSpec, access_token: Option<&str>, reference: &str) -> Self {
        let listeners = spec.listeners.iter().map(ChangeListener::to_config).collect::<Vec<_>>();
        let mut payload = json!({
            "config": {
                "broadcast": { "ack": false, "self": false },
                "presence": { "key": "" },
                "postgres_changes": listeners,
                "private": false,
            }
        });
        if let Some(token) = access_token {
            payload["access_token"] = Value::String(token.to_owned());
        }
        Self {
            topic: spec.topic(),
            event: EVENT_JOIN.to_owned(),
            payload,
            reference: Some(reference.to_owned()),
            join_ref: Some(reference.to_owned()),
        }
    }

    #[must_use]
    pub fn leave(topic: &str, reference: &str) -> Self {
        Self {
            topic: topic.to_owned(),
            event: EVENT_LEAVE.to_owned(),
            payload: json!({}),
            reference: Some(reference.to_owned()),
            join_ref: None,
        }
    }

    #[must_use]
    pub fn heartbeat(reference: &str) -> Self {
        Self {
            topic: PHOENIX_TOPIC.to_owned(),
            event: EVENT_HEARTBEAT.to_owned(),
            payload: json!({}),
            reference: Some(reference.to_owned()),
            join_ref: None,
        }
    }
}

/// What an incoming envelope means to a channel owner.
#[derive(Clone, Debug, PartialEq)]
pub enum Incoming {
    Change(ChangeEvent),
    JoinOk,
    JoinRejected(String),
    HeartbeatOk,
    /// The server closed or errored the channel.
    ChannelClosed(String),
    Ignored,
}

/// Classify an envelope received on the socket for `topic`.
#[must_use]
pub fn classify(message: &PhoenixMessage, topic: &str, join_ref: &str) -> Incoming {
    if message.topic == PHOENIX_TOPIC {
        return if message.event == EVENT_REPLY { Incoming::HeartbeatOk } else { Incoming::Ignored };
    }
    if message.topic != topic {
        return Incoming::Ignored;
    }
    match message.event.as_str() {
        EVENT_POSTGRES_CHANGES => match serde_json::from_value::<ChangeEvent>(message.payload["data"].clone()) {
            Ok(event) => Incoming::Change(event),
            Err(e) => {
                tracing::warn!(error = %e, "undecodable postgres_changes payload");
                Incoming::Ignored
            }
        },
        EVENT_REPLY if message.reference.as_deref() == Some(join_ref) => {
            if message.payload["status"] == "ok" {
                Incoming::JoinOk
            } else {
                let reason = message.payload["response"]["reason"].as_str().unwrap_or("join rejected").to_owned();
                Incoming::JoinRejected(reason)
            }
        }
        EVENT_ERROR => Incoming::ChannelClosed("channel error".to_owned()),
        EVENT_CLOSE => Incoming::ChannelClosed("channel closed by server".to_owned()),
        _ => Incoming::Ignored,
    }
}
