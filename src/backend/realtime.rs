//! Realtime change subscriptions over a Phoenix-channel websocket.
//!
//! ARCHITECTURE
//! ============
//! Each subscription owns one socket and one task. `subscribe` connects,
//! joins the channel and waits for the join reply before returning, so a
//! caller that gets a [`Subscription`] knows the listeners are live. The task
//! then multiplexes three sources:
//!
//! - the close signal from the [`SubscriptionHandle`] (leave, close socket, exit)
//! - the heartbeat interval (keeps the server from reaping the socket)
//! - inbound frames (matching `postgres_changes` are forwarded)
//!
//! ERROR HANDLING
//! ==============
//! Failures before the join reply are returned to the caller. The websocket
//! handshake is bounded by the connect timeout and the join reply by the
//! request timeout. Failures after the join are logged and end the event
//! stream; the receiver then sees `None`.

#[cfg(test)]
#[path = "realtime_test.rs"]
mod realtime_test;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::change::{ChangeEvent, ChannelSpec, Incoming, PhoenixMessage, classify};
use super::{AccessToken, RealtimeClient, Subscription, SubscriptionHandle};
use crate::config::BackendConfig;
use crate::error::BackendError;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const PROTOCOL_VSN: &str = "1.0.0";
const JOIN_REF: &str = "1";

pub struct RealtimeSocket {
    url: String,
    anon_key: String,
    token: AccessToken,
    heartbeat: Duration,
    connect_timeout: Duration,
    join_timeout: Duration,
}

impl RealtimeSocket {
    #[must_use]
    pub fn new(config: &BackendConfig, token: AccessToken) -> Self {
        Self {
            url: config.realtime_url.clone(),
            anon_key: config.anon_key.clone(),
            token,
            heartbeat: Duration::from_secs(config.heartbeat_secs.max(1)),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs.max(1)),
            join_timeout: Duration::from_secs(config.request_timeout_secs.max(1)),
        }
    }

    #[must_use]
    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    fn endpoint(&self) -> Result<String, BackendError> {
        let url = reqwest::Url::parse_with_params(&self.url, &[("apikey", self.anon_key.as_str()), ("vsn", PROTOCOL_VSN)])
            .map_err(|e| BackendError::Config(format!("realtime url {}: {e}", self.url)))?;
        Ok(url.into())
    }
}

#[async_trait::async_trait]
impl RealtimeClient for RealtimeSocket {
    async fn subscribe(&self, spec: ChannelSpec) -> Result<Subscription, BackendError> {
        let (mut socket, _) = tokio::time::timeout(self.connect_timeout, connect_async(self.endpoint()?))
            .await
            .map_err(|_| BackendError::Realtime(format!("connect timed out after {:?}", self.connect_timeout)))?
            .map_err(realtime_error)?;
        let topic = spec.topic();

        let join = PhoenixMessage::join(&spec, self.token.get().as_deref(), JOIN_REF);
        send(&mut socket, &join).await?;
        tokio::time::timeout(self.join_timeout, wait_for_join(&mut socket, &topic))
            .await
            .map_err(|_| BackendError::Realtime(format!("join {topic} timed out")))??;
        tracing::debug!(%topic, "realtime channel joined");

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = oneshot::channel();
        let handle = SubscriptionHandle::new(spec.name.clone(), close_tx);
        tokio::spawn(run_channel(socket, spec, events_tx, close_rx, self.heartbeat));

        Ok(Subscription { events: events_rx, handle })
    }
}

fn realtime_error(e: tokio_tungstenite::tungstenite::Error) -> BackendError {
    BackendError::Realtime(e.to_string())
}

async fn send(socket: &mut Socket, message: &PhoenixMessage) -> Result<(), BackendError> {
    let text = serde_json::to_string(message)?;
    socket.send(Message::text(text)).await.map_err(realtime_error)
}

async fn wait_for_join(socket: &mut Socket, topic: &str) -> Result<(), BackendError> {
    loop {
        let Some(message) = socket.next().await else {
            return Err(BackendError::Realtime("socket closed before join reply".to_owned()));
        };
        match message.map_err(realtime_error)? {
            Message::Text(text) => {
                let Ok(envelope) = serde_json::from_str::<PhoenixMessage>(text.as_str()) else {
                    continue;
                };
                match classify(&envelope, topic, JOIN_REF) {
                    Incoming::JoinOk => return Ok(()),
                    Incoming::JoinRejected(reason) | Incoming::ChannelClosed(reason) => {
                        return Err(BackendError::Realtime(format!("join {topic} rejected: {reason}")));
                    }
                    _ => {}
                }
            }
            Message::Close(_) => return Err(BackendError::Realtime("socket closed before join reply".to_owned())),
            _ => {}
        }
    }
}

async fn run_channel(
    mut socket: Socket,
    spec: ChannelSpec,
    events: mpsc::UnboundedSender<ChangeEvent>,
    mut close_rx: oneshot::Receiver<()>,
    heartbeat: Duration,
) {
    let topic = spec.topic();
    let mut next_ref: u64 = 2;
    let mut ticker = tokio::time::interval(heartbeat);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = &mut close_rx => {
                let leave = PhoenixMessage::leave(&topic, &next_ref.to_string());
                if let Err(e) = send(&mut socket, &leave).await {
                    tracing::debug!(%topic, error = %e, "leave not delivered");
                }
                let _ = socket.close(None).await;
                tracing::debug!(%topic, "realtime channel left");
                break;
            }
            _ = ticker.tick() => {
                let beat = PhoenixMessage::heartbeat(&next_ref.to_string());
                next_ref += 1;
                if let Err(e) = send(&mut socket, &beat).await {
                    tracing::warn!(%topic, error = %e, "heartbeat failed; ending subscription");
                    break;
                }
            }
            message = socket.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    let Ok(envelope) = serde_json::from_str::<PhoenixMessage>(text.as_str()) else {
                        tracing::debug!(%topic, "ignoring non-envelope frame");
                        continue;
                    };
                    match classify(&envelope, &topic, JOIN_REF) {
                        Incoming::Change(event) if spec.matches(&event) => {
                            if events.send(event).is_err() {
                                // Receiver dropped without closing the handle.
                                let _ = socket.close(None).await;
                                break;
                            }
                        }
                        Incoming::ChannelClosed(reason) => {
                            tracing::warn!(%topic, %reason, "realtime channel closed by server");
                            break;
                        }
                        _ => {}
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::warn!(%topic, "realtime socket closed");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(%topic, error = %e, "realtime socket error");
                    break;
                }
            }
        }
    }
}
