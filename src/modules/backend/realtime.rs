//! Supabase Realtime listener.
//!
//! Realtime speaks the Phoenix channels protocol over a websocket: JSON text
//! frames of `{topic, event, payload, ref}`. A channel is joined with a
//! `postgres_changes` filter, kept alive with heartbeats on the `phoenix`
//! topic, and left with `phx_leave`.

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::{ChannelHandle, ChannelSubscription};
use crate::core::error::{AppError, Result};
use crate::features::posts::models::Post;
use crate::shared::constants::REALTIME_SCHEMA;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);
const EVENT_BUFFER: usize = 64;
const PROTOCOL_VERSION: &str = "1.0.0";

#[derive(Debug, Serialize, Deserialize)]
struct PhoenixMessage {
    topic: String,
    event: String,
    #[serde(default)]
    payload: Value,
    #[serde(rename = "ref", default)]
    msg_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    join_ref: Option<String>,
}

impl PhoenixMessage {
    fn new(topic: &str, event: &str, payload: Value, msg_ref: u64) -> Self {
        Self {
            topic: topic.to_string(),
            event: event.to_string(),
            payload,
            msg_ref: Some(msg_ref.to_string()),
            join_ref: None,
        }
    }

    fn into_frame(self) -> Result<Message> {
        let text = serde_json::to_string(&self)
            .map_err(|e| AppError::Realtime(format!("Failed to encode frame: {}", e)))?;
        Ok(Message::text(text))
    }
}

/// What an incoming frame means for the listener
#[derive(Debug, PartialEq)]
enum ChannelEvent {
    Insert(Post),
    Joined,
    JoinRejected(String),
    ChannelClosed,
    Ignored,
}

/// Websocket endpoint derived from the project URL
pub(super) fn websocket_url(base: &Url, api_key: &str) -> Result<Url> {
    let mut url = base.clone();
    let scheme = if base.scheme() == "https" { "wss" } else { "ws" };
    url.set_scheme(scheme)
        .map_err(|_| AppError::Internal(format!("Cannot derive realtime URL from '{}'", base)))?;
    url.set_path("/realtime/v1/websocket");
    url.query_pairs_mut()
        .clear()
        .append_pair("apikey", api_key)
        .append_pair("vsn", PROTOCOL_VERSION);
    Ok(url)
}

fn channel_topic(channel: &str) -> String {
    format!("realtime:{}", channel)
}

fn join_payload(table: &str) -> Value {
    json!({
        "config": {
            "broadcast": { "self": false },
            "presence": { "key": "" },
            "postgres_changes": [
                { "event": "INSERT", "schema": REALTIME_SCHEMA, "table": table }
            ]
        }
    })
}

fn decode_frame(text: &str, topic: &str) -> ChannelEvent {
    let message: PhoenixMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            debug!("Ignoring undecodable realtime frame: {}", e);
            return ChannelEvent::Ignored;
        }
    };

    if message.topic != topic {
        return ChannelEvent::Ignored;
    }

    match message.event.as_str() {
        "postgres_changes" => {
            let data = &message.payload["data"];
            if data["type"] != "INSERT" {
                return ChannelEvent::Ignored;
            }
            match serde_json::from_value::<Post>(data["record"].clone()) {
                Ok(post) => ChannelEvent::Insert(post),
                Err(e) => {
                    warn!("Discarding inserted record that is not a post: {}", e);
                    ChannelEvent::Ignored
                }
            }
        }
        "phx_reply" if message.msg_ref.as_deref() == Some("1") => {
            if message.payload["status"] == "ok" {
                ChannelEvent::Joined
            } else {
                ChannelEvent::JoinRejected(message.payload["response"].to_string())
            }
        }
        "phx_close" | "phx_error" => ChannelEvent::ChannelClosed,
        _ => ChannelEvent::Ignored,
    }
}

/// Connect, join `channel` for inserts into `table`, and spawn the listener.
pub(super) async fn subscribe_inserts(
    url: &Url,
    channel: &str,
    table: &str,
) -> Result<ChannelSubscription> {
    connect_channel(url, channel, table, HEARTBEAT_INTERVAL).await
}

async fn connect_channel(
    url: &Url,
    channel: &str,
    table: &str,
    heartbeat: Duration,
) -> Result<ChannelSubscription> {
    let (socket, _) = connect_async(url.as_str())
        .await
        .map_err(|e| AppError::Realtime(format!("Failed to connect to realtime: {}", e)))?;
    let (mut sink, stream) = socket.split();

    let topic = channel_topic(channel);
    let mut join = PhoenixMessage::new(&topic, "phx_join", join_payload(table), 1);
    join.join_ref = Some("1".to_string());
    sink.send(join.into_frame()?)
        .await
        .map_err(|e| AppError::Realtime(format!("Failed to join channel '{}': {}", channel, e)))?;

    let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(run_listener(
        sink,
        stream,
        topic,
        channel.to_string(),
        events_tx,
        shutdown_rx,
        heartbeat,
    ));

    Ok(ChannelSubscription {
        handle: ChannelHandle::new(channel, shutdown_tx, task),
        events: events_rx,
    })
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Pump frames until shutdown is requested or the connection ends.
async fn run_listener(
    mut sink: SplitSink<Socket, Message>,
    mut stream: SplitStream<Socket>,
    topic: String,
    channel: String,
    events: mpsc::Sender<Post>,
    mut shutdown: oneshot::Receiver<()>,
    heartbeat_every: Duration,
) -> Result<()> {
    let mut heartbeat = tokio::time::interval(heartbeat_every);
    // The first tick completes immediately
    heartbeat.tick().await;
    let mut next_ref: u64 = 2;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                let leave = PhoenixMessage::new(&topic, "phx_leave", json!({}), next_ref);
                if let Err(e) = sink.send(leave.into_frame()?).await {
                    debug!("Failed to send phx_leave for '{}': {}", channel, e);
                }
                return sink.close().await.map_err(|e| {
                    AppError::Realtime(format!("Failed to close realtime socket: {}", e))
                });
            }
            _ = heartbeat.tick() => {
                let beat = PhoenixMessage::new("phoenix", "heartbeat", json!({}), next_ref);
                next_ref += 1;
                sink.send(beat.into_frame()?)
                    .await
                    .map_err(|e| AppError::Realtime(format!("Heartbeat failed: {}", e)))?;
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => match decode_frame(text.as_str(), &topic) {
                    ChannelEvent::Insert(post) => {
                        if events.send(post).await.is_err() {
                            debug!("Receiver for '{}' dropped; stopping listener", channel);
                            return Ok(());
                        }
                    }
                    ChannelEvent::Joined => info!("Joined realtime channel '{}'", channel),
                    ChannelEvent::JoinRejected(reason) => {
                        return Err(AppError::Realtime(format!(
                            "Channel '{}' rejected the join: {}",
                            channel, reason
                        )));
                    }
                    ChannelEvent::ChannelClosed => {
                        warn!("Realtime channel '{}' closed by server", channel);
                        return Ok(());
                    }
                    ChannelEvent::Ignored => {}
                },
                Some(Ok(Message::Close(_))) | None => {
                    warn!("Realtime connection for '{}' closed", channel);
                    return Ok(());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    return Err(AppError::Realtime(format!(
                        "Realtime connection for '{}' failed: {}",
                        channel, e
                    )));
                }
            },
        }
    }
}
