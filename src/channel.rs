//! Phoenix channel client for live listing topics.
//!
//! Speaks the v2 JSON serializer: every frame is
//! `[join_ref, ref, topic, event, payload]`.

use crate::error::ChannelError;
use crate::types::Envelope;
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;

pub const HEARTBEAT_INTERVAL_MS: u64 = 30_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopicSubscription {
    pub topic: String,
    pub events: Vec<String>,
}

impl TopicSubscription {
    pub fn new(topic: impl Into<String>, events: &[&str]) -> Self {
        Self {
            topic: topic.into(),
            events: events.iter().map(|e| e.to_string()).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ChannelEvent {
    Joined(String),
    Message(Envelope),
    /// Permanent for this topic; only a full reload recovers.
    Disconnected { topic: String, reason: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub join_ref: Option<String>,
    pub msg_ref: Option<String>,
    pub topic: String,
    pub event: String,
    pub payload: Value,
}

impl Frame {
    pub fn join(topic: &str, join_ref: &str) -> Self {
        Self {
            join_ref: Some(join_ref.to_string()),
            msg_ref: Some(join_ref.to_string()),
            topic: topic.to_string(),
            event: "phx_join".to_string(),
            payload: json!({}),
        }
    }

    pub fn heartbeat(msg_ref: &str) -> Self {
        Self {
            join_ref: None,
            msg_ref: Some(msg_ref.to_string()),
            topic: "phoenix".to_string(),
            event: "heartbeat".to_string(),
            payload: json!({}),
        }
    }

    pub fn encode(&self) -> String {
        json!([
            self.join_ref,
            self.msg_ref,
            self.topic,
            self.event,
            self.payload
        ])
        .to_string()
    }

    pub fn decode(text: &str) -> Result<Self, ChannelError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ChannelError::Frame(e.to_string()))?;
        let Value::Array(mut parts) = value else {
            return Err(ChannelError::Frame("frame is not an array".into()));
        };
        if parts.len() != 5 {
            return Err(ChannelError::Frame(format!(
                "expected 5 elements, got {}",
                parts.len()
            )));
        }
        let payload = parts.pop().unwrap_or(Value::Null);
        let text_at = |v: &Value| v.as_str().map(str::to_string);
        let event = text_at(&parts[3]).ok_or_else(|| ChannelError::Frame("missing event".into()))?;
        let topic = text_at(&parts[2]).ok_or_else(|| ChannelError::Frame("missing topic".into()))?;
        Ok(Self {
            join_ref: text_at(&parts[0]),
            msg_ref: text_at(&parts[1]),
            topic,
            event,
            payload,
        })
    }
}

/// Join bookkeeping and frame classification, independent of the socket.
#[derive(Debug, Default)]
pub struct Session {
    next_ref: u64,
    /// join ref → subscription
    joins: HashMap<String, TopicSubscription>,
}

impl Session {
    pub fn new(subscriptions: Vec<TopicSubscription>) -> (Self, Vec<Frame>) {
        let mut session = Session::default();
        let frames = subscriptions
            .into_iter()
            .map(|sub| {
                let join_ref = session.make_ref();
                let frame = Frame::join(&sub.topic, &join_ref);
                session.joins.insert(join_ref, sub);
                frame
            })
            .collect();
        (session, frames)
    }

    pub fn make_ref(&mut self) -> String {
        self.next_ref += 1;
        self.next_ref.to_string()
    }

    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.joins.values().map(|s| s.topic.clone()).collect();
        topics.sort();
        topics.dedup();
        topics
    }

    fn subscription_for(&self, topic: &str) -> Option<&TopicSubscription> {
        self.joins.values().find(|s| s.topic == topic)
    }

    pub fn classify(&self, frame: Frame) -> Option<ChannelEvent> {
        match frame.event.as_str() {
            "phx_reply" => {
                let sub = frame
                    .msg_ref
                    .as_ref()
                    .and_then(|r| self.joins.get(r))?;
                let status = frame.payload.get("status").and_then(Value::as_str);
                if status == Some("ok") {
                    Some(ChannelEvent::Joined(sub.topic.clone()))
                } else {
                    let reason = frame
                        .payload
                        .pointer("/response/reason")
                        .and_then(Value::as_str)
                        .unwrap_or("join refused");
                    Some(ChannelEvent::Disconnected {
                        topic: sub.topic.clone(),
                        reason: ChannelError::JoinRefused {
                            topic: sub.topic.clone(),
                            reason: reason.to_string(),
                        }
                        .to_string(),
                    })
                }
            }
            "phx_error" => self.subscription_for(&frame.topic).map(|s| {
                ChannelEvent::Disconnected {
                    topic: s.topic.clone(),
                    reason: ChannelError::TopicError(s.topic.clone()).to_string(),
                }
            }),
            "phx_close" => self.subscription_for(&frame.topic).map(|s| {
                ChannelEvent::Disconnected {
                    topic: s.topic.clone(),
                    reason: ChannelError::TopicClosed(s.topic.clone()).to_string(),
                }
            }),
            event => {
                let sub = self.subscription_for(&frame.topic)?;
                if sub.events.iter().any(|e| e == event) {
                    Some(ChannelEvent::Message(Envelope {
                        topic: frame.topic,
                        event: frame.event,
                        payload: frame.payload,
                    }))
                } else {
                    log::trace!("ignoring `{event}` on {}", frame.topic);
                    None
                }
            }
        }
    }
}

/// Phoenix socket endpoint for a base `ws(s)://host/socket` URL.
pub fn socket_url(base: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.ends_with("/websocket") {
        format!("{base}?vsn=2.0.0")
    } else {
        format!("{base}/websocket?vsn=2.0.0")
    }
}

/// Connect, join every subscription and forward events until the socket
/// ends. Every topic gets a `Disconnected` event on the way out.
#[cfg(feature = "native")]
pub async fn run_channel(
    ws_url: &str,
    subscriptions: Vec<TopicSubscription>,
    tx: UnboundedSender<ChannelEvent>,
) -> Result<(), ChannelError> {
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::connect_async;
    use tungstenite::protocol::Message;

    let (mut session, joins) = Session::new(subscriptions);
    let url = socket_url(ws_url);

    let ws = match connect_async(url.as_str()).await {
        Ok((ws, _)) => ws,
        Err(e) => {
            let err = ChannelError::from(e);
            disconnect_all(&session, &tx, &err.to_string());
            return Err(err);
        }
    };
    log::info!("🔌 connected to {url}");
    let (mut ws_write, mut ws_read) = ws.split();

    for frame in joins {
        log::debug!("joining {}", frame.topic);
        if let Err(e) = ws_write.send(Message::Text(frame.encode())).await {
            let err = ChannelError::from(e);
            disconnect_all(&session, &tx, &err.to_string());
            return Err(err);
        }
    }

    let mut heartbeat =
        tokio::time::interval(std::time::Duration::from_millis(HEARTBEAT_INTERVAL_MS));
    heartbeat.tick().await;

    let outcome = loop {
        tokio::select! {
            msg = ws_read.next() => {
                let msg = match msg {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => break Err(ChannelError::from(e)),
                    None => break Err(ChannelError::Closed),
                };
                if msg.is_close() {
                    break Err(ChannelError::Closed);
                }
                if !msg.is_text() {
                    continue;
                }
                let text = msg.into_text().unwrap_or_default();
                let frame = match Frame::decode(&text) {
                    Ok(frame) => frame,
                    Err(e) => {
                        log::warn!("⚠️ {e}");
                        continue;
                    }
                };
                if let Some(event) = session.classify(frame) {
                    match &event {
                        ChannelEvent::Joined(topic) => log::info!("✅ joined {topic}"),
                        ChannelEvent::Disconnected { topic, reason } => {
                            log::warn!("❌ {topic} disconnected: {reason}")
                        }
                        ChannelEvent::Message(env) => log::trace!("{} on {}", env.event, env.topic),
                    }
                    if tx.send(event).is_err() {
                        // Nobody is listening any more.
                        break Ok(());
                    }
                }
            }
            _ = heartbeat.tick() => {
                let msg_ref = session.make_ref();
                let frame = Frame::heartbeat(&msg_ref).encode();
                if let Err(e) = ws_write.send(Message::Text(frame)).await {
                    break Err(ChannelError::from(e));
                }
            }
        }
    };

    if let Err(e) = &outcome {
        disconnect_all(&session, &tx, &e.to_string());
    }
    outcome
}

fn disconnect_all(session: &Session, tx: &UnboundedSender<ChannelEvent>, reason: &str) {
    for topic in session.topics() {
        log::warn!("❌ {topic} disconnected: {reason}");
        let _ = tx.send(ChannelEvent::Disconnected {
            topic,
            reason: reason.to_string(),
        });
    }
}
