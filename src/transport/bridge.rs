//! WebSocket bridge to an external protocol gateway.
//!
//! The gateway owns the WhatsApp wire protocol and session cryptography.
//! This side exchanges JSON text frames with it: requests carry an `id`
//! and a `method`, the gateway answers with `response` frames and pushes
//! `connection.update`, `creds.update` and `messages.upsert` events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::{SinkExt, Stream, StreamExt};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite, tungstenite::Message};

use crate::binary::Node;
use crate::protocol::{get_iq_error, OutgoingMessage, RequestTracker};
use crate::store::Credentials;
use crate::transport::{Connection, Connector, EventSink, TransportError};
use crate::types::{
    ConnectionUpdate, DisconnectReason, Event, MediaRef, MessageID, MessagesUpsert, RawMessage,
    UpsertKind, JID,
};

/// Status reported when the gateway closes without an error code.
const DEFAULT_CLOSE_STATUS: u16 = 500;

type Reply = Result<Value, String>;

/// Opens bridge connections to a gateway endpoint.
#[derive(Debug, Clone)]
pub struct BridgeConnector {
    endpoint: String,
    session_name: String,
}

impl BridgeConnector {
    pub fn new(endpoint: impl Into<String>, session_name: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            session_name: session_name.into(),
        }
    }
}

#[async_trait]
impl Connector for BridgeConnector {
    async fn connect(
        &self,
        credentials: Credentials,
        events: EventSink,
    ) -> Result<Arc<dyn Connection>, TransportError> {
        let (ws, _response) = connect_async(self.endpoint.as_str())
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        debug!("bridge socket open to {}", self.endpoint);

        let (mut sink, stream) = ws.split();
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();
        let shared = Arc::new(Shared::default());

        let writer = tokio::spawn(async move {
            while let Some(frame) = outgoing_rx.recv().await {
                let closing = matches!(frame, Message::Close(_));
                if let Err(e) = sink.send(frame).await {
                    warn!("bridge write failed: {e}");
                    break;
                }
                if closing {
                    break;
                }
            }
        });
        let reader = tokio::spawn(read_loop(stream, Arc::clone(&shared), events));

        let connection = BridgeConnection {
            outgoing,
            shared,
            tasks: Mutex::new(vec![writer, reader]),
        };
        connection.push(
            "auth",
            json!({ "session": self.session_name, "creds": credentials }),
        )?;
        Ok(Arc::new(connection))
    }
}

#[derive(Default)]
struct Shared {
    tracker: RequestTracker<Reply>,
    me: RwLock<Option<JID>>,
    closed: AtomicBool,
}

/// A connection to the gateway. Dropping it stops its socket tasks.
pub struct BridgeConnection {
    outgoing: mpsc::UnboundedSender<Message>,
    shared: Arc<Shared>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl BridgeConnection {
    /// Queue a request frame without waiting for its response.
    fn push(&self, method: &str, params: Value) -> Result<String, TransportError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        let id = self.shared.tracker.next_id();
        let frame = json!({ "id": id, "method": method, "params": params });
        self.outgoing
            .send(Message::Text(frame.to_string()))
            .map_err(|_| TransportError::Closed)?;
        Ok(id)
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        let id = self.shared.tracker.next_id();
        let reply = self.shared.tracker.register(&id);
        let frame = json!({ "id": id, "method": method, "params": params });
        if self.outgoing.send(Message::Text(frame.to_string())).is_err() {
            self.shared.tracker.complete(&id, Err("socket closed".into()));
            return Err(TransportError::Closed);
        }

        match reply.await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(message)) => Err(TransportError::RequestFailed(message)),
            Err(_) => Err(TransportError::Closed),
        }
    }

    fn abort_tasks(&self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }
}

impl Drop for BridgeConnection {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

#[async_trait]
impl Connection for BridgeConnection {
    fn own_jid(&self) -> Option<JID> {
        self.shared.me.read().ok().and_then(|me| me.clone())
    }

    async fn send_message(&self, message: OutgoingMessage) -> Result<MessageID, TransportError> {
        let fallback_id = message.id.clone();
        let result = self.request("sendMessage", message.to_params()).await?;
        Ok(result
            .get("id")
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or(fallback_id))
    }

    async fn query(&self, node: Node) -> Result<Node, TransportError> {
        let result = self.request("query", node.to_json()).await?;
        let response =
            Node::from_json(&result).map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
        match get_iq_error(&response) {
            Some(error) => Err(TransportError::RequestFailed(error)),
            None => Ok(response),
        }
    }

    async fn download_media(
        &self,
        content_type: &str,
        media: &MediaRef,
    ) -> Result<Vec<u8>, TransportError> {
        let result = self
            .request("downloadMedia", json!({ "type": content_type, "media": media }))
            .await?;
        let encoded = result
            .as_str()
            .ok_or_else(|| TransportError::InvalidResponse("media is not a string".into()))?;
        STANDARD
            .decode(encoded)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }

    async fn logout(&self) -> Result<(), TransportError> {
        self.request("logout", json!({})).await.map(|_| ())
    }

    async fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        // The writer stops after flushing the close frame.
        let _ = self.outgoing.send(Message::Close(None));
        self.shared.tracker.fail_all();
        if let Ok(mut tasks) = self.tasks.lock() {
            // Reader is the second task; the writer drains on its own.
            if let Some(reader) = tasks.pop() {
                reader.abort();
            }
        }
    }
}

async fn read_loop<S>(mut stream: S, shared: Arc<Shared>, events: EventSink)
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    let mut reported_close = false;
    let cause = loop {
        let frame = match stream.next().await {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(frame))) => break format!("gateway closed the socket: {frame:?}"),
            Some(Ok(_)) => continue,
            Some(Err(e)) => break e.to_string(),
            None => break "socket stream ended".to_string(),
        };

        match decode_frame(&frame) {
            Ok(Decoded::Response { id, reply }) => {
                if !shared.tracker.complete(&id, reply) {
                    debug!("response for unknown request {id}");
                }
            }
            Ok(Decoded::Events(decoded)) => {
                for event in decoded {
                    match &event {
                        Event::Connection(ConnectionUpdate::Open { me: Some(me) }) => {
                            if let Ok(mut slot) = shared.me.write() {
                                *slot = Some(me.clone());
                            }
                        }
                        Event::Connection(ConnectionUpdate::Closed { .. }) => {
                            reported_close = true;
                        }
                        _ => {}
                    }
                    if events.send(event).is_err() {
                        debug!("event receiver dropped; stopping bridge reader");
                        shared.tracker.fail_all();
                        return;
                    }
                }
            }
            Err(e) => warn!("dropping malformed bridge frame: {e}"),
        }
    };

    shared.closed.store(true, Ordering::Release);
    shared.tracker.fail_all();
    info!("bridge reader stopped: {cause}");
    if !reported_close {
        let _ = events.send(Event::Connection(ConnectionUpdate::Closed {
            reason: DisconnectReason::ConnectionLost,
            cause,
        }));
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event")]
enum InboundFrame {
    #[serde(rename = "connection.update", rename_all = "camelCase")]
    ConnectionUpdate {
        #[serde(default)]
        connection: Option<String>,
        #[serde(default)]
        me: Option<JID>,
        #[serde(default)]
        status_code: Option<u16>,
        #[serde(default)]
        reason: Option<String>,
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        qr: Option<String>,
    },
    #[serde(rename = "creds.update")]
    CredsUpdate { creds: Credentials },
    #[serde(rename = "messages.upsert")]
    MessagesUpsert {
        #[serde(rename = "type")]
        kind: UpsertKind,
        #[serde(default)]
        messages: Vec<Value>,
    },
    #[serde(rename = "response")]
    Response {
        id: String,
        #[serde(default)]
        ok: bool,
        #[serde(default)]
        result: Value,
        #[serde(default)]
        error: Option<String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug)]
enum Decoded {
    Events(Vec<Event>),
    Response { id: String, reply: Reply },
}

fn decode_frame(text: &str) -> Result<Decoded, serde_json::Error> {
    let frame: InboundFrame = serde_json::from_str(text)?;
    Ok(match frame {
        InboundFrame::ConnectionUpdate {
            connection,
            me,
            status_code,
            reason,
            error,
            qr,
        } => {
            let mut events = Vec::new();
            if let Some(code) = qr {
                events.push(Event::Connection(ConnectionUpdate::Qr(code)));
            }
            match connection.as_deref() {
                Some("connecting") => events.push(Event::Connection(ConnectionUpdate::Connecting)),
                Some("open") => events.push(Event::Connection(ConnectionUpdate::Open { me })),
                Some("close") => {
                    let reason = reason
                        .as_deref()
                        .and_then(DisconnectReason::from_name)
                        .unwrap_or_else(|| {
                            DisconnectReason::from_status_code(
                                status_code.unwrap_or(DEFAULT_CLOSE_STATUS),
                            )
                        });
                    events.push(Event::Connection(ConnectionUpdate::Closed {
                        reason,
                        cause: error.unwrap_or_default(),
                    }));
                }
                Some(other) => debug!("ignoring connection state {other:?}"),
                None => {}
            }
            Decoded::Events(events)
        }
        InboundFrame::CredsUpdate { creds } => Decoded::Events(vec![Event::CredsUpdate(creds)]),
        InboundFrame::MessagesUpsert { kind, messages } => {
            let messages = messages
                .into_iter()
                .filter_map(|raw| match serde_json::from_value::<RawMessage>(raw) {
                    Ok(message) => Some(message),
                    Err(e) => {
                        warn!("skipping undecodable message: {e}");
                        None
                    }
                })
                .collect();
            Decoded::Events(vec![Event::Messages(MessagesUpsert { kind, messages })])
        }
        InboundFrame::Response {
            id,
            ok,
            result,
            error,
        } => {
            let reply = if ok {
                Ok(result)
            } else {
                Err(error.unwrap_or_else(|| "gateway reported failure".into()))
            };
            Decoded::Response { id, reply }
        }
        InboundFrame::Other => Decoded::Events(Vec::new()),
    })
}
