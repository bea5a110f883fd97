//! Hand-written fakes shared by unit tests.

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};

use crate::binary::Node;
use crate::lookup::{LookupClient, LookupError, LookupResult};
use crate::media::{MediaConverter, MediaError};
use crate::message::{classify, ClassifiedMessage};
use crate::protocol::OutgoingMessage;
use crate::store::Credentials;
use crate::transport::{Connection, Connector, EventSink, TransportError};
use crate::types::{
    ConnectionUpdate, ContextInfo, Event, MediaRef, MessageID, MessageKey, RawContent, RawMessage,
    JID,
};

pub(crate) fn own_jid() -> JID {
    JID::new("15550001111", "s.whatsapp.net")
}

pub(crate) fn chat_jid() -> JID {
    JID::new("12025550123", "s.whatsapp.net")
}

pub(crate) fn open_event() -> Event {
    let mut me = own_jid();
    me.device = 3;
    Event::Connection(ConnectionUpdate::Open { me: Some(me) })
}

pub(crate) fn text_content(body: &str) -> RawContent {
    RawContent {
        content_type: Some("conversation".into()),
        text: Some(body.into()),
        ..Default::default()
    }
}

pub(crate) fn media_content(tag: &str, mimetype: &str) -> RawContent {
    RawContent {
        content_type: Some(tag.into()),
        media: Some(MediaRef {
            direct_path: Some(format!("/v/t62.7118-24/{tag}.enc")),
            media_key: Some("bWVkaWEta2V5".into()),
            mimetype: Some(mimetype.into()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub(crate) fn quoting(mut content: RawContent, quoted: RawContent) -> RawContent {
    content.context_info = Some(ContextInfo {
        stanza_id: Some("3EB0QUOTED".into()),
        participant: Some(chat_jid()),
        quoted_message: Some(Box::new(quoted)),
    });
    content
}

pub(crate) fn raw_message(from_me: bool, content: Option<RawContent>) -> RawMessage {
    RawMessage {
        key: MessageKey {
            remote_jid: chat_jid(),
            from_me,
            id: "3EB0COMMAND".into(),
            participant: None,
        },
        push_name: Some("Tester".into()),
        message_timestamp: None,
        message: content,
    }
}

pub(crate) fn classified(
    connection: &Arc<FakeConnection>,
    from_me: bool,
    content: RawContent,
) -> ClassifiedMessage {
    let connection: Arc<dyn Connection> = Arc::clone(connection) as Arc<dyn Connection>;
    classify(raw_message(from_me, Some(content)), connection)
}

pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn lock<T: Clone>(m: &Mutex<T>) -> T {
    m.lock().unwrap().clone()
}

/// Connection that records everything and serves canned media.
pub(crate) struct FakeConnection {
    me: Option<JID>,
    media: Option<Vec<u8>>,
    query_response: Option<Node>,
    sent: Mutex<Vec<OutgoingMessage>>,
    queries: Mutex<Vec<Node>>,
    downloaded_types: Mutex<Vec<String>>,
    downloads: AtomicUsize,
    logouts: AtomicUsize,
    closes: AtomicUsize,
    closed: AtomicBool,
}

impl FakeConnection {
    pub(crate) fn new() -> Self {
        let mut me = own_jid();
        me.device = 3;
        Self {
            me: Some(me),
            media: None,
            query_response: None,
            sent: Mutex::default(),
            queries: Mutex::default(),
            downloaded_types: Mutex::default(),
            downloads: AtomicUsize::new(0),
            logouts: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn with_media(mut self, bytes: Vec<u8>) -> Self {
        self.media = Some(bytes);
        self
    }

    pub(crate) fn without_identity(mut self) -> Self {
        self.me = None;
        self
    }

    pub(crate) fn with_query_response(mut self, node: Node) -> Self {
        self.query_response = Some(node);
        self
    }

    pub(crate) fn sent(&self) -> Vec<OutgoingMessage> {
        lock(&self.sent)
    }

    pub(crate) fn queries(&self) -> Vec<Node> {
        lock(&self.queries)
    }

    pub(crate) fn downloaded_types(&self) -> Vec<String> {
        lock(&self.downloaded_types)
    }

    pub(crate) fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    pub(crate) fn logout_count(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }

    pub(crate) fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connection for FakeConnection {
    fn own_jid(&self) -> Option<JID> {
        self.me.clone()
    }

    async fn send_message(&self, message: OutgoingMessage) -> Result<MessageID, TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        let id = message.id.clone();
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message);
        }
        Ok(id)
    }

    async fn query(&self, node: Node) -> Result<Node, TransportError> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(node);
        }
        Ok(self
            .query_response
            .clone()
            .unwrap_or_else(|| Node::new("iq").with_attr("type", "result")))
    }

    async fn download_media(
        &self,
        content_type: &str,
        _media: &MediaRef,
    ) -> Result<Vec<u8>, TransportError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut types) = self.downloaded_types.lock() {
            types.push(content_type.to_string());
        }
        self.media
            .clone()
            .ok_or_else(|| TransportError::RequestFailed("media expired".into()))
    }

    async fn logout(&self) -> Result<(), TransportError> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Connector replaying one scripted event list per connection.
///
/// Each script is pushed into the sink at connect time and the sink is then
/// dropped, so a script without a close ends as a lost connection.
pub(crate) struct ScriptedConnector {
    scripts: Mutex<VecDeque<Vec<Event>>>,
    failures_left: AtomicUsize,
    connects: AtomicUsize,
    connections: Mutex<Vec<Arc<FakeConnection>>>,
    credentials: Mutex<Vec<Credentials>>,
}

impl ScriptedConnector {
    pub(crate) fn new(scripts: Vec<Vec<Event>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            failures_left: AtomicUsize::new(0),
            connects: AtomicUsize::new(0),
            connections: Mutex::default(),
            credentials: Mutex::default(),
        }
    }

    /// Make the first `n` attempts fail before any script is used.
    pub(crate) fn failing_first(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    pub(crate) fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn connections(&self) -> Vec<Arc<FakeConnection>> {
        lock(&self.connections)
    }

    /// Credentials passed to each successful connect.
    pub(crate) fn credentials_seen(&self) -> Vec<Credentials> {
        lock(&self.credentials)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(
        &self,
        credentials: Credentials,
        events: EventSink,
    ) -> Result<Arc<dyn Connection>, TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(TransportError::ConnectionFailed("gateway unreachable".into()));
        }

        let script = self
            .scripts
            .lock()
            .ok()
            .and_then(|mut scripts| scripts.pop_front())
            .unwrap_or_default();
        for event in script {
            let _ = events.send(event);
        }

        let connection = Arc::new(FakeConnection::new());
        if let Ok(mut connections) = self.connections.lock() {
            connections.push(Arc::clone(&connection));
        }
        if let Ok(mut seen) = self.credentials.lock() {
            seen.push(credentials);
        }
        Ok(connection as Arc<dyn Connection>)
    }
}

/// Converter returning a fixed payload and recording its inputs.
#[derive(Default)]
pub(crate) struct FakeConverter {
    images: Mutex<Vec<(Vec<u8>, String)>>,
    videos: AtomicUsize,
}

impl FakeConverter {
    pub(crate) const OUTPUT: &'static [u8] = b"RIFF\0\0\0\0WEBPVP8L";

    pub(crate) fn image_calls(&self) -> Vec<(Vec<u8>, String)> {
        lock(&self.images)
    }

    pub(crate) fn video_calls(&self) -> usize {
        self.videos.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaConverter for FakeConverter {
    async fn image_to_sticker(&self, bytes: Vec<u8>, ext: &str) -> Result<Vec<u8>, MediaError> {
        if let Ok(mut images) = self.images.lock() {
            images.push((bytes, ext.to_string()));
        }
        Ok(Self::OUTPUT.to_vec())
    }

    async fn video_to_sticker(&self, _bytes: Vec<u8>) -> Result<Vec<u8>, MediaError> {
        self.videos.fetch_add(1, Ordering::SeqCst);
        Ok(Self::OUTPUT.to_vec())
    }
}

/// Lookup client with canned results.
pub(crate) struct FakeLookup {
    results: Option<Vec<LookupResult>>,
    queries: Mutex<Vec<String>>,
}

impl FakeLookup {
    pub(crate) fn empty() -> Self {
        Self {
            results: None,
            queries: Mutex::default(),
        }
    }

    pub(crate) fn with_results(results: Vec<LookupResult>) -> Self {
        Self {
            results: Some(results),
            queries: Mutex::default(),
        }
    }

    pub(crate) fn queries(&self) -> Vec<String> {
        lock(&self.queries)
    }
}

#[async_trait]
impl LookupClient for FakeLookup {
    async fn search(&self, query: &str) -> Result<Option<Vec<LookupResult>>, LookupError> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }
        Ok(self.results.clone())
    }
}
