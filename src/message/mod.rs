//! Inbound message classification.
//!
//! [`classify`] turns one raw transport message into an immutable
//! [`ClassifiedMessage`]: content kind and type predicates, body text, the
//! self flag used to gate commands, the recursively classified quoted
//! message, and a cached media download.

mod content;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::transport::{Connection, TransportError};
use crate::types::{MediaRef, MessageKey, RawContent, RawMessage, JID};

pub use content::ContentKind;

/// Media download errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownloadError {
    #[error("media download failed: {0}")]
    Transport(#[from] TransportError),
}

/// Structured view of one inbound message.
pub struct ClassifiedMessage {
    pub key: MessageKey,
    pub chat: JID,
    pub sender: JID,
    pub push_name: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    /// Text, or caption for media; empty when neither applies.
    pub body: String,
    /// Sent by the controlling account.
    pub is_self: bool,
    pub kind: ContentKind,
    /// Raw content-type tag as delivered.
    pub content_type: Option<String>,
    pub media: Option<MediaRef>,
    pub quoted: Option<Box<ClassifiedMessage>>,
    connection: Arc<dyn Connection>,
    downloaded: OnceCell<Vec<u8>>,
}

impl ClassifiedMessage {
    pub fn is_image(&self) -> bool {
        self.kind == ContentKind::Image
    }

    pub fn is_video(&self) -> bool {
        self.kind == ContentKind::Video
    }

    pub fn is_sticker(&self) -> bool {
        self.kind == ContentKind::Sticker
    }

    pub fn is_quoted_image(&self) -> bool {
        self.quoted.as_deref().is_some_and(ClassifiedMessage::is_image)
    }

    pub fn is_quoted_video(&self) -> bool {
        self.quoted.as_deref().is_some_and(ClassifiedMessage::is_video)
    }

    pub fn is_quoted_sticker(&self) -> bool {
        self.quoted.as_deref().is_some_and(ClassifiedMessage::is_sticker)
    }

    /// Whether this message itself carries downloadable media.
    pub fn has_media(&self) -> bool {
        self.kind.is_media() && self.media.is_some()
    }

    /// The message `download` fetches from: the quoted message when it
    /// carries media, otherwise this one.
    pub fn download_target(&self) -> Option<&ClassifiedMessage> {
        match self.quoted.as_deref() {
            Some(quoted) if quoted.has_media() => Some(quoted),
            _ if self.has_media() => Some(self),
            _ => None,
        }
    }

    /// Connection this message arrived on.
    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    /// Fetch the media of [`download_target`](Self::download_target).
    ///
    /// Returns `Ok(None)` when there is nothing to download. The first
    /// successful fetch is cached; later calls return the same bytes.
    pub async fn download(&self) -> Result<Option<Vec<u8>>, DownloadError> {
        let Some(target) = self.download_target() else {
            return Ok(None);
        };
        let Some(media) = target.media.as_ref() else {
            return Ok(None);
        };
        let content_type = target.content_type.as_deref().unwrap_or_default();

        let bytes = self
            .downloaded
            .get_or_try_init(|| self.connection.download_media(content_type, media))
            .await?;
        Ok(Some(bytes.clone()))
    }
}

impl fmt::Debug for ClassifiedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifiedMessage")
            .field("id", &self.key.id)
            .field("chat", &self.chat)
            .field("sender", &self.sender)
            .field("kind", &self.kind)
            .field("body", &self.body)
            .field("is_self", &self.is_self)
            .field("quoted", &self.quoted)
            .finish_non_exhaustive()
    }
}

/// Classify a raw message received on `connection`.
///
/// Never fails: missing or unknown content degrades to a text or
/// [`ContentKind::Other`] message.
pub fn classify(raw: RawMessage, connection: Arc<dyn Connection>) -> ClassifiedMessage {
    let own = connection.own_jid().map(|jid| jid.to_normalized());
    let timestamp = raw
        .message_timestamp
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
    build(
        raw.key,
        raw.push_name,
        timestamp,
        raw.message,
        own.as_ref(),
        connection,
    )
}

fn build(
    key: MessageKey,
    push_name: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    content: Option<RawContent>,
    own: Option<&JID>,
    connection: Arc<dyn Connection>,
) -> ClassifiedMessage {
    let content = content.unwrap_or_default();
    let kind = ContentKind::from_tag(content.content_type.as_deref());
    let body = match kind {
        ContentKind::Text => content.text.or(content.caption),
        ContentKind::Image | ContentKind::Video | ContentKind::Sticker => {
            content.caption.or(content.text)
        }
        ContentKind::Other(_) => None,
    }
    .unwrap_or_default();

    let chat = key.remote_jid.clone();
    let origin = key.participant.clone().unwrap_or_else(|| chat.clone());
    let is_self = key.from_me || own.is_some_and(|own| origin.to_normalized() == *own);
    let sender = match own {
        Some(own) if key.from_me => own.clone(),
        _ => origin,
    };

    let quoted = content.context_info.and_then(|context| {
        let quoted_content = context.quoted_message?;
        let quoted_from_me = match (&context.participant, own) {
            (Some(participant), Some(own)) => participant.to_normalized() == *own,
            _ => false,
        };
        let quoted_key = MessageKey {
            remote_jid: chat.clone(),
            from_me: quoted_from_me,
            id: context.stanza_id.unwrap_or_default(),
            participant: context.participant,
        };
        Some(Box::new(build(
            quoted_key,
            None,
            None,
            Some(*quoted_content),
            own,
            Arc::clone(&connection),
        )))
    });

    ClassifiedMessage {
        key,
        chat,
        sender,
        push_name,
        timestamp,
        body,
        is_self,
        kind,
        content_type: content.content_type,
        media: content.media,
        quoted,
        connection,
        downloaded: OnceCell::new(),
    }
}
