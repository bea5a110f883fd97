//! Outgoing message building.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::Rng;
use serde_json::{json, Value};

use crate::types::{MessageID, MessageKey, JID};

/// Generate a unique message ID.
pub fn generate_message_id() -> MessageID {
    let bytes: [u8; 8] = rand::thread_rng().gen();
    format!("3EB0{:016X}", u64::from_be_bytes(bytes))
}

/// Payload of an outgoing message.
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingContent {
    Text(String),
    /// WebP sticker bytes.
    Sticker(Vec<u8>),
}

/// A message ready to hand to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub id: MessageID,
    pub to: JID,
    pub content: OutgoingContent,
    /// Message this one replies to.
    pub quoted: Option<MessageKey>,
}

impl OutgoingMessage {
    /// Build a text message.
    pub fn text(to: JID, body: impl Into<String>) -> Self {
        Self {
            id: generate_message_id(),
            to,
            content: OutgoingContent::Text(body.into()),
            quoted: None,
        }
    }

    /// Build a sticker message.
    pub fn sticker(to: JID, webp: Vec<u8>) -> Self {
        Self {
            id: generate_message_id(),
            to,
            content: OutgoingContent::Sticker(webp),
            quoted: None,
        }
    }

    /// Mark this message as a reply to `key`.
    pub fn quoting(mut self, key: MessageKey) -> Self {
        self.quoted = Some(key);
        self
    }

    /// Encode as `sendMessage` parameters for the gateway bridge.
    pub fn to_params(&self) -> Value {
        let content = match &self.content {
            OutgoingContent::Text(text) => json!({ "text": text }),
            OutgoingContent::Sticker(bytes) => json!({ "sticker": STANDARD.encode(bytes) }),
        };
        let mut params = json!({
            "id": self.id,
            "to": self.to.to_string(),
            "content": content,
        });
        if let Some(quoted) = &self.quoted {
            params["quoted"] = json!(quoted);
        }
        params
    }
}
