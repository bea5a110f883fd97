//! Event types emitted by the messaging transport.
//!
//! Two families reach the bot: connection-state updates, which drive the
//! reconnect state machine, and inbound message batches, which feed the
//! classifier.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::store::Credentials;
use crate::types::{MessageID, JID};

/// Cause attached to a closed connection.
///
/// The set is fixed by the transport, which reports it as a numeric status
/// code. Codes outside the known set are kept in [`DisconnectReason::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisconnectReason {
    BadSession,
    ConnectionClosed,
    ConnectionLost,
    ConnectionReplaced,
    LoggedOut,
    RestartRequired,
    TimedOut,
    Unknown(u16),
}

impl DisconnectReason {
    /// Map a transport status code to a reason.
    ///
    /// 408 is shared by "connection lost" and "timed out" on the wire; it is
    /// reported as [`DisconnectReason::ConnectionLost`].
    pub fn from_status_code(code: u16) -> Self {
        match code {
            500 => Self::BadSession,
            428 => Self::ConnectionClosed,
            408 => Self::ConnectionLost,
            440 => Self::ConnectionReplaced,
            401 => Self::LoggedOut,
            515 => Self::RestartRequired,
            other => Self::Unknown(other),
        }
    }

    /// Map a reason name, as some transports report it, to a reason.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "badSession" => Self::BadSession,
            "connectionClosed" => Self::ConnectionClosed,
            "connectionLost" => Self::ConnectionLost,
            "connectionReplaced" => Self::ConnectionReplaced,
            "loggedOut" => Self::LoggedOut,
            "restartRequired" => Self::RestartRequired,
            "timedOut" => Self::TimedOut,
            _ => return None,
        })
    }

    /// The wire status code for this reason.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadSession => 500,
            Self::ConnectionClosed => 428,
            Self::ConnectionLost | Self::TimedOut => 408,
            Self::ConnectionReplaced => 440,
            Self::LoggedOut => 401,
            Self::RestartRequired => 515,
            Self::Unknown(code) => *code,
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadSession => write!(f, "bad session"),
            Self::ConnectionClosed => write!(f, "connection closed"),
            Self::ConnectionLost => write!(f, "connection lost"),
            Self::ConnectionReplaced => write!(f, "connection replaced"),
            Self::LoggedOut => write!(f, "logged out"),
            Self::RestartRequired => write!(f, "restart required"),
            Self::TimedOut => write!(f, "timed out"),
            Self::Unknown(code) => write!(f, "unknown ({code})"),
        }
    }
}

/// Lifecycle state of the current connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed(DisconnectReason),
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Closed(reason) => write!(f, "close ({reason})"),
        }
    }
}

/// A connection-state update reported by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionUpdate {
    Connecting,
    /// The session is authenticated; `me` is the controlling account.
    Open { me: Option<JID> },
    Closed {
        reason: DisconnectReason,
        /// Upstream error text, kept for the fatal-error report.
        cause: String,
    },
    /// A pairing code to show to the operator.
    Qr(String),
}

/// Opaque pointer to downloadable media, resolved by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_length: Option<u64>,
}

/// Addressing information of a raw message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageKey {
    pub remote_jid: JID,
    #[serde(default)]
    pub from_me: bool,
    #[serde(default)]
    pub id: MessageID,
    /// Sender inside a group chat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant: Option<JID>,
}

/// Reply context carried by a message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextInfo {
    #[serde(default, deserialize_with = "lenient")]
    pub stanza_id: Option<MessageID>,
    #[serde(default, deserialize_with = "lenient")]
    pub participant: Option<JID>,
    #[serde(default, deserialize_with = "lenient")]
    pub quoted_message: Option<Box<RawContent>>,
}

/// Message payload as the transport delivers it.
///
/// Every field is optional and a badly shaped field decodes as absent, so
/// the classifier degrades it to plain text instead of losing the message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContent {
    /// Content-type tag such as `imageMessage` or `conversation`.
    #[serde(default, rename = "type", deserialize_with = "lenient")]
    pub content_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub caption: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub media: Option<MediaRef>,
    #[serde(default, deserialize_with = "lenient")]
    pub context_info: Option<ContextInfo>,
}

/// One inbound message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    pub key: MessageKey,
    #[serde(default, deserialize_with = "lenient")]
    pub push_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub message_timestamp: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub message: Option<RawContent>,
}

/// Decode an optional field, treating a value of the wrong shape as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value::<Option<T>>(value).ok().flatten())
}

/// Kind of message batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertKind {
    /// Live traffic.
    Notify,
    /// History sync.
    Append,
}

/// A batch of inbound messages.
#[derive(Debug, Clone, PartialEq)]
pub struct MessagesUpsert {
    pub kind: UpsertKind,
    pub messages: Vec<RawMessage>,
}

/// All events a transport can emit.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connection(ConnectionUpdate),
    CredsUpdate(Credentials),
    Messages(MessagesUpsert),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_round_trip_known_reasons() {
        for reason in [
            DisconnectReason::BadSession,
            DisconnectReason::ConnectionClosed,
            DisconnectReason::ConnectionLost,
            DisconnectReason::ConnectionReplaced,
            DisconnectReason::LoggedOut,
            DisconnectReason::RestartRequired,
        ] {
            assert_eq!(DisconnectReason::from_status_code(reason.status_code()), reason);
        }
    }

    #[test]
    fn test_unrecognized_code_is_kept() {
        assert_eq!(
            DisconnectReason::from_status_code(411),
            DisconnectReason::Unknown(411)
        );
        assert_eq!(DisconnectReason::Unknown(411).status_code(), 411);
    }

    #[test]
    fn test_reason_names() {
        assert_eq!(
            DisconnectReason::from_name("timedOut"),
            Some(DisconnectReason::TimedOut)
        );
        assert_eq!(DisconnectReason::from_name("bogus"), None);
    }

    #[test]
    fn test_raw_message_tolerates_missing_content() {
        let raw: RawMessage = serde_json::from_value(serde_json::json!({
            "key": { "remoteJid": "123@s.whatsapp.net", "fromMe": true, "id": "ABC" }
        }))
        .unwrap();
        assert!(raw.message.is_none());
        assert!(raw.key.from_me);
    }

    #[test]
    fn test_raw_message_with_quoted_image() {
        let raw: RawMessage = serde_json::from_value(serde_json::json!({
            "key": { "remoteJid": "123@s.whatsapp.net", "id": "ABC" },
            "message": {
                "type": "extendedTextMessage",
                "text": "s",
                "contextInfo": {
                    "stanzaId": "XYZ",
                    "quotedMessage": {
                        "type": "imageMessage",
                        "media": { "directPath": "/v/t62/abc", "mimetype": "image/jpeg" }
                    }
                }
            }
        }))
        .unwrap();
        let quoted = raw
            .message
            .and_then(|m| m.context_info)
            .and_then(|c| c.quoted_message)
            .unwrap();
        assert_eq!(quoted.content_type.as_deref(), Some("imageMessage"));
        assert_eq!(
            quoted.media.and_then(|m| m.mimetype).as_deref(),
            Some("image/jpeg")
        );
    }

    #[test]
    fn test_badly_shaped_content_fields_decode_as_absent() {
        let raw: RawMessage = serde_json::from_value(serde_json::json!({
            "key": { "remoteJid": "123@s.whatsapp.net", "fromMe": true, "id": "ABC" },
            "pushName": 7,
            "message": {
                "type": "conversation",
                "text": "s",
                "caption": 42,
                "media": "unexpected-shape",
                "contextInfo": { "stanzaId": "XYZ", "quotedMessage": [1, 2] }
            }
        }))
        .unwrap();

        assert_eq!(raw.push_name, None);
        let content = raw.message.unwrap();
        assert_eq!(content.content_type.as_deref(), Some("conversation"));
        assert_eq!(content.text.as_deref(), Some("s"));
        assert_eq!(content.caption, None);
        assert_eq!(content.media, None);
        let context = content.context_info.unwrap();
        assert_eq!(context.stanza_id.as_deref(), Some("XYZ"));
        assert!(context.quoted_message.is_none());
    }

    #[test]
    fn test_non_object_message_decodes_as_empty() {
        let raw: RawMessage = serde_json::from_value(serde_json::json!({
            "key": { "remoteJid": "123@s.whatsapp.net", "id": "ABC" },
            "message": "hello"
        }))
        .unwrap();
        assert!(raw.message.is_none());
    }

    #[test]
    fn test_malformed_key_still_rejects_the_message() {
        let result = serde_json::from_value::<RawMessage>(serde_json::json!({
            "key": { "remoteJid": 5 },
            "message": { "type": "conversation", "text": "s" }
        }));
        assert!(result.is_err());
    }
}
