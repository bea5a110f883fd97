//! Transport boundary.
//!
//! The wire protocol and session cryptography live outside this crate. A
//! [`Connector`] opens one authenticated [`Connection`] per attempt and
//! pushes that connection's events into the sink it was given; the
//! connection handle offers the send/query/download primitives the command
//! handlers need.

pub mod bridge;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::binary::Node;
use crate::protocol::OutgoingMessage;
use crate::store::Credentials;
use crate::types::{Event, MediaRef, MessageID, JID};

pub use bridge::{BridgeConnection, BridgeConnector};

/// Receiving end of a connection's events, as seen by the transport.
pub type EventSink = mpsc::UnboundedSender<Event>;

/// Transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("connection closed")]
    Closed,
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// One live, authenticated connection.
///
/// Handles are shared read-only between the connection loop and command
/// handlers. After a reconnect the old handle stays valid as a value but
/// its operations fail with [`TransportError::Closed`].
#[async_trait]
pub trait Connection: Send + Sync {
    /// Identity of the controlling account, known once the session is open.
    fn own_jid(&self) -> Option<JID>;

    /// Send a message and return the ID the transport assigned.
    async fn send_message(&self, message: OutgoingMessage) -> Result<MessageID, TransportError>;

    /// Submit an IQ query and wait for its result node.
    async fn query(&self, node: Node) -> Result<Node, TransportError>;

    /// Fetch and decrypt the media behind `media`.
    async fn download_media(
        &self,
        content_type: &str,
        media: &MediaRef,
    ) -> Result<Vec<u8>, TransportError>;

    /// Log the device out, invalidating the stored credentials.
    async fn logout(&self) -> Result<(), TransportError>;

    /// Release the connection's resources. Safe to call more than once.
    async fn close(&self);
}

/// Opens connections.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection authenticated with `credentials`.
    async fn connect(
        &self,
        credentials: Credentials,
        events: EventSink,
    ) -> Result<Arc<dyn Connection>, TransportError>;
}
