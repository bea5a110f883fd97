//! wa-selfbot: a self-command WhatsApp client.
//!
//! The bot keeps one authenticated session alive through a messaging
//! gateway and reacts to commands the account owner sends from any chat.
//!
//! ## Modules
//!
//! - `types` - JIDs, disconnect reasons and transport events
//! - `binary` - Protocol nodes used for IQ queries
//! - `protocol` - Outgoing message and request builders, QR rendering
//! - `store` - Credential persistence
//! - `transport` - Connection traits and the WebSocket gateway bridge
//! - `connection` - Reconnect state machine
//! - `message` - Inbound message classification
//! - `commands` - Command routing and handlers
//! - `media` - Sticker conversion and profile-picture resizing
//! - `lookup` - App catalog search
//! - `config` - Configuration management

pub mod binary;
pub mod commands;
pub mod connection;
pub mod lookup;
pub mod media;
pub mod message;
pub mod profile;
pub mod protocol;
pub mod store;
pub mod transport;
pub mod types;

mod bot;
mod config;

#[cfg(test)]
mod test_support;

pub use bot::{Bot, BotError, BotExit};
pub use config::BotConfig;
pub use connection::{ConnectionError, ConnectionManager, SessionEnd};
pub use message::{classify, ClassifiedMessage, ContentKind};
pub use types::{DisconnectReason, MessageID, JID};
