//! Types module for WhatsApp protocol types.
//!
//! This module contains the identity type (JID) and the events a transport
//! reports to the bot.

mod jid;
mod events;

pub use jid::*;
pub use events::*;
