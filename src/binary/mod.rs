//! Protocol node representation.
//!
//! The gateway speaks the binary XML format on the wire; the bot only builds
//! and inspects nodes, which travel to the gateway as JSON.

mod node;

pub use node::*;
