//! WhatsApp JID (Jabber ID) types.
//!
//! JIDs identify users, groups and devices. The bot only ever needs to
//! compare identities and address replies, so this type keeps the parsing
//! and normalization rules and nothing else.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Known JID servers on WhatsApp
pub mod servers {
    pub const DEFAULT_USER: &str = "s.whatsapp.net";
    pub const LEGACY_USER: &str = "c.us";
}

/// MessageID is the internal ID of a WhatsApp message.
pub type MessageID = String;

/// JID represents a WhatsApp user, group or device address.
///
/// Device addresses carry an agent and device number
/// (`user.agent:device@server`); [`JID::to_normalized`] strips them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JID {
    pub user: String,
    pub raw_agent: u8,
    pub device: u16,
    pub server: String,
}

impl JID {
    /// Creates a new regular JID.
    pub fn new(user: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            server: server.into(),
            ..Default::default()
        }
    }

    /// Returns the account-level identity: agent and device are dropped and
    /// the legacy `c.us` server is folded into `s.whatsapp.net`.
    pub fn to_normalized(&self) -> Self {
        let server = if self.server == servers::LEGACY_USER {
            servers::DEFAULT_USER.to_string()
        } else {
            self.server.clone()
        };
        Self::new(self.user.clone(), server)
    }

    /// Returns true if the JID is empty (no server).
    pub fn is_empty(&self) -> bool {
        self.server.is_empty()
    }
}

impl fmt::Display for JID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.raw_agent > 0 {
            write!(f, "{}.{}:{}@{}", self.user, self.raw_agent, self.device, self.server)
        } else if self.device > 0 {
            write!(f, "{}:{}@{}", self.user, self.device, self.server)
        } else if !self.user.is_empty() {
            write!(f, "{}@{}", self.user, self.server)
        } else {
            write!(f, "{}", self.server)
        }
    }
}

/// Error type for JID parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to parse JID: {0}")]
pub struct ParseJIDError(pub String);

impl FromStr for JID {
    type Err = ParseJIDError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((user_part, server)) = s.split_once('@') else {
            return Ok(JID::new("", s));
        };
        if server.contains('@') {
            return Err(ParseJIDError(format!("unexpected '@' in {s:?}")));
        }

        let mut jid = JID::new(user_part, server);

        let (user, device_part) = match user_part.split_once(':') {
            Some((user, device)) => (user, Some(device)),
            None => (user_part, None),
        };

        match user.split_once('.') {
            Some((bare, agent)) => {
                jid.user = bare.to_string();
                jid.raw_agent = agent
                    .parse()
                    .map_err(|_| ParseJIDError(format!("bad agent in {s:?}")))?;
            }
            None => jid.user = user.to_string(),
        }

        if let Some(device) = device_part {
            jid.device = device
                .parse()
                .map_err(|_| ParseJIDError(format!("bad device in {s:?}")))?;
        }

        Ok(jid)
    }
}

impl TryFrom<String> for JID {
    type Error = ParseJIDError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<JID> for String {
    fn from(jid: JID) -> Self {
        jid.to_string()
    }
}
