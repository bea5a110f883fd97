//! Credential persistence interface.
//!
//! The bot never looks inside the credentials: the transport produces them
//! on key rotation and consumes them on connect.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque session credentials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(pub serde_json::Value);

impl Credentials {
    /// Credentials of a session that has never been paired.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether these credentials came from a paired session.
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            serde_json::Value::Null => true,
            serde_json::Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }
}

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("credential storage failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Loads and saves session credentials keyed by a session name.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load stored credentials, or [`Credentials::empty`] for a new session.
    async fn load(&self) -> StoreResult<Credentials>;

    /// Replace the stored credentials.
    async fn save(&self, credentials: &Credentials) -> StoreResult<()>;
}
