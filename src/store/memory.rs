//! In-memory credential store for development and testing.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::store::{CredentialStore, Credentials, StoreResult};

/// Keeps credentials in memory and counts saves.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credentials: RwLock<Credentials>,
    saves: RwLock<usize>,
}

impl MemoryCredentialStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with credentials.
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials: RwLock::new(credentials),
            saves: RwLock::new(0),
        }
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        self.saves.read().map(|n| *n).unwrap_or_default()
    }

    /// Currently stored credentials.
    pub fn current(&self) -> Credentials {
        self.credentials
            .read()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> StoreResult<Credentials> {
        Ok(self.current())
    }

    async fn save(&self, credentials: &Credentials) -> StoreResult<()> {
        if let Ok(mut stored) = self.credentials.write() {
            *stored = credentials.clone();
        }
        if let Ok(mut saves) = self.saves.write() {
            *saves += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryCredentialStore::new();
        assert!(store.load().await.unwrap().is_empty());

        store.save(&Credentials(json!({ "me": "1@s.whatsapp.net" }))).await.unwrap();

        assert_eq!(store.save_count(), 1);
        assert!(!store.load().await.unwrap().is_empty());
    }
}
