//! File-backed credential store.
//!
//! Layout: `<auth_dir>/<session_name>-session/creds.json`. Writes go to a
//! temporary sibling first and are renamed into place, so a crash mid-write
//! leaves the previous credentials intact.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;

use crate::store::{CredentialStore, Credentials, StoreResult};

const CREDS_FILE: &str = "creds.json";

/// Credential store persisting one JSON file per session.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    session_dir: PathBuf,
}

impl FileCredentialStore {
    /// Store for `session_name` under `auth_dir`.
    pub fn new(auth_dir: impl AsRef<Path>, session_name: &str) -> Self {
        Self {
            session_dir: auth_dir.as_ref().join(format!("{session_name}-session")),
        }
    }

    /// Directory holding this session's files.
    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    fn creds_path(&self) -> PathBuf {
        self.session_dir.join(CREDS_FILE)
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> StoreResult<Credentials> {
        match tokio::fs::read(self.creds_path()).await {
            Ok(contents) => Ok(serde_json::from_slice(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no stored credentials at {}", self.creds_path().display());
                Ok(Credentials::empty())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, credentials: &Credentials) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.session_dir).await?;
        let serialized = serde_json::to_vec_pretty(credentials)?;
        let tmp = self.session_dir.join(format!("{CREDS_FILE}.tmp"));
        tokio::fs::write(&tmp, serialized).await?;
        tokio::fs::rename(&tmp, self.creds_path()).await?;
        debug!("saved credentials to {}", self.creds_path().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path(), "sessions");

        let creds = store.load().await.unwrap();
        assert!(creds.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path(), "sessions");
        let creds = Credentials(json!({ "noiseKey": "abc", "registrationId": 7 }));

        store.save(&creds).await.unwrap();

        assert!(dir.path().join("sessions-session").join("creds.json").exists());
        assert_eq!(store.load().await.unwrap(), creds);
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path(), "bot");

        store.save(&Credentials(json!({ "v": 1 }))).await.unwrap();
        store.save(&Credentials(json!({ "v": 2 }))).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Credentials(json!({ "v": 2 })));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path(), "bot");
        std::fs::create_dir_all(store.session_dir()).unwrap();
        std::fs::write(store.session_dir().join("creds.json"), b"{not json").unwrap();

        assert!(matches!(store.load().await, Err(StoreError::Corrupt(_))));
    }
}
