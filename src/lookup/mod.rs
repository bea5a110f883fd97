//! App-catalog lookup.

mod apk4all;

use async_trait::async_trait;
use thiserror::Error;

pub use apk4all::{parse_search_results, Apk4AllClient};

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupResult {
    pub name: String,
    pub link: String,
}

/// Lookup errors.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("lookup request failed: {0}")]
    Http(String),
    #[error("failed to read lookup response: {0}")]
    Io(#[from] std::io::Error),
    #[error("lookup task failed: {0}")]
    Task(String),
}

/// Searches an app catalog.
#[async_trait]
pub trait LookupClient: Send + Sync {
    /// Search for `query`; `None` when the catalog has no answer.
    async fn search(&self, query: &str) -> Result<Option<Vec<LookupResult>>, LookupError>;
}
