use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::connection::RetryPolicy;

/// Runtime configuration of the bot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BotConfig {
    /// Name of the session; selects `<auth_dir>/<session_name>-session`.
    pub session_name: String,
    /// Directory holding persisted sessions.
    pub auth_dir: PathBuf,
    /// WebSocket endpoint of the messaging gateway.
    pub bridge_endpoint: String,
    /// Upper bound on a single command handler, in seconds.
    pub handler_timeout_secs: u64,
    /// Backoff base between reconnect attempts.
    pub retry_base_ms: u64,
    /// Backoff ceiling between reconnect attempts.
    pub retry_max_ms: u64,
    /// Root of the app catalog searched by `apk4all`.
    pub lookup_base_url: String,
    /// ffmpeg binary used for video stickers.
    pub ffmpeg_path: PathBuf,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            session_name: "sessions".into(),
            auth_dir: PathBuf::from("./session"),
            bridge_endpoint: "ws://127.0.0.1:8787".into(),
            handler_timeout_secs: 120,
            retry_base_ms: 500,
            retry_max_ms: 30_000,
            lookup_base_url: "https://apk4all.io".into(),
            ffmpeg_path: PathBuf::from("ffmpeg"),
        }
    }
}

impl BotConfig {
    /// Override the session name.
    pub fn with_session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = name.into();
        self
    }

    /// Override the auth-state directory.
    pub fn with_auth_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.auth_dir = dir.into();
        self
    }

    /// Override the gateway endpoint.
    pub fn with_bridge_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.bridge_endpoint = endpoint.into();
        self
    }

    /// Override the per-handler time limit.
    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Override the reconnect backoff.
    pub fn with_retry(mut self, base_ms: u64, max_ms: u64) -> Self {
        self.retry_base_ms = base_ms;
        self.retry_max_ms = max_ms.max(base_ms);
        self
    }

    /// Override the app catalog root.
    pub fn with_lookup_base_url(mut self, url: impl Into<String>) -> Self {
        self.lookup_base_url = url.into();
        self
    }

    /// Override the ffmpeg binary.
    pub fn with_ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }

    pub fn handler_timeout(&self) -> Duration {
        Duration::from_secs(self.handler_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_base_ms, self.retry_max_ms)
    }

    /// Directory holding this session's credentials.
    pub fn session_dir(&self) -> PathBuf {
        self.auth_dir.join(format!("{}-session", self.session_name))
    }
}
