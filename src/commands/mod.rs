//! Self-command routing.
//!
//! A [`CommandTable`] maps message bodies to [`Handler`]s: exact matchers
//! first, then prefix matchers. The [`CommandDispatcher`] gates on the self
//! flag and runs every matched handler as its own task.

mod avatar;
mod dispatcher;
mod lookup;
mod sticker;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::lookup::{LookupClient, LookupError};
use crate::media::{ImageResizer, MediaConverter, MediaError};
use crate::message::{ClassifiedMessage, DownloadError};
use crate::profile::{ProfileError, ProfileUpdater};
use crate::protocol::OutgoingMessage;
use crate::transport::TransportError;
use crate::types::MessageID;

pub use avatar::{AvatarHandler, FULL_AVATAR_SIZE, SQUARE_AVATAR_SIZE};
pub use dispatcher::CommandDispatcher;
pub use lookup::{format_results, LookupHandler, LOOKUP_PREFIX};
pub use sticker::StickerHandler;

/// Generic reply for failed commands.
pub const FAILURE_REPLY: &str = "Err..";

/// What a handler did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A message was sent.
    Sent(MessageID),
    ProfileUpdated,
    /// Nothing applicable to do.
    Ignored,
}

/// Handler errors.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error("reply failed: {0}")]
    Transport(#[from] TransportError),
    #[error("handler timed out after {0:?}")]
    TimedOut(Duration),
}

/// A command implementation.
#[async_trait]
pub trait Handler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, message: &ClassifiedMessage) -> Result<Outcome, HandlerError>;
}

/// How a route matches a message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    Exact(&'static str),
    Prefix(&'static str),
}

impl Matcher {
    pub fn matches(&self, body: &str) -> bool {
        match self {
            Matcher::Exact(command) => body == *command,
            Matcher::Prefix(prefix) => body.starts_with(prefix),
        }
    }
}

/// Closed routing table.
#[derive(Default, Clone)]
pub struct CommandTable {
    exact: Vec<(Matcher, Arc<dyn Handler>)>,
    prefix: Vec<(Matcher, Arc<dyn Handler>)>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bot's command set: `s`, `setpp`, `setppfull` and `apk4all `.
    pub fn standard(
        converter: Arc<dyn MediaConverter>,
        resizer: Arc<dyn ImageResizer>,
        lookup: Arc<dyn LookupClient>,
        profile: ProfileUpdater,
    ) -> Self {
        Self::new()
            .route(Matcher::Exact("s"), Arc::new(StickerHandler::new(converter)))
            .route(
                Matcher::Exact("setpp"),
                Arc::new(AvatarHandler::square(Arc::clone(&resizer), profile)),
            )
            .route(
                Matcher::Exact("setppfull"),
                Arc::new(AvatarHandler::full(resizer, profile)),
            )
            .route(
                Matcher::Prefix(LOOKUP_PREFIX),
                Arc::new(LookupHandler::new(lookup)),
            )
    }

    pub fn route(mut self, matcher: Matcher, handler: Arc<dyn Handler>) -> Self {
        match matcher {
            Matcher::Exact(_) => self.exact.push((matcher, handler)),
            Matcher::Prefix(_) => self.prefix.push((matcher, handler)),
        }
        self
    }

    /// Handler for `body`; exact routes win over prefix routes.
    pub fn resolve(&self, body: &str) -> Option<Arc<dyn Handler>> {
        self.exact
            .iter()
            .chain(self.prefix.iter())
            .find(|(matcher, _)| matcher.matches(body))
            .map(|(_, handler)| Arc::clone(handler))
    }
}

/// Reply to `message` in its chat, quoting it.
pub async fn reply_text(
    message: &ClassifiedMessage,
    text: impl Into<String>,
) -> Result<MessageID, TransportError> {
    let reply = OutgoingMessage::text(message.chat.clone(), text).quoting(message.key.clone());
    message.connection().send_message(reply).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeConverter, FakeLookup};

    struct Named(&'static str);

    #[async_trait]
    impl Handler for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn execute(&self, _message: &ClassifiedMessage) -> Result<Outcome, HandlerError> {
            Ok(Outcome::Ignored)
        }
    }

    fn resolved(table: &CommandTable, body: &str) -> Option<&'static str> {
        table.resolve(body).map(|handler| handler.name())
    }

    #[test]
    fn test_exact_routes_win_over_prefixes() {
        let table = CommandTable::new()
            .route(Matcher::Prefix("s"), Arc::new(Named("prefix")))
            .route(Matcher::Exact("s"), Arc::new(Named("exact")));

        assert_eq!(resolved(&table, "s"), Some("exact"));
        assert_eq!(resolved(&table, "setpp"), Some("prefix"));
        assert_eq!(resolved(&table, "x"), None);
    }

    #[test]
    fn test_standard_table_routes_every_command() {
        let table = CommandTable::standard(
            Arc::new(FakeConverter::default()),
            Arc::new(crate::media::JpegResizer::default()),
            Arc::new(FakeLookup::empty()),
            ProfileUpdater::new(),
        );

        assert_eq!(resolved(&table, "s"), Some("sticker"));
        assert_eq!(resolved(&table, "setpp"), Some("setpp"));
        assert_eq!(resolved(&table, "setppfull"), Some("setppfull"));
        assert_eq!(resolved(&table, "apk4all calculator"), Some("apk4all"));
        assert_eq!(resolved(&table, "apk4all"), None);
        assert_eq!(resolved(&table, "S"), None);
        assert_eq!(resolved(&table, "s please"), None);
        assert_eq!(resolved(&table, ""), None);
    }
}
