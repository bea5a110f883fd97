use std::sync::Arc;

use async_trait::async_trait;

use super::{reply_text, Handler, HandlerError, Outcome, FAILURE_REPLY};
use crate::lookup::{LookupClient, LookupResult};
use crate::message::ClassifiedMessage;

pub const LOOKUP_PREFIX: &str = "apk4all ";

/// `apk4all <query>`: search the app catalog and reply with the hits.
pub struct LookupHandler {
    client: Arc<dyn LookupClient>,
}

impl LookupHandler {
    pub fn new(client: Arc<dyn LookupClient>) -> Self {
        Self { client }
    }
}

/// Render hits as `*Name:*`/`*Link:*` blocks in order.
pub fn format_results(results: &[LookupResult]) -> String {
    results
        .iter()
        .map(|r| format!("*Name:* {}\n*Link:* {}\n", r.name, r.link))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Handler for LookupHandler {
    fn name(&self) -> &'static str {
        "apk4all"
    }

    async fn execute(&self, message: &ClassifiedMessage) -> Result<Outcome, HandlerError> {
        let query = message
            .body
            .split_whitespace()
            .skip(1)
            .collect::<Vec<_>>()
            .join(" ");

        let reply = if query.is_empty() {
            FAILURE_REPLY.to_string()
        } else {
            match self.client.search(&query).await? {
                Some(results) if !results.is_empty() => format_results(&results),
                _ => FAILURE_REPLY.to_string(),
            }
        };

        let id = reply_text(message, reply).await?;
        Ok(Outcome::Sent(id))
    }
}
