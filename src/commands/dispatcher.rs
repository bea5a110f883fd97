use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, warn};
use tokio::task::JoinSet;

use super::{reply_text, CommandTable, Handler, HandlerError, FAILURE_REPLY};
use crate::message::ClassifiedMessage;

/// Routes self-sent messages to handlers, one task per matched message.
pub struct CommandDispatcher {
    table: Arc<CommandTable>,
    handler_timeout: Duration,
    tasks: JoinSet<()>,
}

impl CommandDispatcher {
    pub fn new(table: CommandTable, handler_timeout: Duration) -> Self {
        Self {
            table: Arc::new(table),
            handler_timeout,
            tasks: JoinSet::new(),
        }
    }

    /// Dispatch one message. Returns whether a handler was started.
    ///
    /// Messages not sent by the controlling account are dropped.
    pub fn dispatch(&mut self, message: ClassifiedMessage) -> bool {
        self.reap();
        if !message.is_self {
            return false;
        }
        debug!("command candidate: {:?}", message.body);

        let Some(handler) = self.table.resolve(&message.body) else {
            return false;
        };
        self.tasks.spawn(run_handler(handler, message, self.handler_timeout));
        true
    }

    /// Wait for in-flight handlers, at most one handler timeout; stragglers
    /// are aborted.
    pub async fn shutdown(mut self) {
        let limit = self.handler_timeout;
        let drained = tokio::time::timeout(limit, async {
            while let Some(joined) = self.tasks.join_next().await {
                if let Err(e) = joined {
                    error!("command task failed: {e}");
                }
            }
        })
        .await;
        if drained.is_err() {
            warn!(
                "aborting {} command handler(s) still running after {limit:?}",
                self.tasks.len()
            );
            self.tasks.abort_all();
        }
    }

    fn reap(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            if let Err(e) = joined {
                error!("command task failed: {e}");
            }
        }
    }
}

async fn run_handler(handler: Arc<dyn Handler>, message: ClassifiedMessage, limit: Duration) {
    let name = handler.name();
    let result = match tokio::time::timeout(limit, handler.execute(&message)).await {
        Ok(result) => result,
        Err(_) => Err(HandlerError::TimedOut(limit)),
    };

    match result {
        Ok(outcome) => debug!("{name}: {outcome:?}"),
        Err(e) => {
            error!("{name} failed: {e}");
            if let Err(e) = reply_text(&message, FAILURE_REPLY).await {
                warn!("could not report {name} failure: {e}");
            }
        }
    }
}
