//! Top-level wiring.
//!
//! The [`ConnectionManager`] loop runs on the caller's task and forwards
//! message batches over a channel to a dispatch task, which classifies each
//! message and hands it to the [`CommandDispatcher`].

use std::future::Future;
use std::sync::Arc;

use log::{debug, error, info};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::commands::{CommandDispatcher, CommandTable};
use crate::config::BotConfig;
use crate::connection::{ConnectionError, ConnectionManager, InboundBatch, SessionEnd};
use crate::lookup::Apk4AllClient;
use crate::media::{JpegResizer, LocalStickerConverter};
use crate::message::classify;
use crate::profile::ProfileUpdater;
use crate::store::{CredentialStore, FileCredentialStore};
use crate::transport::{BridgeConnector, Connector};
use crate::types::UpsertKind;

/// Errors that stop the bot.
#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Why the bot stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotExit {
    Session(SessionEnd),
    /// The shutdown signal fired.
    Interrupted,
}

pub struct Bot {
    config: BotConfig,
    manager: ConnectionManager,
    table: CommandTable,
}

impl Bot {
    pub fn new(
        config: BotConfig,
        connector: Arc<dyn Connector>,
        store: Arc<dyn CredentialStore>,
        table: CommandTable,
    ) -> Self {
        let manager = ConnectionManager::new(connector, store, config.retry_policy())
            .with_session_label(config.session_dir().display().to_string());
        Self {
            config,
            manager,
            table,
        }
    }

    /// Bot talking to the configured gateway with the standard commands.
    pub fn from_config(config: BotConfig) -> Self {
        let connector = BridgeConnector::new(&config.bridge_endpoint, &config.session_name);
        let store = FileCredentialStore::new(&config.auth_dir, &config.session_name);
        let table = CommandTable::standard(
            Arc::new(LocalStickerConverter::new(&config.ffmpeg_path)),
            Arc::new(JpegResizer::default()),
            Arc::new(Apk4AllClient::new(&config.lookup_base_url)),
            ProfileUpdater::new(),
        );
        Self::new(config, Arc::new(connector), Arc::new(store), table)
    }

    /// Run until the session ends or `shutdown` completes.
    ///
    /// In-flight handlers are given up to one handler timeout to finish
    /// either way.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<BotExit, BotError> {
        let (batches_tx, batches_rx) = mpsc::unbounded_channel();
        let dispatcher = CommandDispatcher::new(self.table, self.config.handler_timeout());
        let dispatch = tokio::spawn(dispatch_loop(batches_rx, dispatcher));

        let exit = tokio::select! {
            outcome = self.manager.run(batches_tx) => outcome.map(BotExit::Session),
            () = shutdown => {
                info!("shutting down");
                let live = self.manager.current_connection().borrow().clone();
                if let Some(connection) = live {
                    connection.close().await;
                }
                Ok(BotExit::Interrupted)
            }
        };

        if let Err(e) = dispatch.await {
            error!("dispatch task failed: {e}");
        }
        Ok(exit?)
    }
}

async fn dispatch_loop(
    mut batches: mpsc::UnboundedReceiver<InboundBatch>,
    mut dispatcher: CommandDispatcher,
) {
    while let Some(InboundBatch { connection, upsert }) = batches.recv().await {
        if upsert.kind != UpsertKind::Notify {
            debug!("skipping {} history message(s)", upsert.messages.len());
            continue;
        }
        for raw in upsert.messages {
            dispatcher.dispatch(classify(raw, Arc::clone(&connection)));
        }
    }
    dispatcher.shutdown().await;
}
