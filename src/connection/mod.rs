//! Connection lifecycle.
//!
//! [`ConnectionManager::run`] is the supervising loop: it opens a connection,
//! consumes that connection's events in arrival order, and on close applies
//! the transition table in [`policy`] to either reconnect or stop. Only one
//! connection is live at a time; it is published through a `watch` channel
//! and replaced, never mutated, on reconnect.

mod backoff;
pub mod policy;

use std::sync::Arc;

use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::sync::{mpsc, watch};

use crate::protocol::render_qr;
use crate::store::{CredentialStore, StoreError};
use crate::transport::{Connection, Connector};
use crate::types::{ConnectionState, ConnectionUpdate, DisconnectReason, Event, MessagesUpsert};

pub use backoff::RetryPolicy;
pub use policy::{action_for, Action, SessionEnd};

/// Shared handle to the live connection, if any.
pub type CurrentConnection = watch::Receiver<Option<Arc<dyn Connection>>>;

/// A message batch and the connection it arrived on.
pub struct InboundBatch {
    pub connection: Arc<dyn Connection>,
    pub upsert: MessagesUpsert,
}

/// Errors that end the session.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Unknown DisconnectReason: {code}|{cause}")]
    UnknownDisconnect { code: u16, cause: String },
    #[error("failed to load credentials: {0}")]
    Credentials(#[from] StoreError),
}

/// Owns the single live connection and the reconnect state machine.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    store: Arc<dyn CredentialStore>,
    retry: RetryPolicy,
    session_label: String,
    state: watch::Sender<ConnectionState>,
    current: watch::Sender<Option<Arc<dyn Connection>>>,
}

impl ConnectionManager {
    pub fn new(
        connector: Arc<dyn Connector>,
        store: Arc<dyn CredentialStore>,
        retry: RetryPolicy,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Connecting);
        let (current, _) = watch::channel(None);
        Self {
            connector,
            store,
            retry,
            session_label: "the session directory".to_string(),
            state,
            current,
        }
    }

    /// Name the auth-state location in operator messages.
    pub fn with_session_label(mut self, label: impl Into<String>) -> Self {
        self.session_label = label.into();
        self
    }

    /// Observe connection-state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Observe the live connection handle.
    pub fn current_connection(&self) -> CurrentConnection {
        self.current.subscribe()
    }

    /// Run until the session ends.
    ///
    /// Message batches from every connection are forwarded to `messages`,
    /// tagged with their connection. Returns the terminal outcome, or an
    /// error for an unrecognized disconnect reason.
    pub async fn run(
        &self,
        messages: mpsc::UnboundedSender<InboundBatch>,
    ) -> Result<SessionEnd, ConnectionError> {
        let mut attempt: u32 = 0;

        loop {
            self.observe(ConnectionState::Connecting);
            let credentials = self.store.load().await?;
            let (events_tx, mut events_rx) = mpsc::unbounded_channel();

            let connection = match self.connector.connect(credentials, events_tx).await {
                Ok(connection) => connection,
                Err(e) => {
                    warn!("connection attempt failed: {e}");
                    self.observe(ConnectionState::Closed(DisconnectReason::ConnectionClosed));
                    self.pause(attempt).await;
                    attempt = attempt.saturating_add(1);
                    continue;
                }
            };
            self.current.send_replace(Some(Arc::clone(&connection)));

            let (reason, cause) = self
                .pump(&connection, &mut events_rx, &messages, &mut attempt)
                .await;
            self.observe(ConnectionState::Closed(reason));

            match action_for(reason) {
                Action::Reconnect => {
                    info!("{}", policy::describe(reason, &self.session_label));
                    self.retire(connection).await;
                    self.pause(attempt).await;
                    attempt = attempt.saturating_add(1);
                }
                Action::Terminate(end) => {
                    warn!("{}", policy::describe(reason, &self.session_label));
                    if let Err(e) = connection.logout().await {
                        debug!("logout after {reason} failed: {e}");
                    }
                    self.retire(connection).await;
                    return Ok(end);
                }
                Action::Fatal => {
                    error!("{}", policy::describe(reason, &self.session_label));
                    self.retire(connection).await;
                    return Err(ConnectionError::UnknownDisconnect {
                        code: reason.status_code(),
                        cause,
                    });
                }
            }
        }
    }

    /// Consume one connection's events until it closes.
    async fn pump(
        &self,
        connection: &Arc<dyn Connection>,
        events: &mut mpsc::UnboundedReceiver<Event>,
        messages: &mpsc::UnboundedSender<InboundBatch>,
        attempt: &mut u32,
    ) -> (DisconnectReason, String) {
        while let Some(event) = events.recv().await {
            match event {
                Event::Connection(ConnectionUpdate::Connecting) => {
                    self.observe(ConnectionState::Connecting);
                }
                Event::Connection(ConnectionUpdate::Open { me }) => {
                    *attempt = 0;
                    if let Some(me) = me {
                        info!("logged in as {me}");
                    }
                    self.observe(ConnectionState::Open);
                }
                Event::Connection(ConnectionUpdate::Closed { reason, cause }) => {
                    return (reason, cause);
                }
                Event::Connection(ConnectionUpdate::Qr(code)) => show_qr(&code),
                Event::CredsUpdate(credentials) => {
                    if let Err(e) = self.store.save(&credentials).await {
                        error!("failed to persist credentials: {e}");
                    }
                }
                Event::Messages(upsert) => {
                    let batch = InboundBatch {
                        connection: Arc::clone(connection),
                        upsert,
                    };
                    if messages.send(batch).is_err() {
                        debug!("message dispatcher is gone; dropping batch");
                    }
                }
            }
        }
        (
            DisconnectReason::ConnectionLost,
            "transport event stream ended".to_string(),
        )
    }

    async fn retire(&self, connection: Arc<dyn Connection>) {
        self.current.send_replace(None);
        connection.close().await;
    }

    async fn pause(&self, attempt: u32) {
        let delay = self.retry.delay_for_attempt(attempt);
        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            info!("reconnecting in {delay:?} (attempt {})", attempt + 1);
            tokio::time::sleep(delay).await;
        }
    }

    fn observe(&self, state: ConnectionState) {
        info!("Connection Status: {state}");
        self.state.send_replace(state);
    }
}

fn show_qr(code: &str) {
    match render_qr(code) {
        Ok(rendered) => info!("scan this QR code to pair:\n{rendered}"),
        Err(e) => warn!("could not render pairing code {code}: {e}"),
    }
}
