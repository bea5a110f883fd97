//! Profile-picture updates.

use log::info;
use thiserror::Error;

use crate::protocol::{build_set_profile_picture, generate_message_id, get_iq_error};
use crate::transport::{Connection, TransportError};

/// Profile update errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("own identity is unknown; the session is not open")]
    NotLoggedIn,
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("profile picture rejected: {0}")]
    Rejected(String),
}

/// Submits profile-picture IQs for the controlling account.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileUpdater;

impl ProfileUpdater {
    pub fn new() -> Self {
        Self
    }

    /// Replace the account's profile picture with `jpeg`.
    ///
    /// The request is addressed to the account's normalized identity.
    pub async fn set_picture(
        &self,
        connection: &dyn Connection,
        jpeg: Vec<u8>,
    ) -> Result<(), ProfileError> {
        let own = connection
            .own_jid()
            .ok_or(ProfileError::NotLoggedIn)?
            .to_normalized();
        let size = jpeg.len();
        let request = build_set_profile_picture(&generate_message_id(), &own, jpeg);

        let response = connection.query(request).await?;
        if let Some(error) = get_iq_error(&response) {
            return Err(ProfileError::Rejected(error));
        }
        info!("profile picture of {own} updated ({size} bytes)");
        Ok(())
    }
}
