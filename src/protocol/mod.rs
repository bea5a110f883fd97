//! Protocol module: outgoing message and IQ request builders.

mod message;
mod qr;
mod request;

pub use message::{generate_message_id, OutgoingContent, OutgoingMessage};
pub use qr::{render_qr, QRError};
pub use request::{
    build_iq_set, build_set_profile_picture, get_iq_error, is_iq_error, RequestTracker,
    PROFILE_PICTURE_XMLNS,
};
