//! QR rendering for pairing codes reported by the transport.

use qrcode::{render::unicode, QrCode};
use thiserror::Error;

/// QR code errors.
#[derive(Debug, Clone, Error)]
pub enum QRError {
    #[error("QR generation failed: {0}")]
    GenerationFailed(String),
}

/// Render a pairing code as terminal block characters.
pub fn render_qr(data: &str) -> Result<String, QRError> {
    let code =
        QrCode::new(data.as_bytes()).map_err(|e| QRError::GenerationFailed(e.to_string()))?;

    Ok(code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .build())
}
