use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use super::{Handler, HandlerError, Outcome};
use crate::media::{detect, filetype::ext_for_mime, MediaConverter};
use crate::message::{ClassifiedMessage, ContentKind};
use crate::protocol::OutgoingMessage;

/// `s`: turn the image, video or sticker (own or quoted) into a sticker.
pub struct StickerHandler {
    converter: Arc<dyn MediaConverter>,
}

impl StickerHandler {
    pub fn new(converter: Arc<dyn MediaConverter>) -> Self {
        Self { converter }
    }
}

#[async_trait]
impl Handler for StickerHandler {
    fn name(&self) -> &'static str {
        "sticker"
    }

    async fn execute(&self, message: &ClassifiedMessage) -> Result<Outcome, HandlerError> {
        let Some(target) = message.download_target() else {
            return Ok(Outcome::Ignored);
        };
        let kind = target.kind.clone();
        let mimetype = target.media.as_ref().and_then(|m| m.mimetype.clone());
        let Some(bytes) = message.download().await? else {
            return Ok(Outcome::Ignored);
        };

        let sticker = match kind {
            ContentKind::Image => {
                let ext = detect(&bytes)
                    .map(|ty| ty.ext())
                    .or_else(|| mimetype.as_deref().and_then(ext_for_mime))
                    .unwrap_or("jpg");
                self.converter.image_to_sticker(bytes, ext).await?
            }
            ContentKind::Video => self.converter.video_to_sticker(bytes).await?,
            ContentKind::Sticker => bytes,
            ContentKind::Text | ContentKind::Other(_) => return Ok(Outcome::Ignored),
        };

        debug!("sending {} byte sticker to {}", sticker.len(), message.chat);
        let id = message
            .connection()
            .send_message(OutgoingMessage::sticker(message.chat.clone(), sticker))
            .await?;
        Ok(Outcome::Sent(id))
    }
}
