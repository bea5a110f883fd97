use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use super::{Handler, HandlerError, Outcome};
use crate::media::{detect, ImageResizer};
use crate::message::ClassifiedMessage;
use crate::profile::ProfileUpdater;

/// Size used by `setpp`.
pub const SQUARE_AVATAR_SIZE: (u32, u32) = (720, 720);
/// Size used by `setppfull`.
pub const FULL_AVATAR_SIZE: (u32, u32) = (1280, 720);

/// `setpp` / `setppfull`: make the image (own or quoted) the profile picture.
pub struct AvatarHandler {
    name: &'static str,
    resizer: Arc<dyn ImageResizer>,
    profile: ProfileUpdater,
    width: u32,
    height: u32,
}

impl AvatarHandler {
    pub fn new(
        name: &'static str,
        resizer: Arc<dyn ImageResizer>,
        profile: ProfileUpdater,
        (width, height): (u32, u32),
    ) -> Self {
        Self {
            name,
            resizer,
            profile,
            width,
            height,
        }
    }

    /// `setpp`: 720×720.
    pub fn square(resizer: Arc<dyn ImageResizer>, profile: ProfileUpdater) -> Self {
        Self::new("setpp", resizer, profile, SQUARE_AVATAR_SIZE)
    }

    /// `setppfull`: 1280×720.
    pub fn full(resizer: Arc<dyn ImageResizer>, profile: ProfileUpdater) -> Self {
        Self::new("setppfull", resizer, profile, FULL_AVATAR_SIZE)
    }
}

#[async_trait]
impl Handler for AvatarHandler {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn execute(&self, message: &ClassifiedMessage) -> Result<Outcome, HandlerError> {
        let Some(bytes) = message.download().await? else {
            return Ok(Outcome::Ignored);
        };
        if !detect(&bytes).is_some_and(|ty| ty.is_image()) {
            debug!("{}: downloaded media is not an image", self.name());
            return Ok(Outcome::Ignored);
        }

        let jpeg = self.resizer.resize(bytes, self.width, self.height).await?;
        self.profile
            .set_picture(message.connection().as_ref(), jpeg)
            .await?;
        Ok(Outcome::ProfileUpdated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::AttrValue;
    use crate::media::JpegResizer;
    use crate::test_support::{
        classified, media_content, own_jid, png_bytes, quoting, text_content, FakeConnection,
    };

    fn setpp() -> AvatarHandler {
        AvatarHandler::square(Arc::new(JpegResizer::default()), ProfileUpdater::new())
    }

    #[tokio::test]
    async fn test_wide_image_is_cropped_and_submitted() {
        let connection = Arc::new(FakeConnection::new().with_media(png_bytes(1000, 500)));
        let message = classified(
            &connection,
            true,
            quoting(text_content("setpp"), media_content("imageMessage", "image/png")),
        );

        let outcome = setpp().execute(&message).await.unwrap();

        assert_eq!(outcome, Outcome::ProfileUpdated);
        let queries = connection.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].attrs.get("to"), Some(&AttrValue::JID(own_jid())));
        let jpeg = queries[0]
            .get_child_by_tag("picture")
            .and_then(|p| p.get_bytes())
            .unwrap();
        let decoded = image::load_from_memory(jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (720, 720));
    }

    #[tokio::test]
    async fn test_full_variant_uses_landscape_size() {
        let connection = Arc::new(FakeConnection::new().with_media(png_bytes(300, 300)));
        let handler = AvatarHandler::full(Arc::new(JpegResizer::default()), ProfileUpdater::new());
        let mut content = media_content("imageMessage", "image/png");
        content.caption = Some("setppfull".into());
        let message = classified(&connection, true, content);

        handler.execute(&message).await.unwrap();

        let queries = connection.queries();
        let jpeg = queries[0]
            .get_child_by_tag("picture")
            .and_then(|p| p.get_bytes())
            .unwrap();
        let decoded = image::load_from_memory(jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (1280, 720));
    }

    #[tokio::test]
    async fn test_nothing_to_download_is_ignored() {
        let connection = Arc::new(FakeConnection::new());
        let message = classified(&connection, true, text_content("setpp"));

        assert_eq!(setpp().execute(&message).await.unwrap(), Outcome::Ignored);
        assert!(connection.queries().is_empty());
    }

    #[tokio::test]
    async fn test_non_image_media_is_ignored() {
        let connection =
            Arc::new(FakeConnection::new().with_media(b"\0\0\0\x18ftypmp42".to_vec()));
        let message = classified(
            &connection,
            true,
            quoting(text_content("setpp"), media_content("videoMessage", "video/mp4")),
        );

        assert_eq!(setpp().execute(&message).await.unwrap(), Outcome::Ignored);
        assert!(connection.queries().is_empty());
    }
}
