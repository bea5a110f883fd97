//! Media conversion: sticker encoding, profile-picture resizing and file
//! type detection.

pub mod filetype;
mod resize;
mod sticker;

use async_trait::async_trait;
use thiserror::Error;

pub use filetype::{detect, FileType};
pub use resize::{crop_region, CropRegion, JpegResizer};
pub use sticker::{LocalStickerConverter, STICKER_SIZE};

/// Media conversion errors.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("media I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("ffmpeg failed: {0}")]
    Ffmpeg(String),
    #[error("unsupported media: {0}")]
    Unsupported(String),
}

/// Converts user media into WebP stickers.
#[async_trait]
pub trait MediaConverter: Send + Sync {
    /// Convert a still image; `ext` is the detected extension.
    async fn image_to_sticker(&self, bytes: Vec<u8>, ext: &str) -> Result<Vec<u8>, MediaError>;

    /// Convert a short video clip into an animated sticker.
    async fn video_to_sticker(&self, bytes: Vec<u8>) -> Result<Vec<u8>, MediaError>;
}

/// Produces profile pictures.
#[async_trait]
pub trait ImageResizer: Send + Sync {
    /// Fit `bytes` into exactly `width`×`height` and encode as JPEG.
    async fn resize(&self, bytes: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>, MediaError>;
}
