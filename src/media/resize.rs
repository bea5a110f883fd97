use std::io::Cursor;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

use super::{ImageResizer, MediaError};

/// Region of the source kept before scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Largest centered region of a `width`×`height` image with the aspect
/// ratio of `target_width`×`target_height`.
pub fn crop_region(width: u32, height: u32, target_width: u32, target_height: u32) -> CropRegion {
    let (w, h) = (u64::from(width), u64::from(height));
    let (tw, th) = (u64::from(target_width.max(1)), u64::from(target_height.max(1)));

    if w * th > h * tw {
        let crop_w = (h * tw / th).max(1);
        CropRegion {
            x: ((w - crop_w) / 2) as u32,
            y: 0,
            width: crop_w as u32,
            height,
        }
    } else {
        let crop_h = (w * th / tw).max(1).min(h);
        CropRegion {
            x: 0,
            y: ((h - crop_h) / 2) as u32,
            width,
            height: crop_h as u32,
        }
    }
}

/// Center-crops to the target aspect ratio, scales to the exact target
/// size and re-encodes as JPEG.
#[derive(Debug, Clone, Copy)]
pub struct JpegResizer {
    quality: u8,
}

impl JpegResizer {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    /// Synchronous core of [`ImageResizer::resize`].
    pub fn resize_blocking(
        &self,
        bytes: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, MediaError> {
        if width == 0 || height == 0 {
            return Err(MediaError::Unsupported(format!(
                "target size {width}x{height}"
            )));
        }
        let img = image::load_from_memory(bytes)?;
        let region = crop_region(img.width(), img.height(), width, height);
        let cropped = img.crop_imm(region.x, region.y, region.width, region.height);
        let scaled = cropped.resize_exact(width, height, FilterType::Lanczos3);

        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(scaled.to_rgb8())
            .write_with_encoder(JpegEncoder::new_with_quality(&mut out, self.quality))?;
        Ok(out.into_inner())
    }
}

impl Default for JpegResizer {
    fn default() -> Self {
        Self::new(90)
    }
}

#[async_trait]
impl ImageResizer for JpegResizer {
    async fn resize(&self, bytes: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>, MediaError> {
        let resizer = *self;
        tokio::task::spawn_blocking(move || resizer.resize_blocking(&bytes, width, height))
            .await
            .map_err(|e| MediaError::Unsupported(format!("resize task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::png_bytes;

    #[test]
    fn test_wide_source_is_cropped_horizontally() {
        assert_eq!(
            crop_region(1000, 500, 720, 720),
            CropRegion { x: 250, y: 0, width: 500, height: 500 }
        );
    }

    #[test]
    fn test_tall_source_is_cropped_vertically() {
        assert_eq!(
            crop_region(720, 1000, 1280, 720),
            CropRegion { x: 0, y: 297, width: 720, height: 405 }
        );
    }

    #[test]
    fn test_matching_ratio_keeps_everything() {
        assert_eq!(
            crop_region(2560, 1440, 1280, 720),
            CropRegion { x: 0, y: 0, width: 2560, height: 1440 }
        );
    }

    #[tokio::test]
    async fn test_output_is_jpeg_of_exact_size() {
        let resizer = JpegResizer::default();
        let jpeg = resizer.resize(png_bytes(1000, 500), 720, 720).await.unwrap();

        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (720, 720));
        assert_eq!(crate::media::detect(&jpeg), Some(crate::media::FileType::Jpeg));
    }

    #[test]
    fn test_rejects_non_images() {
        let resizer = JpegResizer::default();
        assert!(resizer.resize_blocking(b"not an image", 720, 720).is_err());
    }
}
