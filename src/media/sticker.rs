use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::codecs::webp::WebPEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbaImage};
use log::{debug, warn};
use tokio::process::Command;

use super::{MediaConverter, MediaError};

/// Edge length of a sticker canvas in pixels.
pub const STICKER_SIZE: u32 = 512;

const VIDEO_FILTER: &str = "scale=512:512:force_original_aspect_ratio=decrease,fps=15,\
pad=512:512:-1:-1:color=white@0.0,format=rgba";
const MAX_CLIP_SECONDS: &str = "8";

/// Converts stickers locally: still images with the `image` crate, video
/// clips with an `ffmpeg` child process.
#[derive(Debug, Clone)]
pub struct LocalStickerConverter {
    ffmpeg: PathBuf,
    scratch_dir: PathBuf,
}

impl LocalStickerConverter {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            scratch_dir: std::env::temp_dir(),
        }
    }

    /// Directory for ffmpeg's input and output files.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    async fn run_ffmpeg(&self, input: &Path, output: &Path) -> Result<Vec<u8>, MediaError> {
        let result = Command::new(&self.ffmpeg)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-vcodec", "libwebp", "-vf", VIDEO_FILTER])
            .args(["-loop", "0", "-ss", "00:00:00", "-t", MAX_CLIP_SECONDS])
            .args(["-preset", "default", "-an", "-vsync", "0"])
            .arg(output)
            .kill_on_drop(true)
            .output()
            .await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let last = stderr.lines().last().unwrap_or_default().trim().to_string();
            return Err(MediaError::Ffmpeg(format!("{}: {last}", result.status)));
        }
        Ok(tokio::fs::read(output).await?)
    }
}

impl Default for LocalStickerConverter {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

/// Letterbox an image onto a transparent square canvas and encode it as
/// lossless WebP.
pub fn encode_still_sticker(bytes: &[u8], ext: &str) -> Result<Vec<u8>, MediaError> {
    let img = match ImageFormat::from_extension(ext) {
        Some(format) => image::load_from_memory_with_format(bytes, format)?,
        None => image::load_from_memory(bytes)?,
    };
    let fitted = img
        .resize(STICKER_SIZE, STICKER_SIZE, FilterType::Lanczos3)
        .to_rgba8();

    let mut canvas = RgbaImage::new(STICKER_SIZE, STICKER_SIZE);
    let x = (STICKER_SIZE - fitted.width()) / 2;
    let y = (STICKER_SIZE - fitted.height()) / 2;
    imageops::overlay(&mut canvas, &fitted, i64::from(x), i64::from(y));

    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(canvas).write_with_encoder(WebPEncoder::new_lossless(&mut out))?;
    Ok(out.into_inner())
}

#[async_trait]
impl MediaConverter for LocalStickerConverter {
    async fn image_to_sticker(&self, bytes: Vec<u8>, ext: &str) -> Result<Vec<u8>, MediaError> {
        let ext = ext.to_string();
        tokio::task::spawn_blocking(move || encode_still_sticker(&bytes, &ext))
            .await
            .map_err(|e| MediaError::Unsupported(format!("sticker task failed: {e}")))?
    }

    async fn video_to_sticker(&self, bytes: Vec<u8>) -> Result<Vec<u8>, MediaError> {
        // Removed on drop, including when the caller gives up mid-conversion.
        let scratch = tempfile::Builder::new()
            .prefix("sticker-")
            .tempdir_in(&self.scratch_dir)?;
        let input = scratch.path().join("clip.mp4");
        let output = scratch.path().join("clip.webp");

        tokio::fs::write(&input, &bytes).await?;
        debug!("converting {} byte clip with {}", bytes.len(), self.ffmpeg.display());
        let result = self.run_ffmpeg(&input, &output).await;

        if let Err(e) = scratch.close() {
            warn!("failed to remove sticker scratch files: {e}");
        }
        result
    }
}
