//! Binary file type detection from magic numbers.

use image::ImageFormat;

const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

/// File types the bot knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Jpeg,
    Png,
    Gif,
    WebP,
    Bmp,
    Mp4,
    Webm,
}

impl FileType {
    pub fn ext(&self) -> &'static str {
        match self {
            FileType::Jpeg => "jpg",
            FileType::Png => "png",
            FileType::Gif => "gif",
            FileType::WebP => "webp",
            FileType::Bmp => "bmp",
            FileType::Mp4 => "mp4",
            FileType::Webm => "webm",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            FileType::Jpeg => "image/jpeg",
            FileType::Png => "image/png",
            FileType::Gif => "image/gif",
            FileType::WebP => "image/webp",
            FileType::Bmp => "image/bmp",
            FileType::Mp4 => "video/mp4",
            FileType::Webm => "video/webm",
        }
    }

    pub fn is_image(&self) -> bool {
        !self.is_video()
    }

    pub fn is_video(&self) -> bool {
        matches!(self, FileType::Mp4 | FileType::Webm)
    }
}

/// Detect the type of `bytes`, or `None` if unrecognized.
pub fn detect(bytes: &[u8]) -> Option<FileType> {
    if bytes.get(4..8) == Some(b"ftyp".as_slice()) {
        return Some(FileType::Mp4);
    }
    if bytes.starts_with(&EBML_MAGIC) {
        return Some(FileType::Webm);
    }
    match image::guess_format(bytes).ok()? {
        ImageFormat::Jpeg => Some(FileType::Jpeg),
        ImageFormat::Png => Some(FileType::Png),
        ImageFormat::Gif => Some(FileType::Gif),
        ImageFormat::WebP => Some(FileType::WebP),
        ImageFormat::Bmp => Some(FileType::Bmp),
        _ => None,
    }
}

/// Extension for a mimetype such as `image/png`.
pub fn ext_for_mime(mimetype: &str) -> Option<&'static str> {
    let essence = mimetype.split(';').next().unwrap_or_default().trim();
    [
        FileType::Jpeg,
        FileType::Png,
        FileType::Gif,
        FileType::WebP,
        FileType::Bmp,
        FileType::Mp4,
        FileType::Webm,
    ]
    .into_iter()
    .find(|ty| ty.mime() == essence)
    .map(|ty| ty.ext())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_images_by_magic() {
        assert_eq!(detect(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0]), Some(FileType::Jpeg));
        assert_eq!(
            detect(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"),
            Some(FileType::Png)
        );
        assert_eq!(detect(b"GIF89a\x01\0\x01\0"), Some(FileType::Gif));
        assert_eq!(detect(b"RIFF\0\0\0\0WEBPVP8 "), Some(FileType::WebP));
    }

    #[test]
    fn test_detects_videos_by_magic() {
        assert_eq!(detect(b"\0\0\0\x18ftypmp42"), Some(FileType::Mp4));
        assert_eq!(detect(&[0x1A, 0x45, 0xDF, 0xA3, 0x9F]), Some(FileType::Webm));
        assert!(FileType::Mp4.is_video());
        assert!(!FileType::Mp4.is_image());
    }

    #[test]
    fn test_unknown_bytes_are_undetected() {
        assert_eq!(detect(b"hello world"), None);
        assert_eq!(detect(&[]), None);
    }

    #[test]
    fn test_maps_mimetypes_to_extensions() {
        assert_eq!(ext_for_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_for_mime("video/mp4; codecs=avc1"), Some("mp4"));
        assert_eq!(ext_for_mime("application/pdf"), None);
    }
}
