use std::fmt;

/// Content kind of a classified message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Image,
    Video,
    Sticker,
    /// Any other tag, kept verbatim.
    Other(String),
}

impl ContentKind {
    /// Map a transport content-type tag. An unset tag reads as text.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            None | Some("conversation") | Some("extendedTextMessage") => ContentKind::Text,
            Some("imageMessage") => ContentKind::Image,
            Some("videoMessage") => ContentKind::Video,
            Some("stickerMessage") => ContentKind::Sticker,
            Some(other) => ContentKind::Other(other.to_string()),
        }
    }

    /// Whether the kind carries downloadable media.
    pub fn is_media(&self) -> bool {
        matches!(
            self,
            ContentKind::Image | ContentKind::Video | ContentKind::Sticker
        )
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Text => write!(f, "text"),
            ContentKind::Image => write!(f, "image"),
            ContentKind::Video => write!(f, "video"),
            ContentKind::Sticker => write!(f, "sticker"),
            ContentKind::Other(tag) => write!(f, "{tag}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_known_tags() {
        assert_eq!(ContentKind::from_tag(Some("imageMessage")), ContentKind::Image);
        assert_eq!(ContentKind::from_tag(Some("videoMessage")), ContentKind::Video);
        assert_eq!(ContentKind::from_tag(Some("stickerMessage")), ContentKind::Sticker);
        assert_eq!(ContentKind::from_tag(Some("conversation")), ContentKind::Text);
        assert_eq!(ContentKind::from_tag(Some("extendedTextMessage")), ContentKind::Text);
        assert_eq!(ContentKind::from_tag(None), ContentKind::Text);
    }

    #[test]
    fn test_unknown_tags_are_kept() {
        let kind = ContentKind::from_tag(Some("audioMessage"));
        assert_eq!(kind, ContentKind::Other("audioMessage".into()));
        assert!(!kind.is_media());
        assert_eq!(kind.to_string(), "audioMessage");
    }
}
