/// Kind of media the transport can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
    Animation,
}

/// Media bytes plus the metadata the transport needs to upload them.
#[derive(Clone, Debug)]
pub struct MediaAttachment {
    pub kind: MediaKind,
    pub bytes: Vec<u8>,
    pub filename: String,
}

impl MediaAttachment {
    pub fn new(kind: MediaKind, bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            kind,
            bytes,
            filename: filename.into(),
        }
    }
}

/// One unit of deliverable content. Immutable once constructed.
#[derive(Clone, Debug)]
pub enum Content {
    Text(String),
    Media {
        media: MediaAttachment,
        caption: Option<String>,
        spoiler: bool,
    },
}

impl Content {
    pub fn text(s: impl Into<String>) -> Self {
        Content::Text(s.into())
    }

    /// Blank text or zero-byte media is not deliverable.
    pub fn is_empty(&self) -> bool {
        match self {
            Content::Text(s) => s.trim().is_empty(),
            Content::Media { media, .. } => media.bytes.is_empty(),
        }
    }
}

/// Inline keyboard (callback buttons).
#[derive(Clone, Debug)]
pub struct InlineKeyboard {
    pub buttons: Vec<InlineButton>,
}

#[derive(Clone, Debug)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineKeyboard {
    pub fn single(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            buttons: vec![InlineButton {
                label: label.into(),
                callback_data: callback_data.into(),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_empty() {
        assert!(Content::text("  \n ").is_empty());
        assert!(!Content::text("hi").is_empty());
    }

    #[test]
    fn zero_byte_media_is_empty() {
        let empty = Content::Media {
            media: MediaAttachment::new(MediaKind::Photo, vec![], "p.jpg"),
            caption: None,
            spoiler: false,
        };
        assert!(empty.is_empty());
    }
}
