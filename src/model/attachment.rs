//! File parts carried by an inbound email.

/// Fallback media type when a part does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A decoded file part of an email (or the synthesized archive document).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailPart {
    /// Filename as declared by the sender. Generated if missing from the headers.
    pub filename: String,

    /// MIME content type (e.g. `"image/png"`, `"application/pdf"`).
    pub content_type: String,

    /// Decoded content.
    pub content: Vec<u8>,

    /// Content-ID for inline parts referenced from HTML (`cid:`).
    pub content_id: Option<String>,
}

impl EmailPart {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            content: content.into(),
            content_id: None,
        }
    }

    /// Decoded size in bytes.
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    /// `true` if the top-level media type is `image`.
    pub fn is_image(&self) -> bool {
        is_image_type(&self.content_type)
    }
}

/// `true` if the top-level type of `content_type` is `image`.
pub fn is_image_type(content_type: &str) -> bool {
    content_type
        .split('/')
        .next()
        .is_some_and(|top| top.trim().eq_ignore_ascii_case("image"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image_type() {
        assert!(is_image_type("image/png"));
        assert!(is_image_type("IMAGE/JPEG; name=x.jpg"));
        assert!(!is_image_type("application/pdf"));
        assert!(!is_image_type("text/plain"));
        assert!(!is_image_type(""));
    }

    #[test]
    fn test_size() {
        let part = EmailPart::new("a.bin", DEFAULT_CONTENT_TYPE, vec![0u8; 42]);
        assert_eq!(part.size(), 42);
        assert!(!part.is_image());
    }
}
