//! Extension-based content classification.

use serde::Serialize;

/// Likely content of an archive entry, judged from its extension.
///
/// Every extension-based decision in the crate goes through
/// [`ContentKind::classify`] and is consumed by pattern matching.
///
/// # Examples
///
/// ```
/// use adpack_core::types::ContentKind;
///
/// assert_eq!(ContentKind::classify("banner/INDEX.HTM"), ContentKind::Html);
/// assert_eq!(ContentKind::classify("logo.webp"), ContentKind::Image);
/// assert_eq!(ContentKind::classify("copy.txt"), ContentKind::Text);
/// assert_eq!(ContentKind::classify("styles.css"), ContentKind::Other);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// HTML document.
    Html,
    /// Raster or vector image.
    Image,
    /// Plain text.
    Text,
    /// Anything else (stylesheets, fonts, data, nested archives).
    Other,
}

const HTML_EXTENSIONS: &[&str] = &["html", "htm"];
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg", "bmp", "ico", "avif"];
const TEXT_EXTENSIONS: &[&str] = &["txt"];

impl ContentKind {
    /// Classifies a path by its extension.
    #[must_use]
    pub fn classify(path: &str) -> Self {
        extension_of(path).map_or(Self::Other, |ext| Self::from_extension(&ext))
    }

    /// Classifies a lower-cased extension (without dot).
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        if HTML_EXTENSIONS.contains(&ext) {
            Self::Html
        } else if IMAGE_EXTENSIONS.contains(&ext) {
            Self::Image
        } else if TEXT_EXTENSIONS.contains(&ext) {
            Self::Text
        } else {
            Self::Other
        }
    }
}

/// Returns the lower-cased extension of the last path segment.
#[must_use]
pub fn extension_of(path: &str) -> Option<String> {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match name.rfind('.') {
        Some(dot) if dot > 0 && dot + 1 < name.len() => Some(name[dot + 1..].to_ascii_lowercase()),
        _ => None,
    }
}
