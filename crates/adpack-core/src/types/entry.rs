//! Extracted archive entry.

use super::ContentKind;
use super::SafePath;

/// A file that survived extraction and screening.
///
/// Entries are never mutated once created; later stages (inlining, storage)
/// derive new data from `content` instead of editing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedEntry {
    /// Normalized path, prefixed by the names of all ancestor archives.
    pub path: SafePath,

    /// Decompressed size in bytes.
    pub size: u64,

    /// Decompressed content.
    pub content: Vec<u8>,

    /// Lower-case hex SHA-256 of `content`.
    pub content_hash: String,

    /// MIME type detected from the content.
    pub mime: String,

    /// Nesting depth of the archive the entry came from (root is 0).
    pub depth: usize,
}

impl ExtractedEntry {
    /// Returns the extension-based kind of this entry.
    #[must_use]
    pub fn kind(&self) -> ContentKind {
        ContentKind::classify(self.path.as_str())
    }

    /// Returns the content as UTF-8 text, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_kind_follows_extension() {
        let entry = ExtractedEntry {
            path: SafePath::normalize("banner/index.html").unwrap(),
            size: 5,
            content: b"<p>x</p>".to_vec(),
            content_hash: String::new(),
            mime: "text/html".to_string(),
            depth: 0,
        };
        assert_eq!(entry.kind(), ContentKind::Html);
        assert_eq!(entry.text(), "<p>x</p>");
    }
}
