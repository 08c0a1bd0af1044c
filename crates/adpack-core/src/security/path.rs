//! Path traversal validation and metadata noise detection.

use crate::Result;
use crate::types::SafePath;

/// Normalizes an archive entry name into a [`SafePath`].
///
/// Backslashes become `/`, leading and duplicate separators are dropped,
/// and any `..` segment is rejected.
///
/// # Errors
///
/// - `IngestError::PathTraversal` for `..`, null bytes or drive prefixes
/// - `IngestError::InvalidArchive` for names that normalize to nothing
///
/// # Examples
///
/// ```
/// use adpack_core::security::normalize_path;
///
/// assert_eq!(normalize_path("/a\\b//c.png")?.as_str(), "a/b/c.png");
/// assert!(normalize_path("../../etc/passwd").is_err());
/// # Ok::<(), adpack_core::IngestError>(())
/// ```
pub fn normalize_path(raw: &str) -> Result<SafePath> {
    SafePath::normalize(raw)
}

/// Returns `true` for OS metadata that is dropped without being reported.
///
/// Covers anything under a `__MACOSX` folder and `.DS_Store` files.
#[must_use]
pub fn is_noise(path: &SafePath) -> bool {
    path.as_str()
        .split('/')
        .any(|segment| segment == "__MACOSX")
        || path.file_name() == ".DS_Store"
}

/// Returns the key used for case-insensitive membership checks.
#[must_use]
pub fn lowercase_key(path: &str) -> String {
    path.to_lowercase()
}
