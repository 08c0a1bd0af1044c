//! Validated archive-internal path type.

use std::fmt;

use serde::Serialize;
use serde::Serializer;

use crate::IngestError;
use crate::Result;

use super::content_kind::extension_of;

/// A normalized archive-internal path that is safe to use as a key.
///
/// `SafePath` represents a path that:
/// - uses `/` as the only separator
/// - has no leading `/`, no drive prefix and no empty or `.` segments
/// - contains no `..` segment
/// - contains no null bytes
///
/// # Security Properties
///
/// - Can ONLY be constructed through [`SafePath::normalize`] or by joining two
///   existing `SafePath`s
/// - NO `From<String>` implementation
///
/// # Examples
///
/// ```
/// use adpack_core::types::SafePath;
///
/// let path = SafePath::normalize("\\banner\\\\img//logo.png")?;
/// assert_eq!(path.as_str(), "banner/img/logo.png");
///
/// assert!(SafePath::normalize("../../etc/passwd").is_err());
/// # Ok::<(), adpack_core::IngestError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SafePath(String);

impl SafePath {
    /// Normalizes a raw entry name and rejects traversal attempts.
    ///
    /// # Errors
    ///
    /// - `IngestError::PathTraversal` if the path contains a `..` segment,
    ///   a null byte or a drive prefix
    /// - `IngestError::InvalidArchive` if nothing remains after normalization
    pub fn normalize(raw: &str) -> Result<Self> {
        if raw.contains('\0') {
            return Err(IngestError::PathTraversal {
                path: raw.replace('\0', "\\0"),
            });
        }

        let unified = raw.replace('\\', "/");
        let mut segments = Vec::new();

        for (index, segment) in unified.split('/').enumerate() {
            match segment {
                "" | "." => {}
                ".." => {
                    return Err(IngestError::PathTraversal {
                        path: raw.to_string(),
                    });
                }
                // `C:` style prefixes are absolute on Windows
                s if index == 0 && s.len() == 2 && s.ends_with(':') => {
                    return Err(IngestError::PathTraversal {
                        path: raw.to_string(),
                    });
                }
                s => segments.push(s),
            }
        }

        if segments.is_empty() {
            return Err(IngestError::InvalidArchive(format!(
                "entry path '{raw}' is empty after normalization"
            )));
        }

        Ok(Self(segments.join("/")))
    }

    /// Returns this path nested under `base`.
    ///
    /// Joining two normalized paths cannot introduce traversal, so no
    /// validation is repeated.
    #[must_use]
    pub fn nested_under(&self, base: Option<&Self>) -> Self {
        match base {
            Some(base) => Self(format!("{}/{}", base.0, self.0)),
            None => self.clone(),
        }
    }

    /// Returns the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the last path segment.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Returns the file name without its final extension.
    #[must_use]
    pub fn file_stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(dot) if dot > 0 => &name[..dot],
            _ => name,
        }
    }

    /// Returns this path with the final extension removed from its file name.
    #[must_use]
    pub fn with_extension_stripped(&self) -> Self {
        let stem_len = self.0.len() - self.file_name().len() + self.file_stem().len();
        Self(self.0[..stem_len].to_string())
    }

    /// Returns the lower-cased extension without the dot, if any.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.0)
    }

    /// Returns the parent directory (empty for top-level entries).
    #[must_use]
    pub fn parent(&self) -> &str {
        self.0.rfind('/').map_or("", |slash| &self.0[..slash])
    }

    /// Returns the first path segment when the path has a directory part.
    #[must_use]
    pub fn top_level_dir(&self) -> Option<&str> {
        self.0.find('/').map(|slash| &self.0[..slash])
    }

    /// Returns the lower-cased key used for case-insensitive lookups.
    #[must_use]
    pub fn lowercase_key(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Display for SafePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SafePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for SafePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
