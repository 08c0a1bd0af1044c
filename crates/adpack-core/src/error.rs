//! Error types for archive ingestion.
//!
//! Request-fatal failures are [`IngestError`]. Per-entry rejections are not
//! errors at all: they are recorded as [`SkipReason`]s and processing continues.

use std::fmt;

use serde::Serialize;
use serde::Serializer;
use thiserror::Error;

/// Result type alias using `IngestError`.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Represents a specific ceiling that was exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaResource {
    /// File count ceiling exceeded.
    FileCount {
        /// Files seen so far, including the rejected one.
        current: usize,
        /// Maximum allowed file count.
        max: usize,
    },
    /// Cumulative extracted size ceiling exceeded.
    TotalSize {
        /// Size the request would have reached in bytes.
        current: u64,
        /// Maximum allowed total size in bytes.
        max: u64,
    },
    /// Single entry size ceiling exceeded.
    FileSize {
        /// Entry size in bytes (may be a lower bound).
        size: u64,
        /// Maximum allowed entry size in bytes.
        max: u64,
    },
    /// Nested archive depth ceiling exceeded.
    Depth {
        /// Depth the nested archive would have been processed at.
        depth: usize,
        /// Maximum allowed depth.
        max: usize,
    },
}

impl fmt::Display for QuotaResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileCount { current, max } => {
                write!(f, "quota exceeded: file count ({current} > {max})")
            }
            Self::TotalSize { current, max } => {
                write!(f, "quota exceeded: total size ({current} > {max})")
            }
            Self::FileSize { size, max } => {
                write!(f, "quota exceeded: single file size ({size} > {max})")
            }
            Self::Depth { depth, max } => {
                write!(f, "quota exceeded: nesting depth ({depth} > {max})")
            }
        }
    }
}

/// Errors that abort a whole ingestion request.
#[derive(Error, Debug)]
pub enum IngestError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input has no End-Of-Central-Directory record.
    #[error("not a ZIP archive: end of central directory record not found")]
    NotZip,

    /// Archive is corrupted or cannot be opened.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// Path traversal attempt detected.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending archive-internal path.
        path: String,
    },

    /// Archive expands far beyond its compressed size.
    #[error(
        "potential zip bomb: compressed={compressed} bytes, uncompressed={uncompressed} bytes (ratio: {ratio:.2})"
    )]
    ZipBomb {
        /// Total compressed size in bytes.
        compressed: u64,
        /// Total uncompressed size in bytes.
        uncompressed: u64,
        /// Expansion ratio.
        ratio: f64,
    },

    /// Encrypted entries present while the policy forbids them.
    #[error("archive contains {} encrypted entries: {}", names.len(), names.join(", "))]
    EncryptedEntries {
        /// Names of every encrypted entry.
        names: Vec<String>,
    },

    /// Encrypted entries present, decryption requested, no password supplied.
    #[error("archive contains encrypted entries but no password was supplied")]
    PasswordRequired,

    /// The storage collaborator failed to persist a file.
    #[error("storage failure for {path}: {reason}")]
    Storage {
        /// Relative path being written.
        path: String,
        /// Collaborator-supplied reason.
        reason: String,
    },
}

impl IngestError {
    /// Returns `true` if this error represents a security violation.
    ///
    /// # Examples
    ///
    /// ```
    /// use adpack_core::IngestError;
    ///
    /// let err = IngestError::PathTraversal {
    ///     path: "../etc/passwd".to_string(),
    /// };
    /// assert!(err.is_security_violation());
    ///
    /// let err = IngestError::NotZip;
    /// assert!(!err.is_security_violation());
    /// ```
    #[must_use]
    pub const fn is_security_violation(&self) -> bool {
        matches!(
            self,
            Self::PathTraversal { .. } | Self::ZipBomb { .. } | Self::EncryptedEntries { .. }
        )
    }

    /// Returns `true` if the failing input could be retried with a different
    /// configuration or credentials.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PathTraversal { .. }
                | Self::EncryptedEntries { .. }
                | Self::PasswordRequired
                | Self::Storage { .. }
        )
    }

    /// Returns a context string for this error, if available.
    ///
    /// # Examples
    ///
    /// ```
    /// use adpack_core::IngestError;
    ///
    /// let err = IngestError::InvalidArchive("bad header".to_string());
    /// assert_eq!(err.context(), Some("bad header"));
    ///
    /// let err = IngestError::NotZip;
    /// assert_eq!(err.context(), None);
    /// ```
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::InvalidArchive(msg) => Some(msg),
            Self::Storage { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// Why a single archive entry was not emitted.
///
/// The `Display` form is the stable wire string used in manifests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Entry name escapes the archive root.
    PathTraversal,
    /// Extension is outside the allow-list.
    DisallowedExtension(String),
    /// File count ceiling reached; remaining entries of the archive abandoned.
    FileCountLimit,
    /// Cumulative size ceiling reached; remaining entries of the archive abandoned.
    TotalSizeLimit,
    /// Entry larger than the per-file ceiling.
    PerFileSizeLimit,
    /// Detected content type is outside the allow-list.
    DisallowedMime(String),
    /// Nested archive beyond the depth ceiling.
    DepthLimit,
    /// Virus scanner returned a non-OK verdict.
    Virus(String),
    /// Identical content already extracted in this request.
    Duplicate,
    /// Entry is encrypted and the policy skips encrypted entries.
    Encrypted,
    /// Decryption with the supplied password failed.
    DecryptFailed,
    /// Entry data could not be decompressed or a nested archive is unreadable.
    CorruptEntry,
    /// Nested archive refused because its overall expansion is suspicious.
    SuspiciousArchive,
}

impl SkipReason {
    /// Returns `true` for reasons that indicate hostile content rather than
    /// a configured limit.
    #[must_use]
    pub const fn is_security_related(&self) -> bool {
        matches!(
            self,
            Self::PathTraversal | Self::Virus(_) | Self::DisallowedMime(_) | Self::SuspiciousArchive
        )
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PathTraversal => f.write_str("path-traversal"),
            Self::DisallowedExtension(ext) => write!(f, "disallowed-extension:{ext}"),
            Self::FileCountLimit => f.write_str("file-count-limit"),
            Self::TotalSizeLimit => f.write_str("total-size-limit"),
            Self::PerFileSizeLimit => f.write_str("per-file-size-limit"),
            Self::DisallowedMime(mime) => write!(f, "disallowed-mime:{mime}"),
            Self::DepthLimit => f.write_str("depth-limit"),
            Self::Virus(verdict) => write!(f, "virus:{verdict}"),
            Self::Duplicate => f.write_str("duplicate"),
            Self::Encrypted => f.write_str("encrypted"),
            Self::DecryptFailed => f.write_str("decrypt-failed"),
            Self::CorruptEntry => f.write_str("corrupt-entry"),
            Self::SuspiciousArchive => f.write_str("suspicious-archive"),
        }
    }
}

impl Serialize for SkipReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IngestError::NotZip;
        assert!(err.to_string().contains("not a ZIP archive"));
    }

    #[test]
    fn test_path_traversal_error() {
        let err = IngestError::PathTraversal {
            path: "../etc/passwd".into(),
        };
        assert!(err.to_string().contains("path traversal"));
        assert!(err.to_string().contains("../etc/passwd"));
        assert!(err.is_security_violation());
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_encrypted_entries_lists_every_name() {
        let err = IngestError::EncryptedEntries {
            names: vec!["a/secret.html".into(), "b.png".into()],
        };
        let display = err.to_string();
        assert!(display.contains("2 encrypted entries"));
        assert!(display.contains("a/secret.html"));
        assert!(display.contains("b.png"));
    }

    #[test]
    fn test_zip_bomb_not_recoverable() {
        let err = IngestError::ZipBomb {
            compressed: 1000,
            uncompressed: 1_000_000,
            ratio: 1000.0,
        };
        assert!(err.to_string().contains("zip bomb"));
        assert!(err.is_security_violation());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: IngestError = io_err.into();
        assert!(matches!(err, IngestError::Io(_)));
    }

    #[test]
    fn test_context() {
        let err = IngestError::Storage {
            path: "a/index.html".into(),
            reason: "disk full".into(),
        };
        assert_eq!(err.context(), Some("disk full"));
        assert_eq!(IngestError::PasswordRequired.context(), None);
    }

    #[test]
    fn test_skip_reason_wire_strings() {
        assert_eq!(SkipReason::FileCountLimit.to_string(), "file-count-limit");
        assert_eq!(SkipReason::TotalSizeLimit.to_string(), "total-size-limit");
        assert_eq!(SkipReason::PerFileSizeLimit.to_string(), "per-file-size-limit");
        assert_eq!(
            SkipReason::DisallowedMime("application/x-msdownload".into()).to_string(),
            "disallowed-mime:application/x-msdownload"
        );
        assert_eq!(SkipReason::Virus("EICAR".into()).to_string(), "virus:EICAR");
        assert_eq!(SkipReason::DepthLimit.to_string(), "depth-limit");
        assert_eq!(SkipReason::Encrypted.to_string(), "encrypted");
    }

    #[test]
    fn test_skip_reason_serializes_as_string() {
        let json = serde_json::to_string(&SkipReason::Duplicate).unwrap();
        assert_eq!(json, "\"duplicate\"");
    }

    #[test]
    fn test_quota_resource_display() {
        let quota = QuotaResource::Depth { depth: 4, max: 3 };
        assert_eq!(quota.to_string(), "quota exceeded: nesting depth (4 > 3)");
    }
}
