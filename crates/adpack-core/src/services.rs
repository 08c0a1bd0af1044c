//! External collaborators consumed by the ingestion pipeline.
//!
//! Virus scanning, thumbnail generation and byte storage live outside this
//! crate. The pipeline only talks to them through the traits below.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;
use std::sync::PoisonError;

use async_trait::async_trait;

use crate::types::ContentKind;

/// Verdict returned by a [`VirusScanner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanVerdict {
    /// Content is clean.
    Ok,
    /// The scanner backend could not be reached.
    Unavailable,
    /// Any other verdict, usually a signature name.
    Rejected(String),
}

impl ScanVerdict {
    /// Parses the scanner's wire verdict (`OK`, `UNAVAILABLE` or anything else).
    #[must_use]
    pub fn parse(verdict: &str) -> Self {
        match verdict.trim() {
            "OK" => Self::Ok,
            "UNAVAILABLE" => Self::Unavailable,
            other => Self::Rejected(other.to_string()),
        }
    }

    /// Returns `true` only for a clean verdict.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for ScanVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("OK"),
            Self::Unavailable => f.write_str("UNAVAILABLE"),
            Self::Rejected(verdict) => f.write_str(verdict),
        }
    }
}

/// Scans extracted content for malware.
#[async_trait]
pub trait VirusScanner: Send + Sync {
    /// Scans `bytes` and returns a verdict.
    async fn scan(&self, bytes: &[u8]) -> ScanVerdict;
}

/// Produces thumbnail or rendered previews.
#[async_trait]
pub trait PreviewGenerator: Send + Sync {
    /// Returns preview image bytes, or `None` when no preview can be made.
    async fn make_preview(&self, bytes: &[u8], kind: ContentKind) -> Option<Vec<u8>>;
}

/// Persists creative files keyed by upload id and relative path.
#[async_trait]
pub trait CreativeStore: Send + Sync {
    /// Stores `bytes` under `upload_id/relative_path`.
    async fn put(&self, upload_id: &str, relative_path: &str, bytes: &[u8]) -> std::io::Result<()>;
}

/// Scanner that accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopScanner;

#[async_trait]
impl VirusScanner for NoopScanner {
    async fn scan(&self, _bytes: &[u8]) -> ScanVerdict {
        ScanVerdict::Ok
    }
}

/// Preview generator that never produces previews.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPreviews;

#[async_trait]
impl PreviewGenerator for NoPreviews {
    async fn make_preview(&self, _bytes: &[u8], _kind: ContentKind) -> Option<Vec<u8>> {
        None
    }
}

/// In-memory store, mostly useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<BTreeMap<(String, String), Vec<u8>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the bytes stored at `upload_id/relative_path`.
    #[must_use]
    pub fn get(&self, upload_id: &str, relative_path: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(upload_id.to_string(), relative_path.to_string()))
            .cloned()
    }

    /// Returns every relative path stored for `upload_id`, sorted.
    #[must_use]
    pub fn paths(&self, upload_id: &str) -> Vec<String> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|(id, _)| id == upload_id)
            .map(|(_, path)| path.clone())
            .collect()
    }
}

#[async_trait]
impl CreativeStore for MemoryStore {
    async fn put(&self, upload_id: &str, relative_path: &str, bytes: &[u8]) -> std::io::Result<()> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((upload_id.to_string(), relative_path.to_string()), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_verdict_parse() {
        assert_eq!(ScanVerdict::parse("OK"), ScanVerdict::Ok);
        assert_eq!(ScanVerdict::parse("UNAVAILABLE"), ScanVerdict::Unavailable);
        assert_eq!(
            ScanVerdict::parse("Eicar-Test-Signature"),
            ScanVerdict::Rejected("Eicar-Test-Signature".into())
        );
        assert_eq!(ScanVerdict::Unavailable.to_string(), "UNAVAILABLE");
        assert!(!ScanVerdict::Unavailable.is_ok());
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        store.put("u1", "banner/index.html", b"<p>x</p>").await.unwrap();
        store.put("u2", "other.png", b"png").await.unwrap();
        assert_eq!(store.get("u1", "banner/index.html").unwrap(), b"<p>x</p>");
        assert_eq!(store.paths("u1"), vec!["banner/index.html"]);
        assert!(store.get("u1", "other.png").is_none());
    }

    #[tokio::test]
    async fn test_noop_collaborators() {
        assert!(NoopScanner.scan(b"anything").await.is_ok());
        assert!(NoPreviews.make_preview(b"x", ContentKind::Image).await.is_none());
    }
}
