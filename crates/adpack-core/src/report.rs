//! Extraction reporting.

use std::time::Duration;

use serde::Serialize;

use crate::SkipReason;
use crate::types::ExtractedEntry;
use crate::types::SafePath;

/// One entry that was not emitted, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    /// Archive-internal path, prefixed by ancestor archives.
    ///
    /// Rejected traversal paths are reported raw since they never normalize.
    pub path: String,
    /// Why the entry was dropped.
    pub reason: SkipReason,
}

/// An entry dropped as a duplicate, pointing at the emitted entry with the
/// same content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateEntry {
    /// Path of the dropped entry.
    pub path: SafePath,
    /// Index into [`ExtractionReport::entries`] of the retained entry.
    pub original: usize,
}

/// Result of extracting an upload and all nested archives.
///
/// Holds every safe entry in discovery order together with everything that
/// was rejected along the way.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    /// Safe entries, breadth-first across nesting levels.
    pub entries: Vec<ExtractedEntry>,

    /// Rejected entries.
    pub skipped: Vec<SkippedEntry>,

    /// Duplicates, also listed in `skipped`, so references to them can still
    /// be resolved against the retained copy.
    pub duplicates: Vec<DuplicateEntry>,

    /// Non-fatal observations (suspicious expansion, abandoned archives).
    pub warnings: Vec<String>,

    /// Number of archives opened, including the upload itself.
    pub archives_opened: usize,

    /// Deepest nesting level that was expanded.
    pub max_depth_reached: usize,

    /// Cumulative decompressed bytes, nested archive bodies included.
    pub bytes_extracted: u64,

    /// Duration of the extraction.
    pub duration: Duration,
}

impl ExtractionReport {
    /// Creates a new empty extraction report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a rejected entry.
    pub fn skip(&mut self, path: impl Into<String>, reason: SkipReason) {
        self.skipped.push(SkippedEntry {
            path: path.into(),
            reason,
        });
    }

    /// Records a duplicate of the entry at `original`.
    pub fn duplicate(&mut self, path: SafePath, original: usize) {
        self.skip(path.as_str(), SkipReason::Duplicate);
        self.duplicates.push(DuplicateEntry { path, original });
    }

    /// Returns the retained entry for a recorded duplicate.
    #[must_use]
    pub fn original_of(&self, duplicate: &DuplicateEntry) -> Option<&ExtractedEntry> {
        self.entries.get(duplicate.original)
    }

    /// Adds a warning message to the report.
    pub fn add_warning(&mut self, message: String) {
        self.warnings.push(message);
    }

    /// Returns whether any warnings were generated.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
