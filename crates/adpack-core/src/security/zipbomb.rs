//! Zip bomb detection.

use crate::IngestError;
use crate::Result;
use crate::inspection::PreviewResult;

/// Returns `uncompressed / max(1, compressed)`.
#[must_use]
pub fn expansion_ratio(compressed: u64, uncompressed: u64) -> f64 {
    uncompressed as f64 / compressed.max(1) as f64
}

/// Refuses archives whose overall expansion was flagged by the previewer.
///
/// # Errors
///
/// Returns `IngestError::ZipBomb` if the preview raised the overall signal.
pub fn validate_preview(preview: &PreviewResult) -> Result<()> {
    if !preview.suspicious.high_overall_expansion {
        return Ok(());
    }

    Err(IngestError::ZipBomb {
        compressed: preview.totals.compressed_bytes,
        uncompressed: preview.totals.uncompressed_bytes,
        ratio: preview.totals.expansion(),
    })
}
