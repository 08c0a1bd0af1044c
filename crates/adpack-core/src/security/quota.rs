//! Request-scoped ceiling tracking.

use crate::IngestConfig;
use crate::error::QuotaResource;

/// Tracks file count and cumulative bytes across one ingestion request.
///
/// Every nested archive of the request shares the same tracker, so the
/// ceilings apply to the upload as a whole.
#[derive(Debug, Default)]
pub struct QuotaTracker {
    files_seen: usize,
    bytes_extracted: u64,
}

impl QuotaTracker {
    /// Creates a new quota tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one more file before it is decompressed.
    ///
    /// # Errors
    ///
    /// Returns the exceeded resource once the count passes `max_file_count`.
    pub fn admit_file(&mut self, config: &IngestConfig) -> Result<(), QuotaResource> {
        self.files_seen += 1;
        if self.files_seen > config.max_file_count {
            return Err(QuotaResource::FileCount {
                current: self.files_seen,
                max: config.max_file_count,
            });
        }
        Ok(())
    }

    /// Checks a single entry's decompressed size.
    ///
    /// # Errors
    ///
    /// Returns the exceeded resource if `size` is above `max_file_size`.
    pub fn check_file_size(size: u64, config: &IngestConfig) -> Result<(), QuotaResource> {
        if size > config.max_file_size {
            return Err(QuotaResource::FileSize {
                size,
                max: config.max_file_size,
            });
        }
        Ok(())
    }

    /// Adds decompressed bytes to the running total.
    ///
    /// The total is left unchanged when the ceiling would be crossed.
    ///
    /// # Errors
    ///
    /// Returns the exceeded resource if the total would pass `max_total_size`.
    pub fn record_bytes(&mut self, size: u64, config: &IngestConfig) -> Result<(), QuotaResource> {
        let total = self.bytes_extracted.saturating_add(size);
        if total > config.max_total_size {
            return Err(QuotaResource::TotalSize {
                current: total,
                max: config.max_total_size,
            });
        }
        self.bytes_extracted = total;
        Ok(())
    }

    /// Returns the number of files counted so far.
    #[must_use]
    pub fn files_seen(&self) -> usize {
        self.files_seen
    }

    /// Returns the cumulative decompressed bytes.
    #[must_use]
    pub fn bytes_extracted(&self) -> u64 {
        self.bytes_extracted
    }
}

/// Checks whether a nested archive found at `depth` may be expanded.
///
/// # Errors
///
/// Returns the exceeded resource if the archive's contents would sit deeper
/// than `max_depth`.
pub fn check_depth(depth: usize, config: &IngestConfig) -> Result<(), QuotaResource> {
    if depth >= config.max_depth {
        return Err(QuotaResource::Depth {
            depth: depth + 1,
            max: config.max_depth,
        });
    }
    Ok(())
}
