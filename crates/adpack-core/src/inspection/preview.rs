//! Central directory preview.

use serde::Serialize;

use crate::config::ExpansionThresholds;
use crate::security::zipbomb::expansion_ratio;

use super::records::CentralDirectoryRecord;
use super::records::EndOfCentralDirectory;

/// Metadata of one archive entry, read from its central directory header.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CentralDirectoryEntry {
    /// Raw (not yet normalized) entry name.
    pub name: String,
    /// Compressed size in bytes.
    pub compressed_size: u64,
    /// Uncompressed size in bytes.
    pub uncompressed_size: u64,
    /// ZIP compression method code (0 = stored, 8 = deflate, 99 = AES).
    pub compression_method: u16,
    /// General purpose bit 0.
    pub encrypted: bool,
    /// Entry name ends with a separator.
    pub is_directory: bool,
    /// `1 - compressed / uncompressed`, when uncompressed size is nonzero.
    pub compression_ratio: Option<f64>,
}

impl CentralDirectoryEntry {
    /// Returns `uncompressed / max(1, compressed)`.
    #[must_use]
    pub fn expansion(&self) -> f64 {
        expansion_ratio(self.compressed_size, self.uncompressed_size)
    }
}

/// Aggregate sizes over all central directory entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewTotals {
    /// Number of file entries.
    pub file_count: usize,
    /// Number of directory entries.
    pub dir_count: usize,
    /// Sum of compressed sizes.
    pub compressed_bytes: u64,
    /// Sum of uncompressed sizes.
    pub uncompressed_bytes: u64,
    /// `1 - compressed / uncompressed` over the totals.
    pub overall_ratio: Option<f64>,
}

impl PreviewTotals {
    /// Returns `uncompressed / max(1, compressed)` over the totals.
    #[must_use]
    pub fn expansion(&self) -> f64 {
        expansion_ratio(self.compressed_bytes, self.uncompressed_bytes)
    }
}

/// Zip bomb suspicion signals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suspicion {
    /// Names of entries whose expansion reaches the per-entry threshold.
    pub high_expansion_entries: Vec<String>,
    /// Whether the whole archive reaches the overall threshold.
    pub high_overall_expansion: bool,
}

impl Suspicion {
    /// Returns `true` if any signal is raised.
    #[must_use]
    pub fn is_suspicious(&self) -> bool {
        self.high_overall_expansion || !self.high_expansion_entries.is_empty()
    }
}

/// Result of previewing an archive without decompressing anything.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResult {
    /// Entries in central directory order.
    pub entries: Vec<CentralDirectoryEntry>,
    /// Aggregate sizes.
    pub totals: PreviewTotals,
    /// Zip bomb signals.
    pub suspicious: Suspicion,
}

impl PreviewResult {
    /// Returns the names of encrypted, non-directory entries.
    #[must_use]
    pub fn encrypted_entries(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.encrypted && !entry.is_directory)
            .map(|entry| entry.name.as_str())
            .collect()
    }
}

/// Parses the central directory of `data` without decompressing entries.
///
/// Returns `None` when the input has no End-Of-Central-Directory record or
/// its central directory is truncated; both mean the input is not a usable
/// ZIP archive.
///
/// # Examples
///
/// ```
/// use adpack_core::ExpansionThresholds;
/// use adpack_core::inspection::preview_archive;
/// use adpack_core::test_utils::create_test_zip;
///
/// let zip = create_test_zip(vec![("banner/index.html", b"<p>hi</p>")]);
/// let preview = preview_archive(&zip, &ExpansionThresholds::default()).unwrap();
/// assert_eq!(preview.totals.file_count, 1);
/// assert!(preview_archive(b"plain text", &ExpansionThresholds::default()).is_none());
/// ```
#[must_use]
pub fn preview_archive(data: &[u8], thresholds: &ExpansionThresholds) -> Option<PreviewResult> {
    let (eocd, _) = EndOfCentralDirectory::locate(data)?;

    let mut entries = Vec::with_capacity(usize::from(eocd.total_entries));
    let mut offset = eocd.cd_offset as usize;

    for _ in 0..eocd.total_entries {
        let record = CentralDirectoryRecord::parse(data, offset)?;
        offset += record.record_len;
        entries.push(to_entry(&record));
    }

    let mut totals = PreviewTotals::default();
    let mut suspicious = Suspicion::default();

    for entry in &entries {
        if entry.is_directory {
            totals.dir_count += 1;
        } else {
            totals.file_count += 1;
        }
        totals.compressed_bytes += entry.compressed_size;
        totals.uncompressed_bytes += entry.uncompressed_size;

        if entry.expansion() >= thresholds.entry_ratio {
            suspicious.high_expansion_entries.push(entry.name.clone());
        }
    }

    totals.overall_ratio = compression_ratio(totals.compressed_bytes, totals.uncompressed_bytes);
    suspicious.high_overall_expansion = totals.expansion() >= thresholds.overall_ratio;

    Some(PreviewResult {
        entries,
        totals,
        suspicious,
    })
}

fn to_entry(record: &CentralDirectoryRecord) -> CentralDirectoryEntry {
    let compressed = u64::from(record.compressed_size);
    let uncompressed = u64::from(record.uncompressed_size);
    CentralDirectoryEntry {
        name: record.name.clone(),
        compressed_size: compressed,
        uncompressed_size: uncompressed,
        compression_method: record.compression_method,
        encrypted: record.is_encrypted(),
        is_directory: record.is_directory(),
        compression_ratio: compression_ratio(compressed, uncompressed),
    }
}

fn compression_ratio(compressed: u64, uncompressed: u64) -> Option<f64> {
    (uncompressed != 0).then(|| 1.0 - compressed as f64 / uncompressed as f64)
}
