//! Error conversion utilities for CLI.
//!
//! Converts adpack-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use std::path::Path;

use adpack_core::IngestError;
use anyhow::anyhow;

/// Converts `IngestError` to user-friendly anyhow error with context
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn convert_ingest_error(err: IngestError, archive: &Path) -> anyhow::Error {
    match err {
        IngestError::NotZip => {
            anyhow!(
                "'{}' is not a ZIP archive\n\
                 HINT: Only ZIP uploads are supported. Re-pack the creatives as a .zip file.",
                archive.display()
            )
        }
        IngestError::InvalidArchive(reason) => {
            anyhow!(
                "Invalid archive '{}': {}\n\
                 HINT: The archive may be corrupted or truncated.",
                archive.display(),
                reason
            )
        }
        IngestError::PathTraversal { path } => {
            anyhow!(
                "Security violation: Archive '{}' attempted path traversal with '{}'\n\
                 HINT: This archive may be malicious. Do not process uploads from untrusted sources.",
                archive.display(),
                path
            )
        }
        IngestError::ZipBomb {
            compressed,
            uncompressed,
            ratio,
        } => {
            anyhow!(
                "Security violation: Archive '{}' appears to be a zip bomb\n\
                 Expansion ratio: {}:1 ({}KB → {}MB)\n\
                 HINT: Use --allow-suspicious to process it anyway if the source is trusted.",
                archive.display(),
                ratio as u64,
                compressed / 1024,
                uncompressed / 1024 / 1024
            )
        }
        IngestError::EncryptedEntries { names } => {
            anyhow!(
                "Archive '{}' contains {} encrypted entries: {}\n\
                 HINT: Use --encrypted skip to ignore them, or --encrypted attempt with --password.",
                archive.display(),
                names.len(),
                names.join(", ")
            )
        }
        IngestError::PasswordRequired => {
            anyhow!(
                "Archive '{}' contains encrypted entries but no password was supplied\n\
                 HINT: Pass --password or set ADPACK_PASSWORD.",
                archive.display()
            )
        }
        IngestError::Storage { path, reason } => {
            anyhow!(
                "Failed to store '{}' from '{}': {}\n\
                 HINT: Check that the output directory is writable and has free space.",
                path,
                archive.display(),
                reason
            )
        }
        IngestError::Io(io_err) => {
            anyhow!(
                "I/O error while processing '{}': {}",
                archive.display(),
                io_err
            )
        }
    }
}

/// Adds context to a core result about the upload being processed
pub fn add_archive_context<T>(
    result: Result<T, IngestError>,
    archive: &Path,
) -> anyhow::Result<T> {
    result.map_err(|e| convert_ingest_error(e, archive))
}
