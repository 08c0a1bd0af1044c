//! Creative archive ingestion with security validation.
//!
//! `adpack-core` turns an uploaded ZIP of marketing creatives (HTML
//! documents, images and their assets, possibly in nested ZIPs) into a
//! manifest of self-contained, classified creatives:
//!
//! 1. [`inspection`] parses the central directory without decompressing
//! 2. [`extraction`] expands the upload breadth-first within hard ceilings
//! 3. [`grouping`] partitions entries into creatives and picks entry files
//! 4. [`inlining`] defangs HTML and embeds its assets as data URLs
//!
//! # Examples
//!
//! ```no_run
//! use adpack_core::IngestConfig;
//! use adpack_core::Ingestor;
//! use adpack_core::Upload;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let ingestor = Ingestor::new(IngestConfig::default());
//! let bytes = std::fs::read("creatives.zip")?;
//! let manifest = ingestor.ingest(Upload::new(bytes)).await?;
//! println!("{} creatives", manifest.counts.total);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod error;
pub mod extraction;
pub mod formats;
pub mod grouping;
pub mod inlining;
pub mod inspection;
pub mod manifest;
pub mod report;
pub mod security;
pub mod services;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;

// Re-export main API types
pub use api::Ingestor;
pub use api::IngestorBuilder;
pub use api::Upload;
pub use config::EncryptedPolicy;
pub use config::ExpansionThresholds;
pub use config::IngestConfig;
pub use error::IngestError;
pub use error::QuotaResource;
pub use error::Result;
pub use error::SkipReason;
pub use inspection::PreviewResult;
pub use inspection::preview_archive;
pub use manifest::Manifest;
pub use report::ExtractionReport;

// Re-export types module for easier access
pub use types::ContentKind;
pub use types::ExtractedEntry;
pub use types::SafePath;
