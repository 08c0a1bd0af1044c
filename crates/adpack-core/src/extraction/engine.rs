//! Breadth-first extraction of an upload and its nested archives.

use std::collections::VecDeque;
use std::time::Instant;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::ExtractionReport;
use crate::IngestConfig;
use crate::IngestError;
use crate::Result;
use crate::SkipReason;
use crate::formats::MimeDetector;
use crate::inspection::PreviewResult;
use crate::inspection::preview_archive;
use crate::security::DedupSet;
use crate::security::EncryptionGate;
use crate::security::EntryAccess;
use crate::security::QuotaTracker;
use crate::security::check_depth;
use crate::security::content_hash;
use crate::security::is_noise;
use crate::security::validate_preview;
use crate::services::VirusScanner;
use crate::types::ExtractedEntry;
use crate::types::SafePath;

use super::archive::OpenArchive;
use super::archive::ReadOutcome;

const ZIP_MIME: &str = "application/zip";

/// One archive waiting in the traversal queue.
struct WorkItem {
    archive: OpenArchive,
    /// Virtual prefix contributed by ancestor archives.
    base: Option<SafePath>,
    depth: usize,
}

/// Request-scoped mutable state.
struct Traversal {
    queue: VecDeque<WorkItem>,
    quota: QuotaTracker,
    dedup: DedupSet,
    report: ExtractionReport,
}

/// What happened to one entry after its body was read.
enum Screened {
    Emit(ExtractedEntry),
    Nested(WorkItem),
    Skip(SkipReason),
    /// Same content as the emitted entry at `original`.
    Duplicate { original: usize },
}

/// Extracts every safe entry of an upload, expanding nested ZIPs.
///
/// The extractor holds only shared, read-only collaborators; counters, the
/// dedup set and the queue are created per call, so one extractor may serve
/// concurrent requests.
pub struct Extractor<'a> {
    config: &'a IngestConfig,
    detector: &'a dyn MimeDetector,
    scanner: &'a dyn VirusScanner,
    gate: EncryptionGate<'a>,
}

impl<'a> Extractor<'a> {
    /// Creates an extractor.
    #[must_use]
    pub fn new(
        config: &'a IngestConfig,
        detector: &'a dyn MimeDetector,
        scanner: &'a dyn VirusScanner,
        password: Option<&'a str>,
    ) -> Self {
        Self {
            config,
            detector,
            scanner,
            gate: EncryptionGate::new(config.encrypted_policy, password),
        }
    }

    /// Extracts `data` and every nested archive within the configured ceilings.
    ///
    /// # Errors
    ///
    /// Only archive-level failures of the upload abort the request:
    /// - `IngestError::NotZip` if the upload has no central directory
    /// - `IngestError::InvalidArchive` if the upload cannot be opened
    /// - `IngestError::ZipBomb` if the upload is suspicious and refused
    /// - `IngestError::EncryptedEntries` / `PasswordRequired` per policy
    ///
    /// Everything else is recorded in the report's skip list.
    pub async fn extract(&self, data: Vec<u8>) -> Result<ExtractionReport> {
        let start = Instant::now();
        let mut state = Traversal {
            queue: VecDeque::new(),
            quota: QuotaTracker::new(),
            dedup: DedupSet::new(),
            report: ExtractionReport::new(),
        };

        let preview =
            preview_archive(&data, &self.config.expansion).ok_or(IngestError::NotZip)?;
        if self.config.refuse_suspicious_archives {
            validate_preview(&preview)?;
        }
        self.gate.check_archive(&preview, true)?;
        warn_expansion(&mut state.report, &preview, None);

        state.queue.push_back(WorkItem {
            archive: OpenArchive::open(data)?,
            base: None,
            depth: 0,
        });

        while let Some(mut item) = state.queue.pop_front() {
            state.report.archives_opened += 1;
            state.report.max_depth_reached = state.report.max_depth_reached.max(item.depth);
            debug!(
                target: "adpack::extract",
                base = item.base.as_ref().map_or("", SafePath::as_str),
                depth = item.depth,
                entries = item.archive.len(),
                "processing archive"
            );
            self.process_archive(&mut item, &mut state).await?;
        }

        let mut report = state.report;
        report.bytes_extracted = state.quota.bytes_extracted();
        report.duration = start.elapsed();

        info!(
            target: "adpack::extract",
            entries = report.entries.len(),
            skipped = report.skipped.len(),
            archives = report.archives_opened,
            bytes = report.bytes_extracted,
            "extraction finished"
        );
        Ok(report)
    }

    async fn process_archive(&self, item: &mut WorkItem, state: &mut Traversal) -> Result<()> {
        let total = item.archive.len();

        for index in 0..total {
            let meta = match item.archive.meta(index) {
                Ok(meta) => meta,
                Err(e) => {
                    debug!(target: "adpack::extract", error = %e, "unreadable entry header");
                    let raw = display_path(item.base.as_ref(), &format!("#{index}"));
                    state.report.skip(raw, SkipReason::CorruptEntry);
                    continue;
                }
            };
            if meta.is_dir {
                continue;
            }

            let path = match SafePath::normalize(&meta.name) {
                Ok(path) => path.nested_under(item.base.as_ref()),
                Err(IngestError::PathTraversal { .. }) => {
                    warn!(target: "adpack::extract", name = %meta.name, "path traversal attempt");
                    let raw = display_path(item.base.as_ref(), &meta.name);
                    state.report.skip(raw, SkipReason::PathTraversal);
                    continue;
                }
                Err(_) => {
                    let raw = display_path(item.base.as_ref(), &meta.name);
                    state.report.skip(raw, SkipReason::CorruptEntry);
                    continue;
                }
            };

            // Encrypted entries are reported before any other check
            let access = self.gate.access(meta.encrypted);
            if access == EntryAccess::Skip {
                state.report.skip(path.as_str(), SkipReason::Encrypted);
                continue;
            }

            if is_noise(&path) {
                continue;
            }

            let extension = path.extension().unwrap_or_default();
            if !self.config.is_extension_allowed(&extension) {
                state
                    .report
                    .skip(path.as_str(), SkipReason::DisallowedExtension(extension));
                continue;
            }

            if let Err(quota) = state.quota.admit_file(self.config) {
                warn!(target: "adpack::extract", %quota, "abandoning archive");
                state.report.skip(path.as_str(), SkipReason::FileCountLimit);
                abandon(&mut state.report, item, total - index - 1);
                return Ok(());
            }

            if QuotaTracker::check_file_size(meta.size, self.config).is_err() {
                state.report.skip(path.as_str(), SkipReason::PerFileSizeLimit);
                continue;
            }

            let data = match item.archive.read(index, access, self.config.max_file_size) {
                ReadOutcome::Data(data) => data,
                ReadOutcome::TooLarge(read) => {
                    debug!(target: "adpack::extract", path = %path, read, "entry exceeds declared size");
                    state.report.skip(path.as_str(), SkipReason::PerFileSizeLimit);
                    continue;
                }
                ReadOutcome::DecryptFailed => {
                    state.report.skip(path.as_str(), SkipReason::DecryptFailed);
                    continue;
                }
                ReadOutcome::Corrupt(reason) => {
                    debug!(target: "adpack::extract", path = %path, %reason, "corrupt entry");
                    state.report.skip(path.as_str(), SkipReason::CorruptEntry);
                    continue;
                }
            };

            if let Err(quota) = state.quota.record_bytes(data.len() as u64, self.config) {
                warn!(target: "adpack::extract", %quota, "abandoning archive");
                state.report.skip(path.as_str(), SkipReason::TotalSizeLimit);
                abandon(&mut state.report, item, total - index - 1);
                return Ok(());
            }

            match self.screen(path.clone(), data, item.depth, state).await? {
                Screened::Emit(entry) => state.report.entries.push(entry),
                Screened::Nested(nested) => state.queue.push_back(nested),
                Screened::Skip(reason) => state.report.skip(path.as_str(), reason),
                Screened::Duplicate { original } => state.report.duplicate(path, original),
            }
        }

        Ok(())
    }

    /// Content checks that run after decompression.
    async fn screen(
        &self,
        path: SafePath,
        data: Vec<u8>,
        depth: usize,
        state: &mut Traversal,
    ) -> Result<Screened> {
        let mime = self.detector.detect(&data, path.as_str());
        if !self.config.is_mime_allowed(&mime) {
            return Ok(Screened::Skip(SkipReason::DisallowedMime(mime)));
        }

        if mime == ZIP_MIME {
            return self.open_nested(path, data, depth, &mut state.report);
        }

        if self.config.enable_virus_scan {
            let verdict = self.scanner.scan(&data).await;
            if !verdict.is_ok() {
                warn!(target: "adpack::extract", path = %path, %verdict, "virus scan rejected entry");
                return Ok(Screened::Skip(SkipReason::Virus(verdict.to_string())));
            }
        }

        let hash = content_hash(&data);
        if self.config.dedup
            && let Some(original) = state.dedup.insert(&hash, state.report.entries.len())
        {
            return Ok(Screened::Duplicate { original });
        }

        Ok(Screened::Emit(ExtractedEntry {
            size: data.len() as u64,
            path,
            content: data,
            content_hash: hash,
            mime,
            depth,
        }))
    }

    fn open_nested(
        &self,
        path: SafePath,
        data: Vec<u8>,
        depth: usize,
        report: &mut ExtractionReport,
    ) -> Result<Screened> {
        if check_depth(depth, self.config).is_err() {
            warn!(target: "adpack::extract", path = %path, depth, "nested archive beyond depth limit");
            return Ok(Screened::Skip(SkipReason::DepthLimit));
        }

        let Some(preview) = preview_archive(&data, &self.config.expansion) else {
            return Ok(Screened::Skip(SkipReason::CorruptEntry));
        };
        if self.config.refuse_suspicious_archives && validate_preview(&preview).is_err() {
            report.add_warning(format!("nested archive {path} refused: suspicious expansion"));
            return Ok(Screened::Skip(SkipReason::SuspiciousArchive));
        }
        self.gate.check_archive(&preview, false)?;

        let base = path.with_extension_stripped();
        warn_expansion(report, &preview, Some(&base));

        match OpenArchive::open(data) {
            Ok(archive) => Ok(Screened::Nested(WorkItem {
                archive,
                base: Some(base),
                depth: depth + 1,
            })),
            Err(_) => Ok(Screened::Skip(SkipReason::CorruptEntry)),
        }
    }
}

fn warn_expansion(report: &mut ExtractionReport, preview: &PreviewResult, base: Option<&SafePath>) {
    for name in &preview.suspicious.high_expansion_entries {
        report.add_warning(format!(
            "entry {} has a high expansion ratio",
            display_path(base, name)
        ));
    }
    if preview.suspicious.high_overall_expansion {
        report.add_warning(format!(
            "archive {} has a high overall expansion ratio",
            base.map_or("(upload)", SafePath::as_str)
        ));
    }
}

fn abandon(report: &mut ExtractionReport, item: &WorkItem, remaining: usize) {
    if remaining > 0 {
        report.add_warning(format!(
            "abandoned {remaining} remaining entries of archive {}",
            item.base.as_ref().map_or("(upload)", SafePath::as_str)
        ));
    }
}

fn display_path(base: Option<&SafePath>, name: &str) -> String {
    match base {
        Some(base) => format!("{base}/{name}"),
        None => name.to_string(),
    }
}
