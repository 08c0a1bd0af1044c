//! High-level ingestion pipeline.
//!
//! [`Ingestor`] wires the configuration to the external collaborators and
//! runs preview, extraction, grouping, inlining and storage for one upload.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;
use tracing::info;
use uuid::Uuid;

use crate::IngestConfig;
use crate::IngestError;
use crate::Result;
use crate::extraction::Extractor;
use crate::formats::MagicDetector;
use crate::formats::MimeDetector;
use crate::grouping::CreativeGroup;
use crate::grouping::CreativeType;
use crate::grouping::group_entries;
use crate::grouping::group_key;
use crate::grouping::standalone_images;
use crate::inlining::ClaimedAssets;
use crate::inlining::defang;
use crate::inlining::inline_html;
use crate::inspection::PreviewResult;
use crate::inspection::preview_archive;
use crate::manifest::AnalyzedCreative;
use crate::manifest::Manifest;
use crate::manifest::Summary;
use crate::report::ExtractionReport;
use crate::services::CreativeStore;
use crate::services::NoPreviews;
use crate::services::NoopScanner;
use crate::services::PreviewGenerator;
use crate::services::VirusScanner;
use crate::types::ContentKind;
use crate::types::ExtractedEntry;
use crate::types::SafePath;

/// An uploaded archive and its request parameters.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Raw archive bytes.
    pub bytes: Vec<u8>,
    /// Password for encrypted entries, used under the `attempt` policy.
    pub password: Option<String>,
    /// Store key; a random UUID is generated when absent.
    pub upload_id: Option<String>,
}

impl Upload {
    /// Creates an upload without password or id.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            password: None,
            upload_id: None,
        }
    }

    /// Sets the password supplied alongside the upload.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the upload id instead of generating one.
    #[must_use]
    pub fn with_upload_id(mut self, upload_id: impl Into<String>) -> Self {
        self.upload_id = Some(upload_id.into());
        self
    }
}

/// Ingestion pipeline.
///
/// Holds only shared, read-only state. Every call to [`Ingestor::ingest`]
/// builds its own counters, dedup set and claimed-asset set.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use adpack_core::Ingestor;
/// use adpack_core::IngestConfig;
/// use adpack_core::Upload;
/// use adpack_core::services::MemoryStore;
/// use adpack_core::test_utils::create_test_zip;
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let store = Arc::new(MemoryStore::new());
/// let ingestor = Ingestor::builder()
///     .config(IngestConfig::default())
///     .store(store.clone())
///     .build();
///
/// let zip = create_test_zip(vec![("banner/index.html", b"<p>hi</p>".as_slice())]);
/// let manifest = ingestor
///     .ingest(Upload::new(zip).with_upload_id("u1"))
///     .await
///     .unwrap();
///
/// assert!(manifest.is_single_creative);
/// assert_eq!(manifest.counts.htmls, 1);
/// assert!(store.get("u1", "banner/index.html").is_some());
/// # });
/// ```
pub struct Ingestor {
    config: IngestConfig,
    detector: Arc<dyn MimeDetector>,
    scanner: Arc<dyn VirusScanner>,
    previews: Arc<dyn PreviewGenerator>,
    store: Option<Arc<dyn CreativeStore>>,
}

impl Ingestor {
    /// Creates an ingestor with built-in collaborators and no store.
    #[must_use]
    pub fn new(config: IngestConfig) -> Self {
        IngestorBuilder::new().config(config).build()
    }

    /// Returns a builder for wiring collaborators.
    #[must_use]
    pub fn builder() -> IngestorBuilder {
        IngestorBuilder::new()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Parses the central directory of `data` without decompressing anything.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::NotZip` if no end of central directory record
    /// is found.
    pub fn preview(&self, data: &[u8]) -> Result<PreviewResult> {
        preview_archive(data, &self.config.expansion).ok_or(IngestError::NotZip)
    }

    /// Ingests one upload and returns its manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The upload is not a ZIP archive or cannot be opened
    /// - The upload is refused as a potential zip bomb
    /// - Encrypted entries are present under the `error` policy, or under
    ///   `attempt` without a password
    /// - The store fails to persist a file
    pub async fn ingest(&self, upload: Upload) -> Result<Manifest> {
        let start = Instant::now();
        let upload_id = upload
            .upload_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let extractor = Extractor::new(
            &self.config,
            self.detector.as_ref(),
            self.scanner.as_ref(),
            upload.password.as_deref(),
        );
        let report = extractor.extract(upload.bytes).await?;

        let groups = group_entries(&report.entries, &self.config.entry_preferences);
        let mut claimed = ClaimedAssets::new();
        let mut warnings = report.warnings.clone();
        let mut items = Vec::with_capacity(groups.len());

        for group in &groups {
            let aliases = group_aliases(&report, &group.key);
            items.push(
                self.analyze_group(&upload_id, group, &aliases, &mut claimed, &mut warnings)
                    .await?,
            );
        }
        for image in standalone_images(&groups, &claimed) {
            items.push(self.analyze_standalone(&upload_id, image).await?);
        }

        let errors = report
            .skipped
            .iter()
            .filter(|skip| skip.reason.is_security_related())
            .map(|skip| format!("{}: {}", skip.path, skip.reason))
            .collect();
        let summary = Summary {
            total_size: report.entries.iter().map(|entry| entry.size).sum(),
            processing_time_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            warnings,
            errors,
        };
        let manifest = Manifest::new(upload_id, items, summary, report.skipped);

        info!(
            target: "adpack::ingest",
            upload_id = %manifest.upload_id,
            creatives = manifest.counts.total,
            htmls = manifest.counts.htmls,
            images = manifest.counts.images,
            skipped = manifest.skipped.len(),
            claimed = claimed.len(),
            elapsed_ms = manifest.summary.processing_time_ms,
            "ingestion complete"
        );

        Ok(manifest)
    }

    async fn analyze_group(
        &self,
        upload_id: &str,
        group: &CreativeGroup<'_>,
        aliases: &[(&SafePath, &ExtractedEntry)],
        claimed: &mut ClaimedAssets,
        warnings: &mut Vec<String>,
    ) -> Result<AnalyzedCreative> {
        let canonical = group.canonical;
        let embedded_html = (group.kind == CreativeType::Html).then(|| {
            let result = inline_html(
                &canonical.text(),
                &canonical.path,
                &group.effective,
                aliases,
                claimed,
                self.config.max_inline_asset_bytes,
            );
            warnings.extend(
                result
                    .warnings
                    .into_iter()
                    .map(|warning| format!("{}: {warning}", canonical.path)),
            );
            result.html
        });

        for member in &group.effective {
            // No HTML reaches the store with active content
            let bytes: Cow<'_, [u8]> = match &embedded_html {
                Some(html) if member.path == canonical.path => Cow::Borrowed(html.as_bytes()),
                _ if member.kind() == ContentKind::Html => {
                    Cow::Owned(defang(&member.text()).into_bytes())
                }
                _ => Cow::Borrowed(member.content.as_slice()),
            };
            self.put(upload_id, member.path.as_str(), &bytes).await?;
        }

        let id = Uuid::new_v4().to_string();
        let preview_source = embedded_html
            .as_deref()
            .map_or(canonical.content.as_slice(), str::as_bytes);
        let preview_url = self
            .store_preview(upload_id, &id, preview_source, canonical)
            .await?;

        debug!(
            target: "adpack::ingest",
            key = %group.key,
            kind = group.kind.as_str(),
            entry = %canonical.path,
            members = group.effective.len(),
            "creative analyzed"
        );

        Ok(AnalyzedCreative {
            id,
            name: group.key.clone(),
            kind: group.kind,
            size_bytes: group.size_bytes(),
            url: canonical.path.to_string(),
            preview_url,
            embedded_html,
            entry_file: canonical.path.to_string(),
            asset_paths: group.asset_paths(),
        })
    }

    /// Builds the creative for an image nobody embedded. Its bytes were
    /// already stored with its group.
    async fn analyze_standalone(
        &self,
        upload_id: &str,
        image: &ExtractedEntry,
    ) -> Result<AnalyzedCreative> {
        let id = Uuid::new_v4().to_string();
        let preview_url = self
            .store_preview(upload_id, &id, &image.content, image)
            .await?;

        Ok(AnalyzedCreative {
            id,
            name: image.path.file_name().to_string(),
            kind: CreativeType::Image,
            size_bytes: image.size,
            url: image.path.to_string(),
            preview_url,
            embedded_html: None,
            entry_file: image.path.to_string(),
            asset_paths: Vec::new(),
        })
    }

    /// Generates and stores a preview. Generation failures yield `None`.
    async fn store_preview(
        &self,
        upload_id: &str,
        id: &str,
        bytes: &[u8],
        entry: &ExtractedEntry,
    ) -> Result<Option<String>> {
        if self.store.is_none() {
            return Ok(None);
        }
        let Some(preview) = self.previews.make_preview(bytes, entry.kind()).await else {
            debug!(target: "adpack::ingest", entry = %entry.path, "no preview generated");
            return Ok(None);
        };
        let path = format!("previews/{id}.png");
        self.put(upload_id, &path, &preview).await?;
        Ok(Some(path))
    }

    async fn put(&self, upload_id: &str, relative_path: &str, bytes: &[u8]) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        store
            .put(upload_id, relative_path, bytes)
            .await
            .map_err(|e| IngestError::Storage {
                path: relative_path.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Builder for [`Ingestor`].
///
/// Unset collaborators default to [`MagicDetector`], [`NoopScanner`] and
/// [`NoPreviews`]; without a store nothing is persisted.
pub struct IngestorBuilder {
    config: IngestConfig,
    detector: Arc<dyn MimeDetector>,
    scanner: Arc<dyn VirusScanner>,
    previews: Arc<dyn PreviewGenerator>,
    store: Option<Arc<dyn CreativeStore>>,
}

impl Default for IngestorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestorBuilder {
    /// Creates a builder with default configuration and collaborators.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: IngestConfig::default(),
            detector: Arc::new(MagicDetector),
            scanner: Arc::new(NoopScanner),
            previews: Arc::new(NoPreviews),
            store: None,
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: IngestConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the MIME detector.
    #[must_use]
    pub fn detector(mut self, detector: Arc<dyn MimeDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Sets the virus scanner.
    #[must_use]
    pub fn scanner(mut self, scanner: Arc<dyn VirusScanner>) -> Self {
        self.scanner = scanner;
        self
    }

    /// Sets the preview generator.
    #[must_use]
    pub fn previews(mut self, previews: Arc<dyn PreviewGenerator>) -> Self {
        self.previews = previews;
        self
    }

    /// Sets the store creatives are written to.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn CreativeStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Builds the ingestor.
    #[must_use]
    pub fn build(self) -> Ingestor {
        Ingestor {
            config: self.config,
            detector: self.detector,
            scanner: self.scanner,
            previews: self.previews,
            store: self.store,
        }
    }
}

/// Duplicates dropped from the group `key`, each paired with the retained
/// entry carrying the same content.
fn group_aliases<'r>(
    report: &'r ExtractionReport,
    key: &str,
) -> Vec<(&'r SafePath, &'r ExtractedEntry)> {
    report
        .duplicates
        .iter()
        .filter(|duplicate| group_key(&duplicate.path) == key)
        .filter_map(|duplicate| Some((&duplicate.path, report.original_of(duplicate)?)))
        .collect()
}
