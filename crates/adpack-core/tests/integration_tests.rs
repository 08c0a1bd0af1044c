//! Integration tests for adpack-core.
//!
//! These tests run whole uploads through the public pipeline.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use adpack_core::EncryptedPolicy;
use adpack_core::ExpansionThresholds;
use adpack_core::IngestConfig;
use adpack_core::IngestError;
use adpack_core::Ingestor;
use adpack_core::SkipReason;
use adpack_core::Upload;
use adpack_core::grouping::CreativeType;
use adpack_core::preview_archive;
use adpack_core::services::MemoryStore;
use adpack_core::services::ScanVerdict;
use adpack_core::services::VirusScanner;
use adpack_core::test_utils::ZipTestBuilder;
use adpack_core::test_utils::central_directory_only;
use adpack_core::test_utils::png_bytes;
use async_trait::async_trait;

fn ingestor(config: IngestConfig) -> Ingestor {
    Ingestor::new(config)
}

#[test]
fn test_preview_totals_match_central_directory() {
    let data = central_directory_only(&[("a.png", 10, 30), ("b/", 0, 0), ("b/c.html", 7, 21)]);
    let preview = preview_archive(&data, &ExpansionThresholds::default()).unwrap();

    let compressed: u64 = preview.entries.iter().map(|e| e.compressed_size).sum();
    let uncompressed: u64 = preview.entries.iter().map(|e| e.uncompressed_size).sum();
    assert_eq!(preview.totals.compressed_bytes, compressed);
    assert_eq!(preview.totals.uncompressed_bytes, uncompressed);
    assert_eq!(preview.totals.file_count, 2);
    assert_eq!(preview.totals.dir_count, 1);
}

#[test]
fn test_expansion_threshold_boundary() {
    let data = central_directory_only(&[("at.txt", 100, 5_000), ("below.txt", 10_000, 499_900)]);
    let preview = preview_archive(&data, &ExpansionThresholds::default()).unwrap();
    assert_eq!(preview.suspicious.high_expansion_entries, vec!["at.txt"]);
}

#[tokio::test]
async fn test_traversal_rejected_at_any_depth() {
    let inner = ZipTestBuilder::new()
        .add_file("../../etc/passwd", b"root")
        .add_file("ok.txt", b"fine")
        .build();
    let upload = ZipTestBuilder::new()
        .add_file("../../etc/passwd", b"root")
        .add_file("nested.zip", &inner)
        .build();

    let manifest = ingestor(IngestConfig::default())
        .ingest(Upload::new(upload))
        .await
        .unwrap();

    let traversals: Vec<&str> = manifest
        .skipped
        .iter()
        .filter(|s| s.reason == SkipReason::PathTraversal)
        .map(|s| s.path.as_str())
        .collect();
    assert_eq!(traversals, vec!["../../etc/passwd", "nested/../../etc/passwd"]);
    assert_eq!(manifest.summary.errors.len(), 2);
}

#[tokio::test]
async fn test_file_count_ceiling_is_soft() {
    let upload = ZipTestBuilder::new()
        .add_file("a.txt", b"1")
        .add_file("b.txt", b"2")
        .add_file("c.txt", b"3")
        .add_file("d.txt", b"4")
        .build();
    let config = IngestConfig::default().with_max_file_count(3);

    let manifest = ingestor(config).ingest(Upload::new(upload)).await.unwrap();

    assert_eq!(manifest.counts.total, 3);
    let limits: Vec<&str> = manifest
        .skipped
        .iter()
        .filter(|s| s.reason == SkipReason::FileCountLimit)
        .map(|s| s.path.as_str())
        .collect();
    assert_eq!(limits, vec!["d.txt"]);
}

#[tokio::test]
async fn test_text_companion_dropped_from_html_group() {
    let upload = ZipTestBuilder::new()
        .add_file("q3/report.html", b"<html><body>Q3</body></html>")
        .add_file("q3/report.txt", b"Q3 plain")
        .build();

    let manifest = ingestor(IngestConfig::default())
        .ingest(Upload::new(upload))
        .await
        .unwrap();

    assert!(manifest.is_single_creative);
    let item = &manifest.items[0];
    assert_eq!(item.kind, CreativeType::Html);
    assert_eq!(item.entry_file, "q3/report.html");
    assert!(item.asset_paths.is_empty());
    assert_eq!(item.size_bytes, 28);
}

#[tokio::test]
async fn test_embedded_logo_not_standalone() {
    let upload = ZipTestBuilder::new()
        .add_file(
            "groupFolder/index.html",
            br#"<html><body><img src="./img/logo.png"></body></html>"#,
        )
        .add_file("groupFolder/img/logo.png", &png_bytes(9))
        .build();

    let manifest = ingestor(IngestConfig::default())
        .ingest(Upload::new(upload))
        .await
        .unwrap();

    assert_eq!(manifest.counts.total, 1);
    let html = manifest.items[0].embedded_html.as_deref().unwrap();
    assert!(html.contains("data:image/png;base64,"));
    assert!(
        manifest
            .items
            .iter()
            .all(|item| !item.url.ends_with("logo.png"))
    );
}

#[tokio::test]
async fn test_active_content_never_survives() {
    let upload = ZipTestBuilder::new()
        .add_file(
            "ad/index.html",
            br#"<html><script>alert(1)</script><button onclick="x()">Buy</button></html>"#,
        )
        .build();

    let manifest = ingestor(IngestConfig::default())
        .ingest(Upload::new(upload))
        .await
        .unwrap();

    let html = manifest.items[0].embedded_html.as_deref().unwrap();
    assert!(!html.contains("<script>alert(1)</script>"));
    assert!(!html.contains("onclick=\"x()\""));
    assert!(html.contains("<button>Buy</button>"));
}

fn encrypted_upload() -> Vec<u8> {
    ZipTestBuilder::new()
        .add_file("open.txt", b"public")
        .add_encrypted("secret/a.txt", b"hidden a", "pw")
        .add_encrypted("secret/b.txt", b"hidden b", "pw")
        .build()
}

#[tokio::test]
async fn test_error_policy_lists_every_encrypted_entry() {
    let store = Arc::new(MemoryStore::new());
    let ingestor = Ingestor::builder()
        .config(IngestConfig::default().with_encrypted_policy(EncryptedPolicy::Error))
        .store(store.clone())
        .build();

    let err = ingestor
        .ingest(Upload::new(encrypted_upload()).with_upload_id("enc"))
        .await
        .unwrap_err();

    match err {
        IngestError::EncryptedEntries { names } => {
            assert_eq!(names, vec!["secret/a.txt", "secret/b.txt"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(store.paths("enc").is_empty());
}

#[tokio::test]
async fn test_skip_policy_records_encrypted() {
    let manifest = ingestor(IngestConfig::default())
        .ingest(Upload::new(encrypted_upload()))
        .await
        .unwrap();

    let encrypted = manifest
        .skipped
        .iter()
        .filter(|s| s.reason == SkipReason::Encrypted)
        .count();
    assert_eq!(encrypted, 2);
    assert_eq!(manifest.counts.total, 1);

    let json = serde_json::to_value(&manifest).unwrap();
    assert_eq!(json["skipped"][0]["reason"], "encrypted");
}

#[tokio::test]
async fn test_attempt_policy_decrypts() {
    let config = IngestConfig::default().with_encrypted_policy(EncryptedPolicy::Attempt);

    let manifest = ingestor(config.clone())
        .ingest(Upload::new(encrypted_upload()).with_password("pw"))
        .await
        .unwrap();
    assert!(manifest.skipped.is_empty());
    assert_eq!(manifest.counts.total, 2);

    let manifest = ingestor(config.clone())
        .ingest(Upload::new(encrypted_upload()).with_password("wrong"))
        .await
        .unwrap();
    assert!(
        manifest
            .skipped
            .iter()
            .all(|s| s.reason == SkipReason::DecryptFailed)
    );

    let err = ingestor(config)
        .ingest(Upload::new(encrypted_upload()))
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::PasswordRequired));
}

#[tokio::test]
async fn test_nested_archives_flatten_with_prefix() {
    let level2 = ZipTestBuilder::new()
        .add_file("deep.png", &png_bytes(4))
        .build();
    let level1 = ZipTestBuilder::new()
        .add_file("index.html", b"<html><img src=\"inner/deep.png\"></html>")
        .add_file("inner.zip", &level2)
        .build();
    let upload = ZipTestBuilder::new()
        .add_file("campaign.zip", &level1)
        .build();

    let manifest = ingestor(IngestConfig::default())
        .ingest(Upload::new(upload))
        .await
        .unwrap();

    assert_eq!(manifest.counts.total, 1);
    let item = &manifest.items[0];
    assert_eq!(item.name, "campaign");
    assert_eq!(item.entry_file, "campaign/index.html");
    assert_eq!(item.asset_paths, vec!["campaign/inner/deep.png"]);
    assert!(
        item.embedded_html
            .as_deref()
            .unwrap()
            .contains("data:image/png;base64,")
    );
}

#[tokio::test]
async fn test_suspicious_upload_refused_unless_permissive() {
    let upload = ZipTestBuilder::new()
        .add_deflated("fill.txt", &vec![b'0'; 1_000_000])
        .build();

    let err = ingestor(IngestConfig::default())
        .ingest(Upload::new(upload.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::ZipBomb { .. }));
    assert!(err.is_security_violation());

    let manifest = ingestor(IngestConfig::permissive())
        .ingest(Upload::new(upload))
        .await
        .unwrap();
    assert_eq!(manifest.counts.total, 1);
    assert!(!manifest.summary.warnings.is_empty());
}

/// Scanner whose backend is down.
struct OfflineScanner;

#[async_trait]
impl VirusScanner for OfflineScanner {
    async fn scan(&self, _bytes: &[u8]) -> ScanVerdict {
        ScanVerdict::Unavailable
    }
}

#[tokio::test]
async fn test_unavailable_scanner_fails_closed() {
    let upload = ZipTestBuilder::new()
        .add_file("banner/index.html", b"<p>hi</p>")
        .add_file("promo.png", &png_bytes(4))
        .build();

    let manifest = Ingestor::builder()
        .config(IngestConfig::default().with_virus_scan(true))
        .scanner(Arc::new(OfflineScanner))
        .build()
        .ingest(Upload::new(upload))
        .await
        .unwrap();

    assert_eq!(manifest.counts.total, 0);
    assert!(
        manifest
            .skipped
            .iter()
            .all(|s| s.reason == SkipReason::Virus("UNAVAILABLE".into()))
    );
    assert_eq!(
        manifest.summary.errors,
        vec![
            "banner/index.html: virus:UNAVAILABLE",
            "promo.png: virus:UNAVAILABLE"
        ]
    );
}
