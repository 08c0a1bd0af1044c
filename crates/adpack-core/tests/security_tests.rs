//! Attack-scenario tests: zip slip, zip bombs and nesting abuse.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use adpack_core::ExpansionThresholds;
use adpack_core::IngestConfig;
use adpack_core::IngestError;
use adpack_core::Ingestor;
use adpack_core::SkipReason;
use adpack_core::Upload;
use adpack_core::preview_archive;
use adpack_core::security::normalize_path;
use adpack_core::security::validate_preview;
use adpack_core::test_utils::ZipTestBuilder;
use adpack_core::test_utils::central_directory_only;
use adpack_core::test_utils::png_bytes;

#[test]
fn test_zip_slip_names_rejected() {
    let malicious = [
        "../etc/passwd",
        "../../etc/passwd",
        "foo/../../etc/passwd",
        "..\\..\\windows\\win.ini",
        "a/./../../b",
        "C:/Windows/System32/drivers/etc/hosts",
    ];

    for name in malicious {
        assert!(
            matches!(normalize_path(name), Err(IngestError::PathTraversal { .. })),
            "path should be rejected: {name}"
        );
    }
}

#[test]
fn test_null_byte_injection() {
    let result = normalize_path("banner.html\0.png");
    assert!(matches!(result, Err(IngestError::PathTraversal { .. })));
}

#[test]
fn test_absolute_names_are_rooted_in_archive() {
    let path = normalize_path("/etc/passwd").unwrap();
    assert_eq!(path.as_str(), "etc/passwd");
}

#[tokio::test]
async fn test_zip_slip_entries_skipped_not_written() {
    let data = ZipTestBuilder::new()
        .add_file("../../evil.html", b"<html>evil</html>")
        .add_file("ok/../../../evil.png", &png_bytes(9))
        .add_file("safe.png", &png_bytes(1))
        .build();

    let manifest = Ingestor::new(IngestConfig::default())
        .ingest(Upload::new(data))
        .await
        .unwrap();

    assert_eq!(manifest.counts.total, 1);
    assert_eq!(manifest.items[0].entry_file, "safe.png");
    let traversals = manifest
        .skipped
        .iter()
        .filter(|s| s.reason == SkipReason::PathTraversal)
        .count();
    assert_eq!(traversals, 2);
    assert_eq!(manifest.summary.errors.len(), 2);
}

#[test]
fn test_42_zip_central_directory_flagged() {
    // 42 KB claiming to expand to ~4 GB
    let data = central_directory_only(&[("42.zip", 42_000, u32::MAX)]);
    let preview = preview_archive(&data, &ExpansionThresholds::default()).unwrap();

    assert!(preview.suspicious.high_overall_expansion);
    assert_eq!(preview.suspicious.high_expansion_entries, vec!["42.zip"]);
    assert!(matches!(
        validate_preview(&preview),
        Err(IngestError::ZipBomb { .. })
    ));
}

#[test]
fn test_normal_compression_not_flagged() {
    let data = central_directory_only(&[("banner.html", 1_000, 10_000)]);
    let preview = preview_archive(&data, &ExpansionThresholds::default()).unwrap();

    assert!(!preview.suspicious.is_suspicious());
    assert!(validate_preview(&preview).is_ok());
}

#[tokio::test]
async fn test_recursive_nesting_stops_at_depth_limit() {
    let innermost = ZipTestBuilder::new().add_file("deep.txt", b"deep").build();
    let middle = ZipTestBuilder::new()
        .add_file("inner.zip", &innermost)
        .build();
    let outer = ZipTestBuilder::new()
        .add_file("middle.zip", &middle)
        .add_file("top.txt", b"top")
        .build();

    let manifest = Ingestor::new(IngestConfig::default().with_max_depth(1))
        .ingest(Upload::new(outer))
        .await
        .unwrap();

    assert!(
        manifest
            .skipped
            .iter()
            .any(|s| s.reason == SkipReason::DepthLimit)
    );
    assert!(manifest.items.iter().all(|item| item.entry_file != "middle/inner/deep.txt"));
    assert!(manifest.items.iter().any(|item| item.entry_file == "top.txt"));
}

#[tokio::test]
async fn test_total_size_ceiling_abandons_archive() {
    let data = ZipTestBuilder::new()
        .add_file("a.txt", &[b'a'; 600])
        .add_file("b.txt", &[b'b'; 600])
        .add_file("c.txt", &[b'c'; 600])
        .build();

    let manifest = Ingestor::new(IngestConfig::default().with_max_total_size(1_000))
        .ingest(Upload::new(data))
        .await
        .unwrap();

    assert_eq!(manifest.counts.total, 1);
    let limited: Vec<_> = manifest
        .skipped
        .iter()
        .filter(|s| s.reason == SkipReason::TotalSizeLimit)
        .collect();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].path, "b.txt");
}
