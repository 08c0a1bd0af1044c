//! Ingestion benchmarks for adpack.
//!
//! Measures:
//! - Central directory previewing (no decompression)
//! - HTML defanging and asset inlining
//! - Full ingestion of a multi-creative upload

#![allow(clippy::unwrap_used, clippy::expect_used, missing_docs)]

use std::hint::black_box;

use adpack_core::ExpansionThresholds;
use adpack_core::IngestConfig;
use adpack_core::Ingestor;
use adpack_core::SafePath;
use adpack_core::Upload;
use adpack_core::inlining::ClaimedAssets;
use adpack_core::inlining::defang;
use adpack_core::inlining::inline_html;
use adpack_core::preview_archive;
use adpack_core::security::content_hash;
use adpack_core::test_utils::ZipTestBuilder;
use adpack_core::test_utils::png_bytes;
use adpack_core::types::ExtractedEntry;
use criterion::Criterion;
use criterion::criterion_group;
use criterion::criterion_main;

const PAGE: &str = r#"<html><head><link rel="stylesheet" href="css/site.css">
<script>track()</script></head><body onload="init()">
<img src="img/logo.png" srcset="img/logo.png 1x, img/logo.png 2x">
<div style="background:url('img/logo.png')"><a href="javascript:void(0)">go</a></div>
</body></html>"#;

fn upload(creatives: u8) -> Vec<u8> {
    let mut builder = ZipTestBuilder::new();
    for i in 0..creatives {
        // Distinct bodies so deduplication keeps every creative
        let page = format!("{PAGE}<!-- {i} -->");
        let css = format!("body{{background:url(../img/logo.png)}} /* {i} */");
        builder = builder
            .add_deflated(&format!("c{i}/index.html"), page.as_bytes())
            .add_deflated(&format!("c{i}/css/site.css"), css.as_bytes())
            .add_file(&format!("c{i}/img/logo.png"), &png_bytes(i));
    }
    builder.build()
}

fn benchmark_preview(c: &mut Criterion) {
    let mut group = c.benchmark_group("preview");
    let thresholds = ExpansionThresholds::default();

    for creatives in [1u8, 16, 64] {
        let data = upload(creatives);
        group.bench_function(format!("{creatives}_creatives"), |b| {
            b.iter(|| preview_archive(black_box(&data), &thresholds));
        });
    }

    group.finish();
}

fn benchmark_inlining(c: &mut Criterion) {
    let mut group = c.benchmark_group("inlining");

    group.bench_function("defang", |b| {
        b.iter(|| defang(black_box(PAGE)));
    });

    let members: Vec<ExtractedEntry> = [
        ("c/css/site.css", b"body{background:url(../img/logo.png)}".to_vec()),
        ("c/img/logo.png", png_bytes(1)),
    ]
    .into_iter()
    .map(|(path, content)| ExtractedEntry {
        path: SafePath::normalize(path).unwrap(),
        size: content.len() as u64,
        content_hash: content_hash(&content),
        content,
        mime: String::new(),
        depth: 0,
    })
    .collect();
    let refs: Vec<&ExtractedEntry> = members.iter().collect();
    let page = SafePath::normalize("c/index.html").unwrap();

    group.bench_function("inline_html", |b| {
        b.iter(|| {
            let mut claimed = ClaimedAssets::new();
            inline_html(black_box(PAGE), &page, &refs, &[], &mut claimed, 1024 * 1024)
        });
    });

    group.finish();
}

fn benchmark_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest");
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let ingestor = Ingestor::new(IngestConfig::default());

    for creatives in [1u8, 16] {
        let data = upload(creatives);
        group.bench_function(format!("{creatives}_creatives"), |b| {
            b.to_async(&runtime).iter(|| async {
                ingestor
                    .ingest(Upload::new(black_box(data.clone())))
                    .await
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_preview, benchmark_inlining, benchmark_ingest);
criterion_main!(benches);
