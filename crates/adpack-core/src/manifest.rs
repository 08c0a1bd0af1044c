//! Output manifest handed to storage and callers.

use serde::Serialize;

use crate::grouping::CreativeType;
use crate::report::SkippedEntry;

/// One classified, stored creative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedCreative {
    /// Random identifier of the creative.
    pub id: String,
    /// Display name (group key or image file name).
    pub name: String,
    /// Classified type.
    #[serde(rename = "type")]
    pub kind: CreativeType,
    /// Sum of effective member sizes.
    pub size_bytes: u64,
    /// Path of the entry file relative to the upload in the store.
    pub url: String,
    /// Path of the stored preview, when one could be generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    /// Self-contained, defanged HTML (HTML creatives only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedded_html: Option<String>,
    /// Archive path of the entry file.
    pub entry_file: String,
    /// Archive paths of the other effective members.
    pub asset_paths: Vec<String>,
}

/// Number of creatives per type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CreativeCounts {
    /// Image creatives.
    pub images: usize,
    /// HTML creatives.
    pub htmls: usize,
    /// Other creatives.
    pub others: usize,
    /// All creatives.
    pub total: usize,
}

impl CreativeCounts {
    /// Counts `items` by type.
    #[must_use]
    pub fn tally(items: &[AnalyzedCreative]) -> Self {
        let mut counts = Self::default();
        for item in items {
            match item.kind {
                CreativeType::Html => counts.htmls += 1,
                CreativeType::Image => counts.images += 1,
                CreativeType::Other => counts.others += 1,
            }
        }
        counts.total = items.len();
        counts
    }
}

/// Request-level summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Sum of the sizes of every extracted entry, creative or not.
    pub total_size: u64,
    /// Wall-clock processing time.
    pub processing_time_ms: u64,
    /// Non-fatal observations.
    pub warnings: Vec<String>,
    /// Security-relevant rejections, one line per skipped entry.
    pub errors: Vec<String>,
}

/// Result of ingesting one upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Identifier the store keys every file of this upload by.
    pub upload_id: String,
    /// `true` when the upload produced exactly one creative.
    pub is_single_creative: bool,
    /// Creatives in discovery order, standalone images last.
    pub items: Vec<AnalyzedCreative>,
    /// Per-type counts of `items`.
    pub counts: CreativeCounts,
    /// Totals, timing and messages.
    pub summary: Summary,
    /// Every rejected entry.
    pub skipped: Vec<SkippedEntry>,
}

impl Manifest {
    /// Assembles a manifest, deriving counts and the single-creative flag.
    #[must_use]
    pub fn new(
        upload_id: String,
        items: Vec<AnalyzedCreative>,
        summary: Summary,
        skipped: Vec<SkippedEntry>,
    ) -> Self {
        Self {
            upload_id,
            is_single_creative: items.len() == 1,
            counts: CreativeCounts::tally(&items),
            items,
            summary,
            skipped,
        }
    }

    /// Returns the items of one type.
    pub fn items_of(&self, kind: CreativeType) -> impl Iterator<Item = &AnalyzedCreative> {
        self.items.iter().filter(move |item| item.kind == kind)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::SkipReason;

    fn creative(kind: CreativeType, name: &str) -> AnalyzedCreative {
        AnalyzedCreative {
            id: format!("id-{name}"),
            name: name.to_string(),
            kind,
            size_bytes: 3,
            url: format!("{name}/index.html"),
            preview_url: None,
            embedded_html: None,
            entry_file: format!("{name}/index.html"),
            asset_paths: Vec::new(),
        }
    }

    #[test]
    fn test_counts_and_single_flag() {
        let manifest = Manifest::new(
            "u1".to_string(),
            vec![
                creative(CreativeType::Html, "a"),
                creative(CreativeType::Image, "b"),
                creative(CreativeType::Image, "c"),
            ],
            Summary::default(),
            Vec::new(),
        );
        assert!(!manifest.is_single_creative);
        assert_eq!(
            manifest.counts,
            CreativeCounts {
                images: 2,
                htmls: 1,
                others: 0,
                total: 3
            }
        );
        assert_eq!(manifest.items_of(CreativeType::Image).count(), 2);
    }

    #[test]
    fn test_manifest_wire_format() {
        let mut item = creative(CreativeType::Html, "a");
        item.embedded_html = Some("<p>x</p>".to_string());
        let manifest = Manifest::new(
            "u1".to_string(),
            vec![item],
            Summary {
                total_size: 3,
                processing_time_ms: 7,
                warnings: vec!["w".to_string()],
                errors: Vec::new(),
            },
            vec![SkippedEntry {
                path: "evil.exe".to_string(),
                reason: SkipReason::DisallowedExtension("exe".to_string()),
            }],
        );

        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["uploadId"], "u1");
        assert_eq!(json["isSingleCreative"], true);
        assert_eq!(json["items"][0]["type"], "html");
        assert_eq!(json["items"][0]["sizeBytes"], 3);
        assert_eq!(json["items"][0]["embeddedHtml"], "<p>x</p>");
        assert!(json["items"][0].get("previewUrl").is_none());
        assert_eq!(json["counts"]["htmls"], 1);
        assert_eq!(json["summary"]["processingTimeMs"], 7);
        assert_eq!(json["skipped"][0]["reason"], "disallowed-extension:exe");
    }
}
