//! Partitioning of extracted entries into creatives.
//!
//! A creative is keyed by the first path segment of its members, or by the
//! file stem for top-level files. Each group is classified and gets one
//! canonical entry file:
//!
//! | Members contain | Type    | Canonical entry                               |
//! |-----------------|---------|-----------------------------------------------|
//! | any HTML        | `html`  | first preferred filename, else first HTML     |
//! | images, no HTML | `image` | first image                                   |
//! | neither         | `other` | first effective member                        |

use std::collections::HashMap;

use serde::Serialize;

use crate::inlining::ClaimedAssets;
use crate::types::ContentKind;
use crate::types::ExtractedEntry;
use crate::types::SafePath;

/// Classified type of a creative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CreativeType {
    /// HTML document with its assets.
    Html,
    /// Single image.
    Image,
    /// Anything else.
    Other,
}

impl CreativeType {
    /// Returns the wire name of this type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Image => "image",
            Self::Other => "other",
        }
    }
}

/// Returns the group key of a path.
///
/// # Examples
///
/// ```
/// use adpack_core::grouping::group_key;
/// use adpack_core::types::SafePath;
///
/// let nested = SafePath::normalize("summer/img/logo.png").unwrap();
/// assert_eq!(group_key(&nested), "summer");
///
/// let bare = SafePath::normalize("banner.v2.html").unwrap();
/// assert_eq!(group_key(&bare), "banner.v2");
/// ```
#[must_use]
pub fn group_key(path: &SafePath) -> &str {
    path.top_level_dir().unwrap_or_else(|| path.file_stem())
}

/// A set of entries forming one logical creative.
#[derive(Debug, Clone)]
pub struct CreativeGroup<'a> {
    /// Group key (top-level folder or bare file stem).
    pub key: String,
    /// All members in discovery order.
    pub members: Vec<&'a ExtractedEntry>,
    /// Classified type.
    pub kind: CreativeType,
    /// Entry file of the creative.
    pub canonical: &'a ExtractedEntry,
    /// Members that make up the creative; text companions of HTML are dropped.
    pub effective: Vec<&'a ExtractedEntry>,
}

impl CreativeGroup<'_> {
    /// Returns the sum of the effective members' sizes.
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.effective.iter().map(|entry| entry.size).sum()
    }

    /// Returns the paths of the effective members other than the canonical one.
    #[must_use]
    pub fn asset_paths(&self) -> Vec<String> {
        self.effective
            .iter()
            .filter(|entry| entry.path != self.canonical.path)
            .map(|entry| entry.path.to_string())
            .collect()
    }
}

/// Groups `entries` into creatives, preserving first-seen group order.
///
/// `preferences` are lower-case filenames (`index.html`, ...) tried in order
/// when choosing the entry file of an HTML group.
#[must_use]
pub fn group_entries<'a>(
    entries: &'a [ExtractedEntry],
    preferences: &[String],
) -> Vec<CreativeGroup<'a>> {
    let mut order: Vec<(String, Vec<&'a ExtractedEntry>)> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();

    for entry in entries {
        let key = group_key(&entry.path);
        let slot = *index.entry(key).or_insert_with(|| {
            order.push((key.to_string(), Vec::new()));
            order.len() - 1
        });
        order[slot].1.push(entry);
    }

    order
        .into_iter()
        .filter_map(|(key, members)| classify(key, members, preferences))
        .collect()
}

fn classify<'a>(
    key: String,
    members: Vec<&'a ExtractedEntry>,
    preferences: &[String],
) -> Option<CreativeGroup<'a>> {
    let of_kind = |kind: ContentKind| -> Vec<&'a ExtractedEntry> {
        members
            .iter()
            .copied()
            .filter(|entry| entry.kind() == kind)
            .collect()
    };
    let htmls = of_kind(ContentKind::Html);
    let images = of_kind(ContentKind::Image);

    let effective: Vec<&'a ExtractedEntry> = if htmls.is_empty() {
        members.clone()
    } else {
        members
            .iter()
            .copied()
            .filter(|entry| entry.kind() != ContentKind::Text)
            .collect()
    };

    let (kind, canonical) = if let Some(&first_html) = htmls.first() {
        let preferred = preferences
            .iter()
            .find_map(|pref| htmls.iter().copied().find(|html| matches_preference(html, pref)));
        (CreativeType::Html, preferred.unwrap_or(first_html))
    } else if let Some(&first_image) = images.first() {
        (CreativeType::Image, first_image)
    } else {
        (CreativeType::Other, *effective.first()?)
    };

    Some(CreativeGroup {
        key,
        members,
        kind,
        canonical,
        effective,
    })
}

fn matches_preference(entry: &ExtractedEntry, preference: &str) -> bool {
    let path = entry.path.lowercase_key();
    let preference = preference.to_lowercase();
    path == preference || path.ends_with(&format!("/{preference}"))
}

/// Returns every image that no HTML creative embedded and that is not the
/// canonical entry of an image group, in group order.
#[must_use]
pub fn standalone_images<'a>(
    groups: &[CreativeGroup<'a>],
    claimed: &ClaimedAssets,
) -> Vec<&'a ExtractedEntry> {
    groups
        .iter()
        .flat_map(|group| {
            group.members.iter().copied().filter(move |entry| {
                entry.kind() == ContentKind::Image
                    && !(group.kind == CreativeType::Image && entry.path == group.canonical.path)
            })
        })
        .filter(|entry| !claimed.is_claimed(entry.path.as_str()))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entry(path: &str, size: usize) -> ExtractedEntry {
        ExtractedEntry {
            path: SafePath::normalize(path).unwrap(),
            size: size as u64,
            content: vec![b'x'; size],
            content_hash: path.to_string(),
            mime: String::new(),
            depth: 0,
        }
    }

    fn prefs() -> Vec<String> {
        vec!["index.html".to_string(), "main.html".to_string()]
    }

    #[test]
    fn test_groups_by_folder_and_stem() {
        let entries = vec![
            entry("spring/index.html", 10),
            entry("logo.png", 5),
            entry("spring/img/a.png", 3),
            entry("logo.txt", 1),
        ];
        let groups = group_entries(&entries, &prefs());
        let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["spring", "logo"]);
        assert_eq!(groups[0].members.len(), 2);
        assert_eq!(groups[1].members.len(), 2);
    }

    #[test]
    fn test_text_companion_dropped_next_to_html() {
        let entries = vec![entry("report/report.html", 10), entry("report/report.txt", 4)];
        let groups = group_entries(&entries, &prefs());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].kind, CreativeType::Html);
        assert_eq!(groups[0].effective.len(), 1);
        assert_eq!(groups[0].size_bytes(), 10);
        assert!(groups[0].asset_paths().is_empty());
    }

    #[test]
    fn test_bare_files_with_same_stem_share_group() {
        let entries = vec![entry("report.html", 10), entry("report.txt", 4)];
        let groups = group_entries(&entries, &prefs());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].canonical.path.as_str(), "report.html");
        assert_eq!(groups[0].effective.len(), 1);
    }

    #[test]
    fn test_canonical_prefers_index() {
        let entries = vec![
            entry("c/about.html", 1),
            entry("c/sub/INDEX.HTML", 1),
            entry("c/main.html", 1),
        ];
        let groups = group_entries(&entries, &prefs());
        assert_eq!(groups[0].canonical.path.as_str(), "c/sub/INDEX.HTML");
    }

    #[test]
    fn test_canonical_falls_back_to_first_html() {
        let entries = vec![entry("c/a.png", 1), entry("c/b.htm", 1), entry("c/c.html", 1)];
        let groups = group_entries(&entries, &prefs());
        assert_eq!(groups[0].kind, CreativeType::Html);
        assert_eq!(groups[0].canonical.path.as_str(), "c/b.htm");
    }

    #[test]
    fn test_image_and_other_groups() {
        let entries = vec![
            entry("pics/readme.txt", 1),
            entry("pics/a.jpg", 2),
            entry("fonts/a.woff2", 3),
            entry("fonts/b.css", 4),
        ];
        let groups = group_entries(&entries, &prefs());
        assert_eq!(groups[0].kind, CreativeType::Image);
        assert_eq!(groups[0].canonical.path.as_str(), "pics/a.jpg");
        assert_eq!(groups[0].size_bytes(), 3);
        assert_eq!(groups[1].kind, CreativeType::Other);
        assert_eq!(groups[1].canonical.path.as_str(), "fonts/a.woff2");
        assert_eq!(groups[1].asset_paths(), vec!["fonts/b.css"]);
    }

    #[test]
    fn test_standalone_images_exclude_claimed_and_canonical() {
        let entries = vec![
            entry("c/index.html", 1),
            entry("c/img/used.png", 1),
            entry("c/img/unused.png", 1),
            entry("gallery/a.png", 1),
            entry("gallery/b.png", 1),
        ];
        let groups = group_entries(&entries, &prefs());
        let mut claimed = ClaimedAssets::new();
        claimed.claim("C/IMG/USED.PNG");

        let standalone: Vec<&str> = standalone_images(&groups, &claimed)
            .iter()
            .map(|e| e.path.as_str())
            .collect();
        assert_eq!(standalone, vec!["c/img/unused.png", "gallery/b.png"]);
    }

    #[test]
    fn test_creative_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&CreativeType::Html).unwrap(), "\"html\"");
        assert_eq!(CreativeType::Other.as_str(), "other");
    }
}
