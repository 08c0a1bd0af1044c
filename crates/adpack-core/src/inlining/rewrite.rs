//! Rewriting of asset references into data URLs.

use std::collections::HashMap;
use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Captures;
use regex::Regex;
use tracing::debug;

use crate::formats::mime_for_path;
use crate::security::lowercase_key;
use crate::types::ExtractedEntry;
use crate::types::SafePath;

use super::ClaimedAssets;
use super::pattern;
use super::resolve::is_external;
use super::resolve::resolve_reference;

static IMG_SRC: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"(?i)(<img\b[^>]*?\ssrc\s*=\s*)(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
});

static SRCSET: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"(?i)(<(?:img|source)\b[^>]*?\ssrcset\s*=\s*)(?:"([^"]*)"|'([^']*)')"#)
});

static STYLE_ATTR: LazyLock<Regex> =
    LazyLock::new(|| pattern(r#"(?i)(\sstyle\s*=\s*)(?:"([^"]*)"|'([^']*)')"#));

static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?is)(<style\b[^>]*>)(.*?)(</style\s*>)"));

static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^)'"\s]*))\s*\)"#)
});

static LINK_TAG: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)<link\b[^>]*>"));

static LINK_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"(?i)\s(rel|href)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
});

/// Replaces references to group members with base64 data URLs.
///
/// Lookups are case-insensitive. Every reference that resolves to a member
/// is claimed, including ones left in place because the asset is too large.
pub struct AssetInliner<'a, 'c> {
    members: HashMap<String, &'a ExtractedEntry>,
    claimed: &'c mut ClaimedAssets,
    max_inline_bytes: u64,
    /// Directory that root-relative (`/x.png`) references resolve from.
    root_dir: String,
    warnings: Vec<String>,
    embedded: Vec<String>,
}

impl<'a, 'c> AssetInliner<'a, 'c> {
    /// Creates an inliner over the members of one creative group.
    pub fn new(
        members: &[&'a ExtractedEntry],
        claimed: &'c mut ClaimedAssets,
        max_inline_bytes: u64,
        root_dir: &str,
    ) -> Self {
        Self {
            members: members
                .iter()
                .map(|entry| (entry.path.lowercase_key(), *entry))
                .collect(),
            claimed,
            max_inline_bytes,
            root_dir: root_dir.to_string(),
            warnings: Vec::new(),
            embedded: Vec::new(),
        }
    }

    /// Makes each alias path resolve to the given entry.
    ///
    /// Used for members dropped as duplicates of an entry elsewhere in the
    /// upload.
    #[must_use]
    pub fn with_aliases(mut self, aliases: &[(&SafePath, &'a ExtractedEntry)]) -> Self {
        for (path, entry) in aliases {
            self.members
                .entry(path.lowercase_key())
                .or_insert(*entry);
        }
        self
    }

    /// Consumes the inliner, returning its warnings and the embedded paths.
    pub fn finish(self) -> (Vec<String>, Vec<String>) {
        (self.warnings, self.embedded)
    }

    /// Rewrites `<img src>`, `srcset`, `style` attributes, `<style>` blocks
    /// and stylesheet links of an HTML document located in `base_dir`.
    pub fn rewrite_html(&mut self, html: &str, base_dir: &str) -> String {
        let html = LINK_TAG
            .replace_all(html, |caps: &Captures<'_>| self.inline_stylesheet(&caps[0], base_dir))
            .into_owned();

        let html = IMG_SRC
            .replace_all(&html, |caps: &Captures<'_>| {
                let (value, quote) = quoted_value(caps);
                let url = self.data_url_or(value, base_dir);
                format!("{}{quote}{url}{quote}", &caps[1])
            })
            .into_owned();

        let html = SRCSET
            .replace_all(&html, |caps: &Captures<'_>| {
                let (value, quote) = quoted_value(caps);
                let rewritten = self.rewrite_srcset(value, base_dir);
                format!("{}{quote}{rewritten}{quote}", &caps[1])
            })
            .into_owned();

        let html = STYLE_ATTR
            .replace_all(&html, |caps: &Captures<'_>| {
                let (value, quote) = quoted_value(caps);
                let rewritten = self.rewrite_css(value, base_dir);
                format!("{}{quote}{rewritten}{quote}", &caps[1])
            })
            .into_owned();

        STYLE_BLOCK
            .replace_all(&html, |caps: &Captures<'_>| {
                let css = self.rewrite_css(&caps[2], base_dir);
                format!("{}{css}{}", &caps[1], &caps[3])
            })
            .into_owned()
    }

    /// Rewrites every `url(...)` in a stylesheet located in `base_dir`.
    pub fn rewrite_css(&mut self, css: &str, base_dir: &str) -> String {
        CSS_URL
            .replace_all(css, |caps: &Captures<'_>| {
                let reference = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .or_else(|| caps.get(3))
                    .map_or("", |m| m.as_str());
                match self.embed(reference, base_dir) {
                    // Data URLs contain no characters that need quoting
                    Some(url) => format!("url({url})"),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    fn rewrite_srcset(&mut self, srcset: &str, base_dir: &str) -> String {
        srcset
            .split(',')
            .map(|candidate| {
                let trimmed = candidate.trim_start();
                let leading = &candidate[..candidate.len() - trimmed.len()];
                let (url, descriptor) = trimmed
                    .split_once(char::is_whitespace)
                    .map_or((trimmed, ""), |(url, rest)| (url, rest));
                match self.embed(url, base_dir) {
                    Some(data) if descriptor.is_empty() => format!("{leading}{data}"),
                    Some(data) => format!("{leading}{data} {descriptor}"),
                    None => candidate.to_string(),
                }
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    fn inline_stylesheet(&mut self, tag: &str, base_dir: &str) -> String {
        let mut rel = None;
        let mut href = None;
        for caps in LINK_ATTR.captures_iter(tag) {
            let (value, _) = quoted_value_from(&caps, 2);
            match caps[1].to_ascii_lowercase().as_str() {
                "rel" => rel = Some(value.to_ascii_lowercase()),
                _ => href = Some(value.to_string()),
            }
        }

        let is_stylesheet = rel.is_some_and(|rel| rel.split_whitespace().any(|r| r == "stylesheet"));
        let Some(href) = href.filter(|_| is_stylesheet) else {
            return tag.to_string();
        };
        let Some(entry) = self.lookup(&href, base_dir) else {
            return tag.to_string();
        };
        if !self.fits(entry) {
            return tag.to_string();
        }

        let css_dir = entry.path.parent().to_string();
        let css = self.rewrite_css(&entry.text(), &css_dir);
        self.embedded.push(entry.path.to_string());
        format!("<style>{css}</style>")
    }

    fn data_url_or(&mut self, reference: &str, base_dir: &str) -> String {
        self.embed(reference, base_dir)
            .unwrap_or_else(|| reference.to_string())
    }

    /// Returns a data URL for `reference`, claiming the asset if it resolves.
    fn embed(&mut self, reference: &str, base_dir: &str) -> Option<String> {
        let entry = self.lookup(reference, base_dir)?;
        if !self.fits(entry) {
            return None;
        }
        self.embedded.push(entry.path.to_string());
        Some(format!(
            "data:{};base64,{}",
            mime_for_path(entry.path.as_str()),
            STANDARD.encode(&entry.content)
        ))
    }

    /// Resolves and claims a reference; warns when it names a missing file.
    fn lookup(&mut self, reference: &str, base_dir: &str) -> Option<&'a ExtractedEntry> {
        if is_external(reference) {
            return None;
        }
        let Some(resolved) = resolve_reference(reference, base_dir, &self.root_dir) else {
            self.warnings
                .push(format!("unresolved reference '{reference}': escapes the archive root"));
            return None;
        };

        match self.members.get(&lowercase_key(&resolved)).copied() {
            Some(entry) => {
                self.claimed.claim(&resolved);
                Some(entry)
            }
            None => {
                debug!(target: "adpack::inline", %reference, %resolved, "asset not found");
                self.warnings
                    .push(format!("unresolved reference '{reference}': {resolved} not found"));
                None
            }
        }
    }

    fn fits(&mut self, entry: &ExtractedEntry) -> bool {
        if entry.size <= self.max_inline_bytes {
            return true;
        }
        self.warnings.push(format!(
            "asset {} not embedded: {} bytes exceeds inline limit of {}",
            entry.path, entry.size, self.max_inline_bytes
        ));
        false
    }
}

/// Returns the captured attribute value and the quote it used.
fn quoted_value<'h>(caps: &Captures<'h>) -> (&'h str, &'static str) {
    quoted_value_from(caps, 2)
}

fn quoted_value_from<'h>(caps: &Captures<'h>, first: usize) -> (&'h str, &'static str) {
    if let Some(m) = caps.get(first) {
        (m.as_str(), "\"")
    } else if let Some(m) = caps.get(first + 1) {
        (m.as_str(), "'")
    } else {
        (caps.get(first + 2).map_or("", |m| m.as_str()), "")
    }
}
