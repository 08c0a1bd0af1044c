//! HTML asset inlining.
//!
//! Turns an HTML creative into a self-contained document:
//!
//! 1. Active content is removed ([`defang`]) before anything else
//! 2. `<link rel="stylesheet">` tags resolving to group members become
//!    `<style>` blocks
//! 3. `<img src>`, `srcset` candidates and CSS `url(...)` references are
//!    replaced by base64 data URLs
//!
//! Every reference that resolves to a member is recorded in the
//! request-scoped [`ClaimedAssets`] set, so the asset is never surfaced as
//! a separate creative.

mod claimed;
mod defang;
mod resolve;
mod rewrite;

pub use claimed::ClaimedAssets;
pub use defang::defang;
pub use defang::is_active_url;
pub use resolve::is_external;
pub use resolve::resolve_reference;
pub use rewrite::AssetInliner;

use regex::Regex;
use tracing::debug;

use crate::types::ExtractedEntry;
use crate::types::SafePath;

/// Output of [`inline_html`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineResult {
    /// Defanged HTML with embedded assets.
    pub html: String,
    /// One message per reference that could not be embedded.
    pub warnings: Vec<String>,
    /// Paths of members embedded into `html`, in order of first use.
    pub embedded: Vec<String>,
}

/// Defangs `html` and embeds every asset it references from `members`.
///
/// Relative references resolve against the directory of `html_path`;
/// root-relative ones (`/img/a.png`) resolve from the top-level folder of
/// the creative. `aliases` maps paths of deduplicated members to the entry
/// that was kept. Never fails: unresolved or oversized assets leave their
/// reference unchanged and add a warning.
///
/// # Examples
///
/// ```
/// use adpack_core::inlining::ClaimedAssets;
/// use adpack_core::inlining::inline_html;
/// use adpack_core::types::ExtractedEntry;
/// use adpack_core::types::SafePath;
///
/// let logo = ExtractedEntry {
///     path: SafePath::normalize("banner/img/logo.png").unwrap(),
///     size: 3,
///     content: b"png".to_vec(),
///     content_hash: String::new(),
///     mime: "image/png".to_string(),
///     depth: 0,
/// };
/// let page = SafePath::normalize("banner/index.html").unwrap();
/// let mut claimed = ClaimedAssets::new();
///
/// let result = inline_html(
///     r#"<img src="./img/logo.png" onclick="x()">"#,
///     &page,
///     &[&logo],
///     &[],
///     &mut claimed,
///     1024,
/// );
/// assert_eq!(result.html, r#"<img src="data:image/png;base64,cG5n">"#);
/// assert!(claimed.is_claimed("banner/img/logo.png"));
/// ```
#[must_use]
pub fn inline_html(
    html: &str,
    html_path: &SafePath,
    members: &[&ExtractedEntry],
    aliases: &[(&SafePath, &ExtractedEntry)],
    claimed: &mut ClaimedAssets,
    max_inline_bytes: u64,
) -> InlineResult {
    let safe = defang(html);

    let root_dir = html_path.top_level_dir().unwrap_or_default();
    let mut inliner =
        AssetInliner::new(members, claimed, max_inline_bytes, root_dir).with_aliases(aliases);
    let html = inliner.rewrite_html(&safe, html_path.parent());
    let (warnings, embedded) = inliner.finish();

    debug!(
        target: "adpack::inline",
        path = %html_path,
        embedded = embedded.len(),
        warnings = warnings.len(),
        "inlined html"
    );

    InlineResult {
        html,
        warnings,
        embedded,
    }
}

/// Compiles a pattern known at compile time.
#[allow(clippy::expect_used)]
pub(crate) fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("static pattern is valid")
}
