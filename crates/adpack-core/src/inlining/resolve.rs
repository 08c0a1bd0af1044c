//! Resolution of relative asset references.

use std::borrow::Cow;

/// Returns `true` for references that point outside the archive.
///
/// Any `scheme:` prefix, protocol-relative `//host` URLs and fragment-only
/// anchors are external.
#[must_use]
pub fn is_external(reference: &str) -> bool {
    let reference = reference.trim();
    if reference.is_empty() || reference.starts_with("//") || reference.starts_with('#') {
        return true;
    }
    match reference.find(':') {
        Some(colon) => {
            let scheme = &reference[..colon];
            // Single letters are drive prefixes, not schemes
            scheme.len() > 1
                && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Resolves `reference` against the directory `base_dir`.
///
/// Query strings and fragments are dropped and percent-escapes decoded.
/// A reference starting with `/` resolves from `root_dir` instead. Returns
/// `None` for external references and for references that climb above the
/// archive root.
///
/// # Examples
///
/// ```
/// use adpack_core::inlining::resolve_reference;
///
/// assert_eq!(
///     resolve_reference("./img/logo%20big.png?v=2", "banner", "banner").as_deref(),
///     Some("banner/img/logo big.png")
/// );
/// assert_eq!(
///     resolve_reference("../shared/a.css", "banner/css", "banner").as_deref(),
///     Some("banner/shared/a.css")
/// );
/// assert_eq!(resolve_reference("https://cdn.example/a.png", "banner", "banner"), None);
/// assert_eq!(resolve_reference("../../x.png", "banner", "banner"), None);
/// ```
#[must_use]
pub fn resolve_reference(reference: &str, base_dir: &str, root_dir: &str) -> Option<String> {
    let reference = decode_entities(reference.trim());
    if is_external(&reference) {
        return None;
    }

    let without_fragment = reference.split(['?', '#']).next().unwrap_or_default();
    let decoded = urlencoding::decode(without_fragment)
        .unwrap_or(Cow::Borrowed(without_fragment));
    let decoded = decoded.replace('\\', "/");

    let (start, relative) = match decoded.strip_prefix('/') {
        Some(rest) => (root_dir, rest),
        None => (base_dir, decoded.as_str()),
    };

    let mut segments: Vec<&str> = start.split('/').filter(|s| !s.is_empty()).collect();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}

/// Decodes the few entities that commonly appear inside attribute URLs.
fn decode_entities(value: &str) -> Cow<'_, str> {
    if !value.contains('&') {
        return Cow::Borrowed(value);
    }
    Cow::Owned(
        value
            .replace("&amp;", "&")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&apos;", "'"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_references() {
        for reference in [
            "http://a/b.png",
            "HTTPS://a/b.png",
            "data:image/png;base64,AAAA",
            "mailto:x@y.z",
            "javascript:alert(1)",
            "//cdn.example/x.png",
            "#top",
            "",
        ] {
            assert!(is_external(reference), "{reference}");
        }
        assert!(!is_external("img/a.png"));
        assert!(!is_external("C:/a.png"));
    }

    #[test]
    fn test_resolve_relative() {
        assert_eq!(
            resolve_reference("img/logo.png", "banner", "banner").as_deref(),
            Some("banner/img/logo.png")
        );
        assert_eq!(
            resolve_reference("logo.png", "", "").as_deref(),
            Some("logo.png")
        );
    }

    #[test]
    fn test_resolve_root_relative() {
        assert_eq!(
            resolve_reference("/img/a.png", "banner/pages", "banner").as_deref(),
            Some("banner/img/a.png")
        );
    }

    #[test]
    fn test_resolve_strips_query_and_fragment() {
        assert_eq!(
            resolve_reference("a.png#frag", "b", "b").as_deref(),
            Some("b/a.png")
        );
        assert_eq!(
            resolve_reference("a.css?x=1&amp;y=2", "b", "b").as_deref(),
            Some("b/a.css")
        );
    }

    #[test]
    fn test_resolve_rejects_escape() {
        assert_eq!(resolve_reference("../a.png", "", ""), None);
        assert_eq!(resolve_reference("..", "banner", "banner"), None);
    }
}
