//! Removal of active content from HTML.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Captures;
use regex::Regex;

use super::pattern;

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?is)<script\b[^>]*>.*?</script\s*>"));

/// Opening or closing script tags left over after block removal.
static SCRIPT_TAG: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)</?script\b[^>]*>?"));

/// `on*=` and `srcdoc=` attributes with the separator in front of the name.
///
/// `srcdoc` holds an entity-encoded document the browser runs as-is.
static EVENT_HANDLER: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"(?i)([\s/"'])(?:on[a-z]+|srcdoc)\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]*)"#)
});

/// Any attribute with a quoted or bare value.
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"(?i)([a-z][a-z0-9:_-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
});

static CSS_ACTIVE_URL: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"(?i)url\(\s*['"]?\s*(?:javascript|vbscript|data\s*:\s*text/html)[^)]*\)"#)
});

const INERT_URL: &str = "#";

/// Removes scripts, inline event handlers, `srcdoc` documents and
/// script-bearing URLs.
///
/// Runs on every HTML creative whether or not it references assets. The
/// input is never modified; a new string is returned.
///
/// # Examples
///
/// ```
/// use adpack_core::inlining::defang;
///
/// let html = r#"<a href="javascript:steal()" onclick="x()">go</a><script>alert(1)</script>"#;
/// let safe = defang(html);
/// assert_eq!(safe, r##"<a href="#">go</a>"##);
/// ```
#[must_use]
pub fn defang(html: &str) -> String {
    let mut current = SCRIPT_BLOCK.replace_all(html, "").into_owned();
    current = SCRIPT_TAG.replace_all(&current, "").into_owned();

    // Stripping can splice fragments into new handlers
    loop {
        let next = EVENT_HANDLER.replace_all(&current, |caps: &Captures<'_>| {
            // Quotes and slashes still close or separate the previous token
            let separator = &caps[1];
            if separator.trim().is_empty() {
                String::new()
            } else {
                separator.to_string()
            }
        });
        if let Cow::Owned(next) = next {
            current = next;
        } else {
            break;
        }
    }

    current = ATTRIBUTE
        .replace_all(&current, |caps: &Captures<'_>| neutralize_attribute(caps))
        .into_owned();
    CSS_ACTIVE_URL.replace_all(&current, "url(#)").into_owned()
}

fn neutralize_attribute(caps: &Captures<'_>) -> String {
    let value = caps
        .get(2)
        .or_else(|| caps.get(3))
        .or_else(|| caps.get(4))
        .map_or("", |m| m.as_str());

    if is_active_url(value) {
        format!("{}=\"{INERT_URL}\"", &caps[1])
    } else {
        caps[0].to_string()
    }
}

/// Returns `true` for `javascript:`, `vbscript:` and `data:text/html` URLs,
/// including variants obfuscated with whitespace, control characters or
/// numeric entities.
#[must_use]
pub fn is_active_url(value: &str) -> bool {
    let normalized: String = decode_numeric_entities(value)
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    normalized.starts_with("javascript:")
        || normalized.starts_with("vbscript:")
        || normalized.starts_with("data:text/html")
}

fn decode_numeric_entities(value: &str) -> Cow<'_, str> {
    if !value.contains('&') {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match decode_entity(tail) {
            Some((decoded, consumed)) => {
                out.push(decoded);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Decodes one `&#NN;`, `&#xNN;`, `&colon;`, `&tab;` or `&newline;` entity.
fn decode_entity(text: &str) -> Option<(char, usize)> {
    let limit = text.char_indices().nth(12).map_or(text.len(), |(i, _)| i);
    let end = text.find(';').filter(|&end| end <= limit);
    let body = &text[1..end.unwrap_or(limit)];

    let named = match body.to_ascii_lowercase().as_str() {
        "colon" => Some(':'),
        "tab" => Some('\t'),
        "newline" => Some('\n'),
        _ => None,
    };
    if let (Some(c), Some(end)) = (named, end) {
        return Some((c, end + 1));
    }

    let digits = body.strip_prefix('#')?;
    let (radix, digits) = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => (16, hex),
        None => (10, digits),
    };
    // Browsers accept numeric references without the trailing semicolon
    let len = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());
    let code = u32::from_str_radix(&digits[..len], radix).ok()?;
    let prefix = 2 + usize::from(radix == 16);
    let consumed = prefix + len + usize::from(end == Some(prefix + len));
    Some((char::from_u32(code)?, consumed))
}
