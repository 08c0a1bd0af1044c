//! Content-based MIME detection.

use super::mime::OCTET_STREAM;
use super::mime::is_textual;
use super::mime::mime_for_path;

/// Number of leading bytes inspected when deciding whether content is text.
const TEXT_SNIFF_LEN: usize = 8192;

/// Detects the MIME type of entry content.
///
/// The filename is only a hint: implementations must not report a type the
/// bytes contradict.
pub trait MimeDetector: Send + Sync {
    /// Returns the detected MIME type.
    fn detect(&self, bytes: &[u8], filename_hint: &str) -> String;
}

/// Magic-number detector with text heuristics.
///
/// Binary formats are recognized by signature. Text is classified as HTML
/// or SVG by its markup, otherwise by the hint's extension when that
/// extension names a text type, otherwise `text/plain`. Unrecognized binary
/// content is `application/octet-stream` regardless of its name.
///
/// # Examples
///
/// ```
/// use adpack_core::formats::MagicDetector;
/// use adpack_core::formats::MimeDetector;
///
/// let detector = MagicDetector;
/// assert_eq!(detector.detect(b"\x89PNG\r\n\x1a\n....", "x.txt"), "image/png");
/// assert_eq!(detector.detect(b"<!DOCTYPE html><p>hi</p>", "x.png"), "text/html");
/// assert_ne!(detector.detect(b"MZ\x90\x00\x03\x00\x00\x00", "banner.png"), "image/png");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MagicDetector;

impl MimeDetector for MagicDetector {
    fn detect(&self, bytes: &[u8], filename_hint: &str) -> String {
        if let Some(kind) = infer::get(bytes) {
            return canonical_mime(kind.mime_type(), bytes, filename_hint).to_string();
        }
        if is_eot(bytes) {
            return "application/vnd.ms-fontobject".to_string();
        }
        if looks_like_text(bytes) {
            return sniff_text(bytes, filename_hint).to_string();
        }
        OCTET_STREAM.to_string()
    }
}

fn canonical_mime<'a>(detected: &'a str, bytes: &[u8], hint: &str) -> &'a str {
    match detected {
        "image/vnd.microsoft.icon" => "image/x-icon",
        "application/font-woff" | "application/font-sfnt" | "font/woff" | "font/woff2"
        | "font/ttf" | "font/otf" => font_mime(bytes, hint),
        "text/xml" | "application/xml" if has_svg_root(bytes) => "image/svg+xml",
        "text/xml" | "application/xml" => "text/plain",
        other => other,
    }
}

fn font_mime(bytes: &[u8], hint: &str) -> &'static str {
    match bytes.get(..4) {
        Some(b"wOFF") => "font/woff",
        Some(b"wOF2") => "font/woff2",
        Some(b"OTTO") => "font/otf",
        _ if mime_for_path(hint) == "font/otf" => "font/otf",
        _ => "font/ttf",
    }
}

/// Embedded OpenType: version at offset 8, `LP` magic at offset 34.
fn is_eot(bytes: &[u8]) -> bool {
    bytes.get(34..36) == Some(b"LP")
        && matches!(bytes.get(8..12), Some([_, _, 0x00 | 0x01 | 0x02, 0x00]))
}

fn looks_like_text(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(TEXT_SNIFF_LEN)];
    if head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        // A multi-byte sequence may be cut at the sniff boundary
        Err(err) => err.error_len().is_none(),
    }
}

fn sniff_text(bytes: &[u8], hint: &str) -> &'static str {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(TEXT_SNIFF_LEN)]).to_lowercase();
    let trimmed = head.trim_start_matches('\u{feff}').trim_start();

    if trimmed.starts_with("<!doctype html")
        || trimmed.starts_with("<html")
        || trimmed.starts_with("<head")
        || trimmed.starts_with("<body")
    {
        return "text/html";
    }
    if trimmed.starts_with("<svg") || (trimmed.starts_with("<?xml") && trimmed.contains("<svg")) {
        return "image/svg+xml";
    }

    let by_name = mime_for_path(hint);
    if is_textual(by_name) {
        by_name
    } else {
        "text/plain"
    }
}

fn has_svg_root(bytes: &[u8]) -> bool {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(TEXT_SNIFF_LEN)]);
    head.to_lowercase().contains("<svg")
}
