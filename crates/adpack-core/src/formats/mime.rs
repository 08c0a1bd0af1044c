//! Extension to MIME type table.

use crate::types::extension_of;

/// Fallback for unknown extensions.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Returns the MIME type for a lower-cased extension, if known.
#[must_use]
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    let mime = match ext {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "txt" => "text/plain",
        "json" => "application/json",
        "zip" => "application/zip",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "avif" => "image/avif",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        _ => return None,
    };
    Some(mime)
}

/// Returns the MIME type implied by a path's extension.
///
/// Unknown or missing extensions map to `application/octet-stream`.
///
/// # Examples
///
/// ```
/// use adpack_core::formats::mime_for_path;
///
/// assert_eq!(mime_for_path("img/Logo.PNG"), "image/png");
/// assert_eq!(mime_for_path("fonts/a.woff2"), "font/woff2");
/// assert_eq!(mime_for_path("Makefile"), "application/octet-stream");
/// ```
#[must_use]
pub fn mime_for_path(path: &str) -> &'static str {
    extension_of(path)
        .and_then(|ext| mime_for_extension(&ext))
        .unwrap_or(OCTET_STREAM)
}

/// Returns `true` for MIME types whose content is text.
#[must_use]
pub fn is_textual(mime: &str) -> bool {
    mime.starts_with("text/") || mime == "application/json" || mime == "image/svg+xml"
}
