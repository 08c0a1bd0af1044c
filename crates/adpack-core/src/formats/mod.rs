//! Content type detection.

pub mod detect;
pub mod mime;

pub use detect::MagicDetector;
pub use detect::MimeDetector;
pub use mime::mime_for_extension;
pub use mime::mime_for_path;
