//! Type-safe building blocks shared by every ingestion stage.
//!
//! # Design Principles
//!
//! - Type-driven security: an archive path that was not normalized cannot be
//!   represented as a [`SafePath`]
//! - No `From<RawType>` implementations for security types
//! - Extension dispatch is a closed [`ContentKind`] variant

pub mod content_kind;
pub mod entry;
pub mod safe_path;

pub use content_kind::ContentKind;
pub use content_kind::extension_of;
pub use entry::ExtractedEntry;
pub use safe_path::SafePath;
