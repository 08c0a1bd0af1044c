//! Safe extraction of uploads and nested archives.

pub mod archive;
pub mod engine;

pub use archive::OpenArchive;
pub use archive::ReadOutcome;
pub use engine::Extractor;
