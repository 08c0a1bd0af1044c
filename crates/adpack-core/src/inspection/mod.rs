//! Archive inspection without decompression.

pub(crate) mod records;

mod preview;

pub use preview::CentralDirectoryEntry;
pub use preview::PreviewResult;
pub use preview::PreviewTotals;
pub use preview::Suspicion;
pub use preview::preview_archive;
