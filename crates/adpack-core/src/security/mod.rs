//! Security validation modules.

pub mod dedup;
pub mod encryption;
pub mod path;
pub mod quota;
pub mod zipbomb;

// Re-export public types and functions
pub use dedup::DedupSet;
pub use dedup::content_hash;
pub use encryption::EncryptionGate;
pub use encryption::EntryAccess;
pub use path::is_noise;
pub use path::lowercase_key;
pub use path::normalize_path;
pub use quota::QuotaTracker;
pub use quota::check_depth;
pub use zipbomb::expansion_ratio;
pub use zipbomb::validate_preview;
