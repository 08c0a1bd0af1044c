//! Content hashing and request-scoped deduplication.

use std::collections::HashMap;

use sha2::Digest;
use sha2::Sha256;

/// Returns the lower-case hex SHA-256 digest of `data`.
#[must_use]
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Content hashes already emitted in one request, each mapped to the index
/// of the entry that first carried it.
#[derive(Debug, Default)]
pub struct DedupSet {
    seen: HashMap<String, usize>,
}

impl DedupSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `hash` for the entry at `index`.
    ///
    /// Returns the index of the earlier entry when the hash was already seen.
    pub fn insert(&mut self, hash: &str, index: usize) -> Option<usize> {
        if let Some(&original) = self.seen.get(hash) {
            return Some(original);
        }
        self.seen.insert(hash.to_string(), index);
        None
    }

    /// Returns the number of distinct hashes recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns `true` if no hash has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
