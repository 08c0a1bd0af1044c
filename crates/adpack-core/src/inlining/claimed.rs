//! Request-scoped set of assets embedded into HTML creatives.

use std::collections::HashSet;

use crate::security::lowercase_key;

/// Paths of entries embedded into some HTML creative.
///
/// Keys are lower-cased. One set lives for exactly one ingestion request
/// and is passed by reference into every inlining call of that request.
///
/// # Examples
///
/// ```
/// use adpack_core::inlining::ClaimedAssets;
///
/// let mut claimed = ClaimedAssets::new();
/// claimed.claim("Banner/IMG/Logo.png");
/// assert!(claimed.is_claimed("banner/img/logo.PNG"));
/// ```
#[derive(Debug, Default, Clone)]
pub struct ClaimedAssets {
    paths: HashSet<String>,
}

impl ClaimedAssets {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `path` as claimed. Returns `true` if it was not claimed before.
    pub fn claim(&mut self, path: &str) -> bool {
        self.paths.insert(lowercase_key(path))
    }

    /// Returns `true` if `path` was claimed, ignoring case.
    #[must_use]
    pub fn is_claimed(&self, path: &str) -> bool {
        self.paths.contains(&lowercase_key(path))
    }

    /// Returns the number of claimed paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns `true` if nothing was claimed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
