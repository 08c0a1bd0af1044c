//! Ingestion configuration.

use std::fmt;
use std::str::FromStr;

/// What to do with encrypted archive entries.
///
/// The mode is always chosen by configuration, never inferred from the
/// archive contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncryptedPolicy {
    /// Record every encrypted entry as skipped and continue.
    #[default]
    Skip,
    /// Abort the whole request if any entry is encrypted.
    Error,
    /// Decrypt with the password supplied alongside the upload.
    Attempt,
}

impl EncryptedPolicy {
    /// Returns the configuration name of this policy.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Error => "error",
            Self::Attempt => "attempt",
        }
    }
}

impl fmt::Display for EncryptedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EncryptedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "error" => Ok(Self::Error),
            "attempt" => Ok(Self::Attempt),
            other => Err(format!(
                "unknown encrypted entry policy '{other}' (expected skip, error or attempt)"
            )),
        }
    }
}

/// Expansion ratios above which an archive is considered suspicious.
///
/// Both ratios are `uncompressed / max(1, compressed)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpansionThresholds {
    /// Ratio at or above which a single entry is flagged.
    pub entry_ratio: f64,
    /// Ratio at or above which the whole archive is flagged.
    pub overall_ratio: f64,
}

impl Default for ExpansionThresholds {
    fn default() -> Self {
        Self {
            entry_ratio: 50.0,
            overall_ratio: 100.0,
        }
    }
}

/// Ingestion configuration with default-deny settings.
///
/// One configuration may be shared by many requests; all mutable tracking
/// state (counters, hash sets, claimed assets) lives in per-request objects.
///
/// # Examples
///
/// ```
/// use adpack_core::IngestConfig;
/// use adpack_core::EncryptedPolicy;
///
/// let config = IngestConfig::default()
///     .with_max_file_count(200)
///     .with_encrypted_policy(EncryptedPolicy::Error);
/// assert_eq!(config.max_file_count, 200);
/// ```
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Maximum number of files processed across the whole request.
    pub max_file_count: usize,

    /// Maximum cumulative decompressed bytes across the whole request.
    pub max_total_size: u64,

    /// Maximum decompressed size of a single entry in bytes.
    pub max_file_size: u64,

    /// Maximum nesting depth of ZIP archives inside the upload (root is 0).
    pub max_depth: usize,

    /// Lower-cased extensions (without dot) accepted before decompression.
    pub allowed_extensions: Vec<String>,

    /// MIME types accepted after content sniffing.
    pub allowed_mime_types: Vec<String>,

    /// Run the virus scanner on every emitted entry.
    pub enable_virus_scan: bool,

    /// Drop entries whose content hash was already seen in the request.
    pub dedup: bool,

    /// Handling of encrypted entries.
    pub encrypted_policy: EncryptedPolicy,

    /// Zip bomb suspicion thresholds used by the previewer.
    pub expansion: ExpansionThresholds,

    /// Abort before extraction when the archive as a whole is suspicious.
    pub refuse_suspicious_archives: bool,

    /// Ordered filename preferences used to pick an HTML creative's entry file.
    pub entry_preferences: Vec<String>,

    /// Assets larger than this are claimed but not embedded as data URLs.
    pub max_inline_asset_bytes: u64,
}

const DEFAULT_EXTENSIONS: &[&str] = &[
    "html", "htm", "png", "jpg", "jpeg", "gif", "webp", "svg", "bmp", "ico", "css", "txt", "zip",
    "woff", "woff2", "ttf", "otf", "eot", "json",
];

const DEFAULT_MIME_TYPES: &[&str] = &[
    "text/html",
    "text/css",
    "text/plain",
    "application/json",
    "application/zip",
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "image/svg+xml",
    "image/bmp",
    "image/x-icon",
    "font/woff",
    "font/woff2",
    "font/ttf",
    "font/otf",
    "application/vnd.ms-fontobject",
];

impl Default for IngestConfig {
    /// Creates an `IngestConfig` with secure default settings.
    ///
    /// Default values:
    /// - `max_file_count`: 500
    /// - `max_total_size`: 200 MB
    /// - `max_file_size`: 25 MB
    /// - `max_depth`: 3
    /// - `enable_virus_scan`: false
    /// - `dedup`: true
    /// - `encrypted_policy`: skip
    /// - `expansion`: 50x per entry, 100x overall
    /// - `refuse_suspicious_archives`: true
    /// - `entry_preferences`: `index.html`, `index.htm`, `main.html`, `main.htm`
    /// - `max_inline_asset_bytes`: 5 MB
    fn default() -> Self {
        Self {
            max_file_count: 500,
            max_total_size: 200 * 1024 * 1024,
            max_file_size: 25 * 1024 * 1024,
            max_depth: 3,
            allowed_extensions: DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect(),
            allowed_mime_types: DEFAULT_MIME_TYPES.iter().map(ToString::to_string).collect(),
            enable_virus_scan: false,
            dedup: true,
            encrypted_policy: EncryptedPolicy::Skip,
            expansion: ExpansionThresholds::default(),
            refuse_suspicious_archives: true,
            entry_preferences: vec![
                "index.html".to_string(),
                "index.htm".to_string(),
                "main.html".to_string(),
                "main.htm".to_string(),
            ],
            max_inline_asset_bytes: 5 * 1024 * 1024,
        }
    }
}

impl IngestConfig {
    /// Creates a permissive configuration for trusted uploads.
    ///
    /// Every extension and MIME type is accepted, suspicious archives are
    /// processed anyway and limits are raised. Use only for archives from
    /// trusted sources.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            max_file_count: 10_000,
            max_total_size: 1024 * 1024 * 1024,
            max_file_size: 200 * 1024 * 1024,
            allowed_extensions: Vec::new(),
            allowed_mime_types: Vec::new(),
            refuse_suspicious_archives: false,
            ..Default::default()
        }
    }

    /// Validates whether a file extension is allowed (empty list = allow all).
    #[must_use]
    pub fn is_extension_allowed(&self, extension: &str) -> bool {
        if self.allowed_extensions.is_empty() {
            return true;
        }
        self.allowed_extensions
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }

    /// Validates whether a detected MIME type is allowed (empty list = allow all).
    #[must_use]
    pub fn is_mime_allowed(&self, mime: &str) -> bool {
        if self.allowed_mime_types.is_empty() {
            return true;
        }
        let essence = mime.split(';').next().unwrap_or(mime).trim();
        self.allowed_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(essence))
    }

    /// Sets the maximum file count.
    #[must_use]
    pub fn with_max_file_count(mut self, max: usize) -> Self {
        self.max_file_count = max;
        self
    }

    /// Sets the maximum cumulative decompressed size.
    #[must_use]
    pub fn with_max_total_size(mut self, max: u64) -> Self {
        self.max_total_size = max;
        self
    }

    /// Sets the maximum size of a single entry.
    #[must_use]
    pub fn with_max_file_size(mut self, max: u64) -> Self {
        self.max_file_size = max;
        self
    }

    /// Sets the maximum nesting depth.
    #[must_use]
    pub fn with_max_depth(mut self, max: usize) -> Self {
        self.max_depth = max;
        self
    }

    /// Sets the encrypted entry policy.
    #[must_use]
    pub fn with_encrypted_policy(mut self, policy: EncryptedPolicy) -> Self {
        self.encrypted_policy = policy;
        self
    }

    /// Enables or disables virus scanning.
    #[must_use]
    pub fn with_virus_scan(mut self, enabled: bool) -> Self {
        self.enable_virus_scan = enabled;
        self
    }

    /// Enables or disables content deduplication.
    #[must_use]
    pub fn with_dedup(mut self, enabled: bool) -> Self {
        self.dedup = enabled;
        self
    }

    /// Sets the expansion thresholds.
    #[must_use]
    pub fn with_expansion(mut self, expansion: ExpansionThresholds) -> Self {
        self.expansion = expansion;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::field_reassign_with_default)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IngestConfig::default();
        assert_eq!(config.max_depth, 3);
        assert!(config.dedup);
        assert!(config.refuse_suspicious_archives);
        assert_eq!(config.encrypted_policy, EncryptedPolicy::Skip);
        assert!((config.expansion.entry_ratio - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_permissive_config() {
        let config = IngestConfig::permissive();
        assert!(config.is_extension_allowed("exe"));
        assert!(config.is_mime_allowed("application/x-msdownload"));
        assert!(!config.refuse_suspicious_archives);
    }

    #[test]
    fn test_extension_allowed_case_insensitive() {
        let config = IngestConfig::default();
        assert!(config.is_extension_allowed("PNG"));
        assert!(config.is_extension_allowed("html"));
        assert!(!config.is_extension_allowed("exe"));
        assert!(!config.is_extension_allowed("js"));
    }

    #[test]
    fn test_mime_allowed_ignores_parameters() {
        let config = IngestConfig::default();
        assert!(config.is_mime_allowed("text/html; charset=utf-8"));
        assert!(!config.is_mime_allowed("application/x-msdownload"));
    }

    #[test]
    fn test_empty_extension_list_allows_all() {
        let mut config = IngestConfig::default();
        config.allowed_extensions.clear();
        assert!(config.is_extension_allowed("anything"));
    }

    #[test]
    fn test_encrypted_policy_from_str() {
        assert_eq!("skip".parse::<EncryptedPolicy>().unwrap(), EncryptedPolicy::Skip);
        assert_eq!("ERROR".parse::<EncryptedPolicy>().unwrap(), EncryptedPolicy::Error);
        assert_eq!(" attempt ".parse::<EncryptedPolicy>().unwrap(), EncryptedPolicy::Attempt);
        assert!("decrypt".parse::<EncryptedPolicy>().is_err());
        assert_eq!(EncryptedPolicy::Attempt.to_string(), "attempt");
    }
}
