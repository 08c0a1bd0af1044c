//! Encrypted entry policy.

use tracing::debug;

use crate::EncryptedPolicy;
use crate::IngestError;
use crate::Result;
use crate::inspection::PreviewResult;

/// How a single entry may be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryAccess<'a> {
    /// Entry is not encrypted.
    Plain,
    /// Entry is encrypted and must be recorded as skipped.
    Skip,
    /// Entry is encrypted and should be decrypted with this password.
    Decrypt(&'a str),
}

/// Applies one [`EncryptedPolicy`] to the archives of a request.
///
/// # Examples
///
/// ```
/// use adpack_core::EncryptedPolicy;
/// use adpack_core::security::EncryptionGate;
/// use adpack_core::security::EntryAccess;
///
/// let gate = EncryptionGate::new(EncryptedPolicy::Attempt, Some("s3cret"));
/// assert_eq!(gate.access(true), EntryAccess::Decrypt("s3cret"));
/// assert_eq!(gate.access(false), EntryAccess::Plain);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct EncryptionGate<'a> {
    policy: EncryptedPolicy,
    password: Option<&'a str>,
}

impl<'a> EncryptionGate<'a> {
    /// Creates a gate for `policy`; empty passwords count as absent.
    #[must_use]
    pub fn new(policy: EncryptedPolicy, password: Option<&'a str>) -> Self {
        Self {
            policy,
            password: password.filter(|pw| !pw.is_empty()),
        }
    }

    /// Checks an archive's preview before any of its entries is extracted.
    ///
    /// `is_root` distinguishes the uploaded archive from nested ones: a
    /// missing password under `attempt` is only fatal for the upload itself,
    /// nested archives fall back to skipping their encrypted entries.
    ///
    /// # Errors
    ///
    /// - `IngestError::EncryptedEntries` under `error` when any entry is encrypted
    /// - `IngestError::PasswordRequired` under `attempt` without a password
    pub fn check_archive(&self, preview: &PreviewResult, is_root: bool) -> Result<()> {
        let encrypted = preview.encrypted_entries();
        if encrypted.is_empty() {
            return Ok(());
        }

        debug!(
            target: "adpack::encryption",
            policy = %self.policy,
            count = encrypted.len(),
            "archive contains encrypted entries"
        );

        match self.policy {
            EncryptedPolicy::Skip => Ok(()),
            EncryptedPolicy::Error => Err(IngestError::EncryptedEntries {
                names: encrypted.into_iter().map(ToString::to_string).collect(),
            }),
            EncryptedPolicy::Attempt if is_root && self.password.is_none() => {
                Err(IngestError::PasswordRequired)
            }
            EncryptedPolicy::Attempt => Ok(()),
        }
    }

    /// Decides how an entry with the given encryption flag is read.
    #[must_use]
    pub fn access(&self, encrypted: bool) -> EntryAccess<'a> {
        if !encrypted {
            return EntryAccess::Plain;
        }
        match (self.policy, self.password) {
            (EncryptedPolicy::Attempt, Some(password)) => EntryAccess::Decrypt(password),
            _ => EntryAccess::Skip,
        }
    }
}
