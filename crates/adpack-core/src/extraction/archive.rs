//! Bounded reads from an in-memory ZIP archive.

use std::io::Cursor;
use std::io::Read;

use zip::ZipArchive;
use zip::result::ZipError;

use crate::IngestError;
use crate::Result;
use crate::security::EntryAccess;

/// Header metadata of one entry, read without decompressing it.
#[derive(Debug, Clone)]
pub struct EntryMeta {
    /// Raw entry name.
    pub name: String,
    /// Declared uncompressed size.
    pub size: u64,
    /// Encryption flag.
    pub encrypted: bool,
    /// Directory entry.
    pub is_dir: bool,
}

/// Outcome of reading one entry's body.
#[derive(Debug)]
pub enum ReadOutcome {
    /// The full decompressed body.
    Data(Vec<u8>),
    /// The body is larger than the limit; reading stopped at `limit + 1` bytes.
    TooLarge(u64),
    /// The password was rejected or authentication failed.
    DecryptFailed,
    /// The body could not be decompressed.
    Corrupt(String),
}

/// A parsed ZIP archive owning its bytes.
pub struct OpenArchive {
    zip: ZipArchive<Cursor<Vec<u8>>>,
}

impl OpenArchive {
    /// Parses `data` as a ZIP archive.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::InvalidArchive` if the central directory cannot
    /// be read.
    pub fn open(data: Vec<u8>) -> Result<Self> {
        let zip = ZipArchive::new(Cursor::new(data))
            .map_err(|e| IngestError::InvalidArchive(format!("failed to open ZIP archive: {e}")))?;
        Ok(Self { zip })
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.zip.len()
    }

    /// Returns `true` if the archive has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zip.is_empty()
    }

    /// Reads an entry's header without decompressing it.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::InvalidArchive` if the entry header is unreadable.
    pub fn meta(&mut self, index: usize) -> Result<EntryMeta> {
        let file = self.zip.by_index_raw(index).map_err(|e| {
            IngestError::InvalidArchive(format!("failed to read ZIP entry {index}: {e}"))
        })?;
        Ok(EntryMeta {
            name: file.name().to_string(),
            size: file.size(),
            encrypted: file.encrypted(),
            is_dir: file.is_dir(),
        })
    }

    /// Decompresses an entry, reading at most `limit + 1` bytes.
    pub fn read(&mut self, index: usize, access: EntryAccess<'_>, limit: u64) -> ReadOutcome {
        let decrypting = matches!(access, EntryAccess::Decrypt(_));
        let file = match access {
            EntryAccess::Decrypt(password) => self.zip.by_index_decrypt(index, password.as_bytes()),
            EntryAccess::Plain | EntryAccess::Skip => self.zip.by_index(index),
        };

        let file = match file {
            Ok(file) => file,
            Err(ZipError::InvalidPassword) => return ReadOutcome::DecryptFailed,
            Err(_) if decrypting => return ReadOutcome::DecryptFailed,
            Err(e) => return ReadOutcome::Corrupt(e.to_string()),
        };

        let mut data = Vec::new();
        match file.take(limit.saturating_add(1)).read_to_end(&mut data) {
            Ok(_) if data.len() as u64 > limit => ReadOutcome::TooLarge(data.len() as u64),
            Ok(_) => ReadOutcome::Data(data),
            // AES authentication failures surface while reading
            Err(_) if decrypting => ReadOutcome::DecryptFailed,
            Err(e) => ReadOutcome::Corrupt(e.to_string()),
        }
    }
}
