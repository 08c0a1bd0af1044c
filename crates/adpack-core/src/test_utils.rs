//! Test utilities for building in-memory upload archives.
//!
//! # Panics
//!
//! All functions in this module may panic on I/O errors since they are
//! designed for test use only where panics are acceptable.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::io::Cursor;
use std::io::Write;

use byteorder::LittleEndian;
use byteorder::WriteBytesExt;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::inspection::records::CDFH_SIGNATURE;
use crate::inspection::records::CentralDirectoryRecord;
use crate::inspection::records::EOCD_SIGNATURE;
use crate::inspection::records::EndOfCentralDirectory;
use crate::inspection::records::FLAG_ENCRYPTED;

/// Creates an in-memory ZIP archive from a list of entries.
///
/// Each entry is a tuple of (path, content). Files are stored uncompressed.
///
/// # Examples
///
/// ```
/// use adpack_core::test_utils::create_test_zip;
///
/// let zip_data = create_test_zip(vec![("file.txt", b"hello"), ("dir/nested.txt", b"world")]);
/// ```
#[must_use]
pub fn create_test_zip(entries: Vec<(&str, &[u8])>) -> Vec<u8> {
    entries
        .into_iter()
        .fold(ZipTestBuilder::new(), |builder, (path, data)| {
            builder.add_file(path, data)
        })
        .build()
}

/// Returns a minimal valid PNG signature followed by an IHDR-like tail.
///
/// Enough for content sniffing; not a decodable image.
#[must_use]
pub fn png_bytes(marker: u8) -> Vec<u8> {
    let mut data = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR".to_vec();
    data.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 1, 8, 6, 0, 0, 0, marker]);
    data
}

/// Builder for ZIP test archives.
///
/// # Examples
///
/// ```
/// use adpack_core::test_utils::ZipTestBuilder;
///
/// let inner = ZipTestBuilder::new().add_file("a.html", b"<p>a</p>").build();
/// let zip_data = ZipTestBuilder::new()
///     .add_directory("banner/")
///     .add_file("banner/index.html", b"<p>hi</p>")
///     .add_file("more.zip", &inner)
///     .build();
/// ```
pub struct ZipTestBuilder {
    zip: ZipWriter<Cursor<Vec<u8>>>,
}

impl ZipTestBuilder {
    /// Creates a new ZIP test builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    /// Adds a stored (uncompressed) file.
    #[must_use]
    pub fn add_file(self, path: &str, data: &[u8]) -> Self {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        self.add_with_options(path, data, options)
    }

    /// Adds a deflate-compressed file.
    #[must_use]
    pub fn add_deflated(self, path: &str, data: &[u8]) -> Self {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(9));
        self.add_with_options(path, data, options)
    }

    /// Adds an AES-256 encrypted file.
    #[must_use]
    pub fn add_encrypted(mut self, path: &str, data: &[u8], password: &str) -> Self {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .with_aes_encryption(zip::AesMode::Aes256, password);
        self.zip.start_file(path, options).unwrap();
        self.zip.write_all(data).unwrap();
        self
    }

    /// Adds a directory entry.
    #[must_use]
    pub fn add_directory(mut self, path: &str) -> Self {
        self.zip
            .add_directory(path, SimpleFileOptions::default())
            .unwrap();
        self
    }

    fn add_with_options(mut self, path: &str, data: &[u8], options: SimpleFileOptions) -> Self {
        self.zip.start_file(path, options).unwrap();
        self.zip.write_all(data).unwrap();
        self
    }

    /// Builds and returns the ZIP archive data.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.zip.finish().unwrap().into_inner()
    }

    /// Builds the archive, then sets the encryption flag on the named entries
    /// in both their local and central headers without encrypting the data.
    #[must_use]
    pub fn build_with_encrypted_flag(self, names: &[&str]) -> Vec<u8> {
        let mut data = self.build();
        let (eocd, _) = EndOfCentralDirectory::locate(&data).unwrap();
        let mut offset = eocd.cd_offset as usize;

        for _ in 0..eocd.total_entries {
            let record = CentralDirectoryRecord::parse(&data, offset).unwrap();
            if names.contains(&record.name.as_str()) {
                set_flag(&mut data, offset + 8);
                set_flag(&mut data, record.local_header_offset as usize + 6);
            }
            offset += record.record_len;
        }
        data
    }
}

impl Default for ZipTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn set_flag(data: &mut [u8], at: usize) {
    let flags = u16::from_le_bytes([data[at], data[at + 1]]) | FLAG_ENCRYPTED;
    data[at..at + 2].copy_from_slice(&flags.to_le_bytes());
}

/// Builds a central directory and trailer with the given declared sizes.
///
/// Entries are `(name, compressed, uncompressed)`. No local headers or file
/// data are written, so the result is only useful for previewing.
///
/// # Examples
///
/// ```
/// use adpack_core::ExpansionThresholds;
/// use adpack_core::inspection::preview_archive;
/// use adpack_core::test_utils::central_directory_only;
///
/// let data = central_directory_only(&[("bomb.txt", 100, 5_000)]);
/// let preview = preview_archive(&data, &ExpansionThresholds::default()).unwrap();
/// assert_eq!(preview.suspicious.high_expansion_entries, vec!["bomb.txt"]);
/// ```
#[must_use]
pub fn central_directory_only(entries: &[(&str, u32, u32)]) -> Vec<u8> {
    let mut data = Vec::new();
    for (name, compressed, uncompressed) in entries {
        data.write_u32::<LittleEndian>(CDFH_SIGNATURE).unwrap();
        data.write_u16::<LittleEndian>(20).unwrap(); // version made by
        data.write_u16::<LittleEndian>(20).unwrap(); // version needed
        data.write_u16::<LittleEndian>(0).unwrap(); // flags
        data.write_u16::<LittleEndian>(8).unwrap(); // deflate
        data.write_u32::<LittleEndian>(0).unwrap(); // time and date
        data.write_u32::<LittleEndian>(0).unwrap(); // crc32
        data.write_u32::<LittleEndian>(*compressed).unwrap();
        data.write_u32::<LittleEndian>(*uncompressed).unwrap();
        data.write_u16::<LittleEndian>(name.len() as u16).unwrap();
        data.write_u16::<LittleEndian>(0).unwrap(); // extra length
        data.write_u16::<LittleEndian>(0).unwrap(); // comment length
        data.write_u16::<LittleEndian>(0).unwrap(); // disk number
        data.write_u16::<LittleEndian>(0).unwrap(); // internal attributes
        data.write_u32::<LittleEndian>(0).unwrap(); // external attributes
        data.write_u32::<LittleEndian>(0).unwrap(); // local header offset
        data.extend_from_slice(name.as_bytes());
    }

    let cd_size = data.len() as u32;
    data.write_u32::<LittleEndian>(EOCD_SIGNATURE).unwrap();
    data.write_u16::<LittleEndian>(0).unwrap();
    data.write_u16::<LittleEndian>(0).unwrap();
    data.write_u16::<LittleEndian>(entries.len() as u16).unwrap();
    data.write_u16::<LittleEndian>(entries.len() as u16).unwrap();
    data.write_u32::<LittleEndian>(cd_size).unwrap();
    data.write_u32::<LittleEndian>(0).unwrap();
    data.write_u16::<LittleEndian>(0).unwrap();
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_zip() {
        let zip_data = create_test_zip(vec![("file.txt", b"hello")]);
        assert_eq!(&zip_data[..4], b"PK\x03\x04");
    }

    #[test]
    fn test_zip_builder() {
        let zip_data = ZipTestBuilder::new()
            .add_file("file.txt", b"content")
            .add_directory("dir/")
            .build();
        assert!(EndOfCentralDirectory::locate(&zip_data).is_some());
    }

    #[test]
    fn test_encrypted_flag_patch() {
        let data = ZipTestBuilder::new()
            .add_file("a.txt", b"a")
            .build_with_encrypted_flag(&["a.txt"]);
        let (eocd, _) = EndOfCentralDirectory::locate(&data).unwrap();
        let record = CentralDirectoryRecord::parse(&data, eocd.cd_offset as usize).unwrap();
        assert!(record.is_encrypted());
        assert_eq!(data[6] & 1, 1);
    }

    #[test]
    fn test_central_directory_only_parses() {
        let data = central_directory_only(&[("a.txt", 10, 20), ("b/", 0, 0)]);
        let (eocd, _) = EndOfCentralDirectory::locate(&data).unwrap();
        assert_eq!(eocd.total_entries, 2);
        let record = CentralDirectoryRecord::parse(&data, 0).unwrap();
        assert_eq!(record.compressed_size, 10);
        assert_eq!(record.uncompressed_size, 20);
    }

    #[test]
    fn test_png_bytes_signature() {
        assert!(png_bytes(1).starts_with(b"\x89PNG"));
        assert_ne!(png_bytes(1), png_bytes(2));
    }
}
