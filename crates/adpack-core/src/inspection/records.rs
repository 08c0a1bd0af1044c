//! Raw ZIP trailer and central directory records.
//!
//! All multi-byte fields are little-endian at fixed offsets. Only the
//! classic (non-Zip64) layout is understood.

use std::io::Cursor;

use byteorder::LittleEndian;
use byteorder::ReadBytesExt;

/// `PK\x05\x06`
pub const EOCD_SIGNATURE: u32 = 0x0605_4b50;

/// `PK\x01\x02`
pub const CDFH_SIGNATURE: u32 = 0x0201_4b50;

/// Size of the End-Of-Central-Directory record without its comment.
pub const EOCD_SIZE: usize = 22;

/// Size of the fixed portion of a Central Directory File Header.
pub const CDFH_FIXED_SIZE: usize = 46;

/// Largest comment the 16-bit length field can describe.
pub const MAX_COMMENT_LEN: usize = 65_535;

/// General purpose flag: entry is encrypted.
pub const FLAG_ENCRYPTED: u16 = 0x0001;

/// General purpose flag: name is UTF-8.
pub const FLAG_UTF8: u16 = 0x0800;

/// End of Central Directory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    /// Finds the record by scanning backward from the end of `data`.
    ///
    /// Returns the record and its offset, or `None` if no signature with a
    /// plausible comment length exists within the last `22 + 65535` bytes.
    pub fn locate(data: &[u8]) -> Option<(Self, usize)> {
        if data.len() < EOCD_SIZE {
            return None;
        }

        let last = data.len() - EOCD_SIZE;
        let first = last.saturating_sub(MAX_COMMENT_LEN);

        (first..=last).rev().find_map(|offset| {
            let record = &data[offset..offset + EOCD_SIZE];
            if read_u32(record, 0)? != EOCD_SIGNATURE {
                return None;
            }
            let eocd = Self::parse(record)?;
            // The comment must fit in what remains of the buffer
            (offset + EOCD_SIZE + usize::from(eocd.comment_len) <= data.len())
                .then_some((eocd, offset))
        })
    }

    fn parse(record: &[u8]) -> Option<Self> {
        let mut cursor = Cursor::new(record.get(4..EOCD_SIZE)?);
        Some(Self {
            disk_number: cursor.read_u16::<LittleEndian>().ok()?,
            disk_with_cd: cursor.read_u16::<LittleEndian>().ok()?,
            disk_entries: cursor.read_u16::<LittleEndian>().ok()?,
            total_entries: cursor.read_u16::<LittleEndian>().ok()?,
            cd_size: cursor.read_u32::<LittleEndian>().ok()?,
            cd_offset: cursor.read_u32::<LittleEndian>().ok()?,
            comment_len: cursor.read_u16::<LittleEndian>().ok()?,
        })
    }
}

/// One Central Directory File Header with its variable-length fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryRecord {
    pub flags: u16,
    pub compression_method: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub external_attributes: u32,
    pub local_header_offset: u32,
    pub name: String,
    /// Total bytes occupied by the record (fixed + name + extra + comment).
    pub record_len: usize,
}

impl CentralDirectoryRecord {
    /// Decodes the record starting at `offset`.
    ///
    /// Returns `None` when the signature is wrong or the record is truncated.
    pub fn parse(data: &[u8], offset: usize) -> Option<Self> {
        let fixed = data.get(offset..offset.checked_add(CDFH_FIXED_SIZE)?)?;
        if read_u32(fixed, 0)? != CDFH_SIGNATURE {
            return None;
        }

        let flags = read_u16(fixed, 8)?;
        let name_len = usize::from(read_u16(fixed, 28)?);
        let extra_len = usize::from(read_u16(fixed, 30)?);
        let comment_len = usize::from(read_u16(fixed, 32)?);

        let name_start = offset + CDFH_FIXED_SIZE;
        let raw_name = data.get(name_start..name_start + name_len)?;
        let record_len = CDFH_FIXED_SIZE + name_len + extra_len + comment_len;
        if offset + record_len > data.len() {
            return None;
        }

        Some(Self {
            flags,
            compression_method: read_u16(fixed, 10)?,
            crc32: read_u32(fixed, 16)?,
            compressed_size: read_u32(fixed, 20)?,
            uncompressed_size: read_u32(fixed, 24)?,
            external_attributes: read_u32(fixed, 38)?,
            local_header_offset: read_u32(fixed, 42)?,
            name: decode_name(raw_name, flags),
            record_len,
        })
    }

    /// Returns `true` if general purpose bit 0 is set.
    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    /// Returns `true` if the entry names a directory.
    pub fn is_directory(&self) -> bool {
        self.name.ends_with('/') || self.name.ends_with('\\')
    }
}

fn decode_name(raw: &[u8], flags: u16) -> String {
    if flags & FLAG_UTF8 != 0 {
        return String::from_utf8_lossy(raw).into_owned();
    }
    // Legacy names are CP437; the ASCII subset is shared with UTF-8
    match std::str::from_utf8(raw) {
        Ok(name) => name.to_string(),
        Err(_) => raw
            .iter()
            .map(|&b| if b.is_ascii() { char::from(b) } else { '_' })
            .collect(),
    }
}

fn read_u16(data: &[u8], at: usize) -> Option<u16> {
    let mut cursor = Cursor::new(data.get(at..at + 2)?);
    cursor.read_u16::<LittleEndian>().ok()
}

fn read_u32(data: &[u8], at: usize) -> Option<u32> {
    let mut cursor = Cursor::new(data.get(at..at + 4)?);
    cursor.read_u32::<LittleEndian>().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_zip;

    #[test]
    fn test_locate_eocd_without_comment() {
        let data = create_test_zip(vec![("a.txt", b"hello")]);
        let (eocd, offset) = EndOfCentralDirectory::locate(&data).unwrap();
        assert_eq!(offset, data.len() - EOCD_SIZE);
        assert_eq!(eocd.total_entries, 1);
        assert_eq!(eocd.comment_len, 0);
    }

    #[test]
    fn test_locate_eocd_with_comment() {
        let mut data = create_test_zip(vec![("a.txt", b"hello")]);
        let comment = b"campaign upload";
        let len = data.len();
        data[len - 2..].copy_from_slice(&(comment.len() as u16).to_le_bytes());
        data.extend_from_slice(comment);

        let (eocd, offset) = EndOfCentralDirectory::locate(&data).unwrap();
        assert_eq!(offset, len - EOCD_SIZE);
        assert_eq!(usize::from(eocd.comment_len), comment.len());
    }

    #[test]
    fn test_locate_eocd_missing() {
        assert!(EndOfCentralDirectory::locate(b"").is_none());
        assert!(EndOfCentralDirectory::locate(&[0u8; 64]).is_none());
        assert!(EndOfCentralDirectory::locate(b"<html>not a zip</html>").is_none());
    }

    #[test]
    fn test_parse_central_directory_record() {
        let data = create_test_zip(vec![("banner/index.html", b"<p>hi</p>")]);
        let (eocd, _) = EndOfCentralDirectory::locate(&data).unwrap();
        let record = CentralDirectoryRecord::parse(&data, eocd.cd_offset as usize).unwrap();
        assert_eq!(record.name, "banner/index.html");
        assert_eq!(record.uncompressed_size, 9);
        assert_eq!(record.compression_method, 0);
        assert!(!record.is_encrypted());
        assert!(!record.is_directory());
        assert_eq!(record.record_len, eocd.cd_size as usize);
    }

    #[test]
    fn test_parse_record_rejects_bad_signature() {
        let data = create_test_zip(vec![("a.txt", b"x")]);
        assert!(CentralDirectoryRecord::parse(&data, 1).is_none());
        assert!(CentralDirectoryRecord::parse(&data, data.len()).is_none());
    }

    #[test]
    fn test_decode_legacy_name() {
        assert_eq!(decode_name(b"plain.txt", 0), "plain.txt");
        assert_eq!(decode_name(&[b'a', 0x82, b'.', b't'], 0), "a_.t");
    }
}
