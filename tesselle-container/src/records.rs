//! The binary record types found in a container.
//!
//! Only the stored (uncompressed) subset of the format is accepted: index
//! offsets must point at payload bytes that are usable without a
//! decompression step, which keeps random-access lookups a single bounded
//! read after the index search.

use crate::error::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;
use tracing::trace;

/// Directory entry record, `PK\x01\x02`.
pub const DIRECTORY_ENTRY_MAGIC: [u8; 4] = [0x50, 0x4b, 0x01, 0x02];
/// Local entry record, `PK\x03\x04`.
pub const LOCAL_ENTRY_MAGIC: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];
/// End-of-directory marker, `PK\x05\x06`.
pub const END_OF_DIRECTORY_MAGIC: [u8; 4] = [0x50, 0x4b, 0x05, 0x06];
/// Zip64 end-of-directory record, `PK\x06\x06`.
pub const ZIP64_END_OF_DIRECTORY_MAGIC: [u8; 4] = [0x50, 0x4b, 0x06, 0x06];
/// Zip64 end-of-directory locator, `PK\x06\x07`.
pub const ZIP64_LOCATOR_MAGIC: [u8; 4] = [0x50, 0x4b, 0x06, 0x07];

/// Fixed portion of a directory entry record.
pub const DIRECTORY_ENTRY_FIXED_SIZE: usize = 46;
/// Fixed portion of a local entry record.
pub const LOCAL_ENTRY_FIXED_SIZE: usize = 30;
/// Size of the end-of-directory marker without its comment.
pub const END_OF_DIRECTORY_SIZE: usize = 22;
/// Size of the zip64 end-of-directory locator.
pub const ZIP64_LOCATOR_SIZE: usize = 20;
/// Fixed portion of the zip64 end-of-directory record.
pub const ZIP64_END_OF_DIRECTORY_SIZE: usize = 56;

/// The only accepted compression method (stored).
pub const METHOD_STORED: u16 = 0;

/// 32-bit offset value meaning "the real offset is in a zip64 extension".
pub const ZIP64_OFFSET_SENTINEL: u32 = 0xFFFF_FFFF;
/// Extra-field tag of the zip64 extension record.
pub const ZIP64_EXTRA_TAG: u16 = 0x0001;

const FLAG_ENCRYPTED: u16 = 1 << 0;
const FLAG_DEFERRED_SIZES: u16 = 1 << 3;
const FLAG_PATCHED_DATA: u16 = 1 << 5;
const FLAG_ENCRYPTED_DIRECTORY: u16 = 1 << 13;

/// General-purpose flag bits that make an entry unreadable for us.
pub const DISALLOWED_FLAGS: u16 =
    FLAG_ENCRYPTED | FLAG_DEFERRED_SIZES | FLAG_PATCHED_DATA | FLAG_ENCRYPTED_DIRECTORY;

fn disallowed_flag_name(flags: u16) -> &'static str {
    if flags & FLAG_ENCRYPTED != 0 {
        "encrypted entry"
    } else if flags & FLAG_DEFERRED_SIZES != 0 {
        "sizes deferred to a trailing descriptor"
    } else if flags & FLAG_PATCHED_DATA != 0 {
        "patched-data compression"
    } else if flags & FLAG_ENCRYPTED_DIRECTORY != 0 {
        "encrypted directory"
    } else {
        "unknown flag"
    }
}

fn remaining<T: AsRef<[u8]>>(cursor: &Cursor<T>) -> usize {
    let len = cursor.get_ref().as_ref().len() as u64;
    len.saturating_sub(cursor.position()) as usize
}

/// One directory entry record: the container's catalog record for one
/// stored entry.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name: String,
    pub disk_number: u16,
    pub internal_attributes: u16,
    pub external_attributes: u32,
    /// Offset of the entry's local record, with the zip64 extension already
    /// applied when the stored 32-bit field was the sentinel.
    pub local_header_offset: u64,
}

impl DirectoryEntry {
    /// Parse one directory entry record at the cursor position, leaving the
    /// cursor on the next record.
    pub fn parse<T: AsRef<[u8]>>(cursor: &mut Cursor<T>) -> Result<Self> {
        if remaining(cursor) < DIRECTORY_ENTRY_FIXED_SIZE {
            return Err(Error::MalformedContainer(
                "truncated directory entry record".into(),
            ));
        }

        let mut magic = [0u8; 4];
        std::io::Read::read_exact(cursor, &mut magic)?;
        if magic != DIRECTORY_ENTRY_MAGIC {
            return Err(Error::MalformedContainer(
                "bad directory entry signature".into(),
            ));
        }

        let version_made_by = cursor.read_u16::<LittleEndian>()?;
        let version_needed = cursor.read_u16::<LittleEndian>()?;
        let flags = cursor.read_u16::<LittleEndian>()?;
        let compression_method = cursor.read_u16::<LittleEndian>()?;
        let last_mod_time = cursor.read_u16::<LittleEndian>()?;
        let last_mod_date = cursor.read_u16::<LittleEndian>()?;
        let crc32 = cursor.read_u32::<LittleEndian>()?;
        let compressed_size = cursor.read_u32::<LittleEndian>()?;
        let uncompressed_size = cursor.read_u32::<LittleEndian>()?;
        let name_len = cursor.read_u16::<LittleEndian>()? as usize;
        let extra_len = cursor.read_u16::<LittleEndian>()? as usize;
        let comment_len = cursor.read_u16::<LittleEndian>()? as usize;
        let disk_number = cursor.read_u16::<LittleEndian>()?;
        let internal_attributes = cursor.read_u16::<LittleEndian>()?;
        let external_attributes = cursor.read_u32::<LittleEndian>()?;
        let offset32 = cursor.read_u32::<LittleEndian>()?;

        if remaining(cursor) < name_len + extra_len + comment_len {
            return Err(Error::MalformedContainer(
                "directory entry overruns its record".into(),
            ));
        }

        let mut name_bytes = vec![0u8; name_len];
        std::io::Read::read_exact(cursor, &mut name_bytes)?;
        let name = String::from_utf8_lossy(&name_bytes).into_owned();

        let mut extra = vec![0u8; extra_len];
        std::io::Read::read_exact(cursor, &mut extra)?;

        // Comment is unused
        cursor.set_position(cursor.position() + comment_len as u64);

        let local_header_offset = resolve_local_header_offset(offset32, &extra)?;

        trace!(
            "directory entry {:?}: method={}, size={}, offset={:#x}",
            name, compression_method, compressed_size, local_header_offset
        );

        Ok(Self {
            version_made_by,
            version_needed,
            flags,
            compression_method,
            last_mod_time,
            last_mod_date,
            crc32,
            compressed_size,
            uncompressed_size,
            name,
            disk_number,
            internal_attributes,
            external_attributes,
            local_header_offset,
        })
    }
}

/// Resolve the true local-header offset of a directory entry.
///
/// The stored field is 32 bits; the sentinel value defers to an 8-byte
/// zip64 extension record in the extra-field region.
fn resolve_local_header_offset(offset32: u32, extra: &[u8]) -> Result<u64> {
    if offset32 != ZIP64_OFFSET_SENTINEL {
        return Ok(u64::from(offset32));
    }

    let mut cursor = Cursor::new(extra);
    while remaining(&cursor) >= 4 {
        let tag = cursor.read_u16::<LittleEndian>()?;
        let size = cursor.read_u16::<LittleEndian>()? as usize;
        if remaining(&cursor) < size {
            break;
        }
        if tag == ZIP64_EXTRA_TAG {
            if size < 8 {
                break;
            }
            return Ok(cursor.read_u64::<LittleEndian>()?);
        }
        cursor.set_position(cursor.position() + size as u64);
    }
    Err(Error::MissingZip64Offset)
}

/// Parse a single directory entry record and enforce the reader policy:
/// no disallowed flag bits, stored compression only, and the name the
/// caller expects at this directory position.
pub fn parse_directory_entry(bytes: &[u8], expected_name: &str) -> Result<DirectoryEntry> {
    let mut cursor = Cursor::new(bytes);
    let entry = DirectoryEntry::parse(&mut cursor)?;

    if entry.flags & DISALLOWED_FLAGS != 0 {
        return Err(Error::DisallowedFeature(disallowed_flag_name(entry.flags)));
    }
    if entry.compression_method != METHOD_STORED {
        return Err(Error::UnsupportedCompression(entry.compression_method));
    }
    if entry.name != expected_name {
        return Err(Error::NameMismatch {
            expected: expected_name.to_string(),
            actual: entry.name,
        });
    }
    Ok(entry)
}

/// One local entry record: restates name and sizes immediately before the
/// entry's payload bytes.
#[derive(Debug, Clone)]
pub struct LocalEntry {
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name: String,
    pub extra_len: u16,
}

impl LocalEntry {
    /// Parse a local entry record, verifying the name the caller expects.
    ///
    /// `bytes` only needs to cover the fixed header plus the expected name;
    /// the extra-field bytes and payload are located, not read.
    pub fn parse(bytes: &[u8], expected_name: &str) -> Result<Self> {
        if bytes.len() < LOCAL_ENTRY_FIXED_SIZE {
            return Err(Error::MalformedContainer(
                "truncated local entry record".into(),
            ));
        }
        if bytes[..4] != LOCAL_ENTRY_MAGIC {
            return Err(Error::MalformedContainer("bad local entry signature".into()));
        }

        let mut cursor = Cursor::new(&bytes[4..]);
        let version_needed = cursor.read_u16::<LittleEndian>()?;
        let flags = cursor.read_u16::<LittleEndian>()?;
        let compression_method = cursor.read_u16::<LittleEndian>()?;
        let last_mod_time = cursor.read_u16::<LittleEndian>()?;
        let last_mod_date = cursor.read_u16::<LittleEndian>()?;
        let crc32 = cursor.read_u32::<LittleEndian>()?;
        let compressed_size = cursor.read_u32::<LittleEndian>()?;
        let uncompressed_size = cursor.read_u32::<LittleEndian>()?;
        let name_len = cursor.read_u16::<LittleEndian>()? as usize;
        let extra_len = cursor.read_u16::<LittleEndian>()?;

        let name_end = LOCAL_ENTRY_FIXED_SIZE + name_len.min(bytes.len() - LOCAL_ENTRY_FIXED_SIZE);
        let name = String::from_utf8_lossy(&bytes[LOCAL_ENTRY_FIXED_SIZE..name_end]).into_owned();
        if name != expected_name {
            return Err(Error::NameMismatch {
                expected: expected_name.to_string(),
                actual: name,
            });
        }

        // Containers that defer sizes to a trailing descriptor are rejected:
        // the payload cannot be sliced without a declared size.
        if compressed_size == 0 {
            return Err(Error::MissingSize(name));
        }

        Ok(Self {
            version_needed,
            flags,
            compression_method,
            last_mod_time,
            last_mod_date,
            crc32,
            compressed_size,
            uncompressed_size,
            name,
            extra_len,
        })
    }

    /// Absolute offset of the payload for a record parsed at `header_offset`.
    ///
    /// The payload immediately follows the fixed header, the name, and the
    /// extra-field bytes, for exactly `compressed_size` bytes.
    pub fn payload_offset(&self, header_offset: u64) -> u64 {
        header_offset
            + LOCAL_ENTRY_FIXED_SIZE as u64
            + self.name.len() as u64
            + u64::from(self.extra_len)
    }
}

/// End-of-directory marker fields.
#[derive(Debug, Clone)]
pub struct EndOfDirectory {
    pub disk_number: u16,
    pub directory_disk: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub directory_size: u32,
    pub directory_offset: u32,
    pub comment_len: u16,
}

impl EndOfDirectory {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < END_OF_DIRECTORY_SIZE {
            return Err(Error::MalformedContainer(
                "truncated end-of-directory marker".into(),
            ));
        }
        if bytes[..4] != END_OF_DIRECTORY_MAGIC {
            return Err(Error::MalformedContainer(
                "bad end-of-directory signature".into(),
            ));
        }

        let mut cursor = Cursor::new(&bytes[4..]);
        Ok(Self {
            disk_number: cursor.read_u16::<LittleEndian>()?,
            directory_disk: cursor.read_u16::<LittleEndian>()?,
            disk_entries: cursor.read_u16::<LittleEndian>()?,
            total_entries: cursor.read_u16::<LittleEndian>()?,
            directory_size: cursor.read_u32::<LittleEndian>()?,
            directory_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
        })
    }

    /// Whether any field is saturated and the zip64 records hold the truth.
    pub fn is_zip64(&self) -> bool {
        self.total_entries == 0xFFFF
            || self.disk_entries == 0xFFFF
            || self.directory_size == 0xFFFF_FFFF
            || self.directory_offset == 0xFFFF_FFFF
    }
}

/// Zip64 end-of-directory locator, found immediately before the
/// end-of-directory marker on large containers.
#[derive(Debug, Clone)]
pub struct Zip64Locator {
    pub directory_disk: u32,
    pub end_of_directory_offset: u64,
    pub total_disks: u32,
}

impl Zip64Locator {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < ZIP64_LOCATOR_SIZE || bytes[..4] != ZIP64_LOCATOR_MAGIC {
            return Err(Error::MalformedContainer(
                "bad zip64 end-of-directory locator".into(),
            ));
        }

        let mut cursor = Cursor::new(&bytes[4..]);
        Ok(Self {
            directory_disk: cursor.read_u32::<LittleEndian>()?,
            end_of_directory_offset: cursor.read_u64::<LittleEndian>()?,
            total_disks: cursor.read_u32::<LittleEndian>()?,
        })
    }
}

/// Zip64 end-of-directory record with the full-width directory bounds.
#[derive(Debug, Clone)]
pub struct Zip64EndOfDirectory {
    pub version_made_by: u16,
    pub version_needed: u16,
    pub disk_number: u32,
    pub directory_disk: u32,
    pub disk_entries: u64,
    pub total_entries: u64,
    pub directory_size: u64,
    pub directory_offset: u64,
}

impl Zip64EndOfDirectory {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < ZIP64_END_OF_DIRECTORY_SIZE || bytes[..4] != ZIP64_END_OF_DIRECTORY_MAGIC {
            return Err(Error::MalformedContainer(
                "bad zip64 end-of-directory record".into(),
            ));
        }

        let mut cursor = Cursor::new(&bytes[4..]);
        let _record_size = cursor.read_u64::<LittleEndian>()?;
        Ok(Self {
            version_made_by: cursor.read_u16::<LittleEndian>()?,
            version_needed: cursor.read_u16::<LittleEndian>()?,
            disk_number: cursor.read_u32::<LittleEndian>()?,
            directory_disk: cursor.read_u32::<LittleEndian>()?,
            disk_entries: cursor.read_u64::<LittleEndian>()?,
            total_entries: cursor.read_u64::<LittleEndian>()?,
            directory_size: cursor.read_u64::<LittleEndian>()?,
            directory_offset: cursor.read_u64::<LittleEndian>()?,
        })
    }
}
