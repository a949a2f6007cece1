//! Shared fixture builder: writes stored-only containers with a trailing
//! sorted index entry, the way production archives are laid out.
#![allow(dead_code)]

use byteorder::{LittleEndian, WriteBytesExt};
use std::collections::HashMap;
use std::io::Write;
use tesselle_store::{ContentHash, INDEX_ENTRY_NAME};

const LOCAL_MAGIC: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];
const DIRECTORY_MAGIC: [u8; 4] = [0x50, 0x4b, 0x01, 0x02];
const END_MAGIC: [u8; 4] = [0x50, 0x4b, 0x05, 0x06];

pub struct Fixture {
    pub bytes: Vec<u8>,
    /// Local-header offset of every payload entry, by name.
    pub offsets: HashMap<String, u64>,
}

impl Fixture {
    pub fn write_to_temp(&self) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&self.bytes).unwrap();
        tmp.flush().unwrap();
        tmp
    }
}

/// Sorted 24-byte index records for the given (name, offset) pairs.
pub fn index_blob(offsets: &HashMap<String, u64>) -> Vec<u8> {
    let mut records: Vec<(ContentHash, u64)> = offsets
        .iter()
        .map(|(name, offset)| (ContentHash::of_path(name), *offset))
        .collect();
    records.sort_by(|a, b| a.0.cmp(&b.0));

    let mut blob = Vec::new();
    for (hash, offset) in records {
        blob.extend_from_slice(hash.as_bytes());
        blob.extend_from_slice(&offset.to_le_bytes());
    }
    blob
}

fn write_local_entry(out: &mut Vec<u8>, name: &str, payload: &[u8]) {
    out.extend_from_slice(&LOCAL_MAGIC);
    out.write_u16::<LittleEndian>(20).unwrap(); // version needed
    out.write_u16::<LittleEndian>(0).unwrap(); // flags
    out.write_u16::<LittleEndian>(0).unwrap(); // stored
    out.write_u16::<LittleEndian>(0).unwrap(); // time
    out.write_u16::<LittleEndian>(0).unwrap(); // date
    out.write_u32::<LittleEndian>(0).unwrap(); // crc
    out.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
    out.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
    out.write_u16::<LittleEndian>(name.len() as u16).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap(); // extra
    out.write_all(name.as_bytes()).unwrap();
    out.write_all(payload).unwrap();
}

fn write_directory_entry(out: &mut Vec<u8>, name: &str, payload_len: u32, offset: u32) {
    out.extend_from_slice(&DIRECTORY_MAGIC);
    out.write_u16::<LittleEndian>(20).unwrap(); // version made by
    out.write_u16::<LittleEndian>(20).unwrap(); // version needed
    out.write_u16::<LittleEndian>(0).unwrap(); // flags
    out.write_u16::<LittleEndian>(0).unwrap(); // stored
    out.write_u16::<LittleEndian>(0).unwrap(); // time
    out.write_u16::<LittleEndian>(0).unwrap(); // date
    out.write_u32::<LittleEndian>(0).unwrap(); // crc
    out.write_u32::<LittleEndian>(payload_len).unwrap();
    out.write_u32::<LittleEndian>(payload_len).unwrap();
    out.write_u16::<LittleEndian>(name.len() as u16).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap(); // extra
    out.write_u16::<LittleEndian>(0).unwrap(); // comment
    out.write_u16::<LittleEndian>(0).unwrap(); // disk number
    out.write_u16::<LittleEndian>(0).unwrap(); // internal attrs
    out.write_u32::<LittleEndian>(0).unwrap(); // external attrs
    out.write_u32::<LittleEndian>(offset).unwrap();
    out.write_all(name.as_bytes()).unwrap();
}

/// Build a container whose index is derived from the real entry offsets.
pub fn build_archive(entries: &[(&str, &[u8])]) -> Fixture {
    build_archive_with(entries, None, true)
}

/// Build a container, optionally substituting the index payload, and
/// optionally without any index entry at all.
pub fn build_archive_with(
    entries: &[(&str, &[u8])],
    index_override: Option<Vec<u8>>,
    with_index: bool,
) -> Fixture {
    let mut bytes = Vec::new();
    let mut offsets = HashMap::new();

    for (name, payload) in entries {
        offsets.insert((*name).to_string(), bytes.len() as u64);
        write_local_entry(&mut bytes, name, payload);
    }

    let index_payload = if with_index {
        Some(index_override.unwrap_or_else(|| index_blob(&offsets)))
    } else {
        None
    };

    let index_offset = bytes.len() as u64;
    if let Some(blob) = &index_payload {
        write_local_entry(&mut bytes, INDEX_ENTRY_NAME, blob);
    }

    let directory_offset = bytes.len() as u32;
    let mut total = 0u16;
    for (name, payload) in entries {
        write_directory_entry(
            &mut bytes,
            name,
            payload.len() as u32,
            offsets[*name] as u32,
        );
        total += 1;
    }
    if let Some(blob) = &index_payload {
        write_directory_entry(
            &mut bytes,
            INDEX_ENTRY_NAME,
            blob.len() as u32,
            index_offset as u32,
        );
        total += 1;
    }
    let directory_size = bytes.len() as u32 - directory_offset;

    bytes.extend_from_slice(&END_MAGIC);
    bytes.write_u16::<LittleEndian>(0).unwrap();
    bytes.write_u16::<LittleEndian>(0).unwrap();
    bytes.write_u16::<LittleEndian>(total).unwrap();
    bytes.write_u16::<LittleEndian>(total).unwrap();
    bytes.write_u32::<LittleEndian>(directory_size).unwrap();
    bytes.write_u32::<LittleEndian>(directory_offset).unwrap();
    bytes.write_u16::<LittleEndian>(0).unwrap();

    Fixture { bytes, offsets }
}
