//! The sorted hash-to-offset index enabling O(log n) lookups without
//! scanning the container's full catalog.

use crate::error::{Result, StoreError};
use crate::types::ContentHash;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;
use tracing::debug;

/// Size of one persisted index record: a 16-byte content hash followed by
/// a little-endian u64 offset into the container.
pub const INDEX_RECORD_SIZE: usize = 24;

/// One index record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Content hash of the entry's logical name
    pub hash: ContentHash,
    /// Offset of the entry's local record in the container
    pub offset: u64,
}

/// The in-memory index: an owned, immutable sequence of records, loaded
/// once and queried many times.
///
/// Records are kept in the order the blob declares them. Whether that order
/// actually satisfies the sort invariant is the validator's job, not the
/// deserializer's.
#[derive(Debug, Clone)]
pub struct TilesetIndex {
    entries: Vec<IndexEntry>,
}

impl TilesetIndex {
    /// Deserialize an index blob.
    ///
    /// The blob must be a whole number of 24-byte records.
    pub fn from_bytes(blob: &[u8]) -> Result<Self> {
        if blob.len() % INDEX_RECORD_SIZE != 0 {
            return Err(StoreError::MalformedIndex {
                length: blob.len(),
                record_size: INDEX_RECORD_SIZE,
            });
        }

        let mut entries = Vec::with_capacity(blob.len() / INDEX_RECORD_SIZE);
        for record in blob.chunks_exact(INDEX_RECORD_SIZE) {
            let hash = ContentHash::from_slice(&record[..16]).ok_or(StoreError::MalformedIndex {
                length: blob.len(),
                record_size: INDEX_RECORD_SIZE,
            })?;
            let mut cursor = Cursor::new(&record[16..]);
            let offset = cursor.read_u64::<LittleEndian>()?;
            entries.push(IndexEntry { hash, offset });
        }

        debug!("Deserialized index with {} entries", entries.len());
        Ok(Self { entries })
    }

    /// Serialize back into the 24-byte-record blob form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.entries.len() * INDEX_RECORD_SIZE);
        for entry in &self.entries {
            out.extend_from_slice(entry.hash.as_bytes());
            // Writing into a Vec cannot fail
            let _ = out.write_u64::<LittleEndian>(entry.offset);
        }
        out
    }

    /// Binary-search for a hash under the word-wise comparison - O(log n).
    ///
    /// Lower-bound search, so even an index that still contains a collision
    /// deterministically resolves to the first matching record.
    pub fn lookup(&self, hash: &ContentHash) -> Option<u64> {
        let i = self.entries.partition_point(|entry| entry.hash < *hash);
        self.entries
            .get(i)
            .filter(|entry| entry.hash == *hash)
            .map(|entry| entry.offset)
    }

    /// Number of records in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no records.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records in declared order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::normalize_path;

    fn blob_from(pairs: &[(ContentHash, u64)]) -> Vec<u8> {
        let mut out = Vec::new();
        for (hash, offset) in pairs {
            out.extend_from_slice(hash.as_bytes());
            out.extend_from_slice(&offset.to_le_bytes());
        }
        out
    }

    fn sorted_pairs(names: &[&str]) -> Vec<(ContentHash, u64)> {
        let mut pairs: Vec<(ContentHash, u64)> = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                (
                    ContentHash::of_path(&normalize_path(name)),
                    (i as u64 + 1) * 100,
                )
            })
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs
    }

    #[test]
    fn lookup_finds_every_stored_offset() {
        let pairs = sorted_pairs(&["tileset.json", "tiles/0.b3dm", "tiles/1.b3dm"]);
        let index = TilesetIndex::from_bytes(&blob_from(&pairs)).unwrap();

        for (hash, offset) in &pairs {
            assert_eq!(index.lookup(hash), Some(*offset));
        }
    }

    #[test]
    fn lookup_misses_for_absent_hashes() {
        let pairs = sorted_pairs(&["tileset.json", "tiles/0.b3dm"]);
        let index = TilesetIndex::from_bytes(&blob_from(&pairs)).unwrap();

        let absent = ContentHash::of_path("tiles/999.b3dm");
        assert_eq!(index.lookup(&absent), None);
        assert_eq!(TilesetIndex::from_bytes(&[]).unwrap().lookup(&absent), None);
    }

    #[test]
    fn blob_roundtrip_is_identity() {
        let pairs = sorted_pairs(&["a", "b", "c", "d"]);
        let blob = blob_from(&pairs);
        let index = TilesetIndex::from_bytes(&blob).unwrap();
        assert_eq!(index.to_bytes(), blob);
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn ragged_blob_is_malformed() {
        let mut blob = blob_from(&sorted_pairs(&["a", "b"]));
        blob.push(0);
        let err = TilesetIndex::from_bytes(&blob).unwrap_err();
        assert!(matches!(err, StoreError::MalformedIndex { length: 49, .. }));
    }

    #[test]
    fn declared_order_is_preserved_even_when_unsorted() {
        // Deserialization must not re-sort; order checking is the
        // validator's job.
        let a = ContentHash::new([9; 16]);
        let b = ContentHash::new([1; 16]);
        let index = TilesetIndex::from_bytes(&blob_from(&[(a, 1), (b, 2)])).unwrap();
        assert_eq!(index.entries()[0].hash, a);
        assert_eq!(index.entries()[1].hash, b);
    }

    #[test]
    fn lookup_on_collided_index_returns_first_match() {
        let hash = ContentHash::new([7; 16]);
        let index = TilesetIndex::from_bytes(&blob_from(&[(hash, 10), (hash, 20)])).unwrap();
        assert_eq!(index.lookup(&hash), Some(10));
    }
}
