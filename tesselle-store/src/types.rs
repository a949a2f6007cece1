//! Common types for the tileset store

use std::cmp::Ordering;
use std::fmt;

/// Reserved logical name of the index entry inside a container.
pub const INDEX_ENTRY_NAME: &str = "@3dtilesIndex1@";

/// Logical name of the mandatory root manifest.
pub const ROOT_MANIFEST_NAME: &str = "tileset.json";

/// Content hash - the 16-byte MD5 digest of a normalized logical path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    pub fn new(data: [u8; 16]) -> Self {
        Self(data)
    }

    /// Hash a logical path. The path must already be normalized.
    pub fn of_path(path: &str) -> Self {
        Self(md5::compute(path.as_bytes()).0)
    }

    pub fn from_slice(data: &[u8]) -> Option<Self> {
        if data.len() == 16 {
            let mut hash = [0u8; 16];
            hash.copy_from_slice(data);
            Some(Self(hash))
        } else {
            None
        }
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Primary sort key: bytes 0-7 as a little-endian word.
    pub fn low_word(&self) -> u64 {
        u64::from_le_bytes(self.0[0..8].try_into().unwrap())
    }

    /// Secondary sort key: bytes 8-15 as a little-endian word.
    pub fn high_word(&self) -> u64 {
        u64::from_le_bytes(self.0[8..16].try_into().unwrap())
    }
}

// The persisted index is sorted by the first 8 hash bytes as a little-endian
// word, tie-broken by the last 8. This is NOT the order of the full 128-bit
// little-endian value (that would make the last 8 bytes most significant).
// Existing index blobs are sorted this way, so the comparison must stay
// exactly as it is.
impl Ord for ContentHash {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.low_word().cmp(&other.low_word()) {
            Ordering::Equal => self.high_word().cmp(&other.high_word()),
            unequal => unequal,
        }
    }
}

impl PartialOrd for ContentHash {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Normalize a logical path into the form entry names are stored under:
/// forward slashes, no leading slash.
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.trim_start_matches('/').to_string()
}
