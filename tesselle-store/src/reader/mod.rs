//! Reader backends.
//!
//! All three backends answer path lookups through one capability trait;
//! picking a backend, and falling back from a broken index to the
//! enumerating walk, is the caller's policy, not ours.

pub mod enumerating;
pub mod indexed;
pub mod keyed;

pub use enumerating::EnumeratingArchiveReader;
pub use indexed::IndexedArchiveReader;
pub use keyed::KeyedTableReader;

use crate::error::Result;
use crate::index::ValidationMode;

/// Capability contract for fetching tileset content by logical path.
pub trait TilesetReader {
    /// Read an entry's raw bytes.
    ///
    /// Fails with [`StoreError::NotFound`](crate::StoreError::NotFound)
    /// when the path cannot be resolved by this backend.
    fn read_binary(&self, path: &str) -> Result<Vec<u8>>;

    /// Read an entry and parse it as JSON.
    fn read_json(&self, path: &str) -> Result<serde_json::Value> {
        let bytes = self.read_binary(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Construction options for the archive-backed readers.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Validation run against the index at construction.
    pub validation: ValidationMode,
    /// Whether the container may be memory-mapped.
    pub memory_map: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            validation: ValidationMode::Quick,
            memory_map: true,
        }
    }
}
