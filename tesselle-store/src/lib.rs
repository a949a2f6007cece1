//! Random-access retrieval of named byte blobs packed inside large 3D
//! Tiles archive containers.
//!
//! The container carries a reserved, sorted hash-to-offset index as its
//! last entry; this crate loads that index, validates it against the
//! container, and answers path lookups in O(log n) without scanning the
//! full catalog. A fallback backend walks the catalog when the index is
//! absent or broken, and a third backend reads containers pre-converted
//! into a keyed blob table. All three speak one capability trait.

pub mod error;
pub mod index;
pub mod reader;
pub mod types;

pub use error::{Result, StoreError};
pub use index::{
    TilesetIndex, ValidationMode, ValidationReport, check_ordering, cross_validate, validate_index,
};
pub use reader::{
    EnumeratingArchiveReader, IndexedArchiveReader, KeyedTableReader, OpenOptions, TilesetReader,
};
pub use types::{ContentHash, INDEX_ENTRY_NAME, ROOT_MANIFEST_NAME, normalize_path};
