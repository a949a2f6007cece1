//! The indexed backend: hash the path, search the index, read one local
//! entry, slice the payload.

use crate::error::{Result, StoreError};
use crate::index::{TilesetIndex, ValidationMode, validate_index};
use crate::reader::{OpenOptions, TilesetReader};
use crate::types::{ContentHash, INDEX_ENTRY_NAME, normalize_path};
use std::path::Path;
use tesselle_container::{Container, locate_end_of_index, parse_directory_entry, read_local_entry_at};
use tracing::{debug, info};

/// Reader backed by the container's sorted hash index.
///
/// One container handle lives for the reader's lifetime; every lookup
/// reuses it. Construction locates, loads, and (per options) validates the
/// index; any failure drops the handle before the error is returned, and
/// the caller is expected to fall back to the enumerating backend.
#[derive(Debug)]
pub struct IndexedArchiveReader {
    container: Container,
    index: TilesetIndex,
}

impl IndexedArchiveReader {
    /// Open a container and load its index with default options.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, &OpenOptions::default())
    }

    /// Open a container and load its index.
    pub fn open_with(path: &Path, options: &OpenOptions) -> Result<Self> {
        let container = Container::open_with(path, options.memory_map)?;

        let range = locate_end_of_index(&container)?;
        let record = container.read_at(range.start, (range.end - range.start) as usize)?;
        let directory_entry = parse_directory_entry(&record, INDEX_ENTRY_NAME)?;

        let local = read_local_entry_at(
            &container,
            directory_entry.local_header_offset,
            INDEX_ENTRY_NAME,
        )?;
        let blob = container.read_at(
            local.payload_offset(directory_entry.local_header_offset),
            local.compressed_size as usize,
        )?;
        let index = TilesetIndex::from_bytes(&blob)?;

        match options.validation {
            ValidationMode::Skip => {}
            ValidationMode::Quick | ValidationMode::Thorough => {
                let thorough = options.validation == ValidationMode::Thorough;
                let report = validate_index(&index, &container, thorough);
                if !report.is_valid() {
                    return Err(StoreError::InvalidIndex(report));
                }
            }
        }

        info!(
            "Opened indexed archive {:?}: {} index entries",
            path,
            index.len()
        );
        Ok(Self { container, index })
    }

    /// The loaded index.
    pub fn index(&self) -> &TilesetIndex {
        &self.index
    }

    /// The underlying container handle.
    pub fn container(&self) -> &Container {
        &self.container
    }
}

impl TilesetReader for IndexedArchiveReader {
    fn read_binary(&self, path: &str) -> Result<Vec<u8>> {
        let name = normalize_path(path);
        let hash = ContentHash::of_path(&name);

        let Some(offset) = self.index.lookup(&hash) else {
            debug!("hash {hash} for {name:?} not in index");
            return Err(StoreError::NotFound(name));
        };

        let local = read_local_entry_at(&self.container, offset, &name)?;
        let payload = self
            .container
            .read_at(local.payload_offset(offset), local.compressed_size as usize)?;
        Ok(payload)
    }
}
