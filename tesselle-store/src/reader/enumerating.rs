//! The fallback backend: walk the container's full directory once and
//! answer lookups from an in-memory name map.

use crate::error::{Result, StoreError};
use crate::reader::{OpenOptions, TilesetReader};
use crate::types::normalize_path;
use std::collections::HashMap;
use std::path::Path;
use tesselle_container::{Container, METHOD_STORED, read_directory, read_local_entry_at};
use tracing::info;

#[derive(Debug, Clone, Copy)]
struct EntryLocation {
    offset: u64,
    compressed_size: u32,
    compression_method: u16,
}

/// Reader that needs no index: used when the container carries none, or
/// when the index failed to load or validate.
pub struct EnumeratingArchiveReader {
    container: Container,
    entries: HashMap<String, EntryLocation>,
}

impl EnumeratingArchiveReader {
    /// Open a container and walk its full directory once.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, &OpenOptions::default())
    }

    /// Open a container and walk its full directory once.
    ///
    /// Validation options do not apply here; only the memory-mapping choice
    /// is honored.
    pub fn open_with(path: &Path, options: &OpenOptions) -> Result<Self> {
        let container = Container::open_with(path, options.memory_map)?;

        let mut entries = HashMap::new();
        for entry in read_directory(&container)? {
            let entry = entry?;
            entries.insert(
                entry.name.clone(),
                EntryLocation {
                    offset: entry.local_header_offset,
                    compressed_size: entry.compressed_size,
                    compression_method: entry.compression_method,
                },
            );
        }

        info!(
            "Opened archive {:?} by enumeration: {} entries",
            path,
            entries.len()
        );
        Ok(Self { container, entries })
    }

    /// Number of entries the walk found.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the walk found no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TilesetReader for EnumeratingArchiveReader {
    fn read_binary(&self, path: &str) -> Result<Vec<u8>> {
        let name = normalize_path(path);
        let location = self
            .entries
            .get(&name)
            .copied()
            .ok_or_else(|| StoreError::NotFound(name.clone()))?;

        if location.compression_method != METHOD_STORED {
            return Err(
                tesselle_container::Error::UnsupportedCompression(location.compression_method)
                    .into(),
            );
        }

        let local = read_local_entry_at(&self.container, location.offset, &name)?;
        let payload = self.container.read_at(
            local.payload_offset(location.offset),
            location.compressed_size as usize,
        )?;
        Ok(payload)
    }
}
