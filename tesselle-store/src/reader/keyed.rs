//! The keyed-table backend: containers pre-converted into a single
//! key-to-content table.

use crate::error::{Result, StoreError};
use crate::reader::TilesetReader;
use crate::types::normalize_path;
use flate2::read::GzDecoder;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::io::Read;
use std::path::Path;
use tracing::{info, trace};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Reader over the keyed table schema: one table with a text primary key
/// column and a binary content column.
pub struct KeyedTableReader {
    connection: Connection,
}

impl KeyedTableReader {
    /// Open a keyed table read-only.
    pub fn open(path: &Path) -> Result<Self> {
        let connection = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        info!("Opened keyed table {:?}", path);
        Ok(Self { connection })
    }
}

impl TilesetReader for KeyedTableReader {
    fn read_binary(&self, path: &str) -> Result<Vec<u8>> {
        let key = normalize_path(path);

        let mut statement = self
            .connection
            .prepare_cached("SELECT content FROM media WHERE key = ?1")?;
        let blob: Option<Vec<u8>> = statement
            .query_row([&key], |row| row.get(0))
            .optional()?;
        let blob = blob.ok_or(StoreError::NotFound(key))?;

        // Stored blobs may be gzip-wrapped; sniff the content, never the path
        if blob.len() >= 2 && blob[..2] == GZIP_MAGIC {
            trace!("decompressing gzip blob for {path:?}");
            let mut decoder = GzDecoder::new(blob.as_slice());
            let mut decompressed = Vec::new();
            decoder.read_to_end(&mut decompressed)?;
            return Ok(decompressed);
        }
        Ok(blob)
    }
}
