//! Read-only container handle with memory mapping support

use crate::error::{Error, Result};
use memmap2::{Mmap, MmapOptions};
use parking_lot::Mutex;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

/// Containers larger than this are never memory-mapped.
const MMAP_CEILING: u64 = 2_147_483_648;

/// Read-only handle over one archive container file.
///
/// Memory-maps the file when possible so concurrent positioned reads need no
/// shared cursor. The buffered fallback has a single file cursor, so reads
/// serialize through a mutex. The underlying file is released on drop, on
/// every exit path.
#[derive(Debug)]
pub struct Container {
    /// Memory-mapped file (if available)
    mmap: Option<Mmap>,
    /// Regular file handle (fallback); reads seek, so they take the lock
    file: Option<Mutex<File>>,
    /// Size of the container
    size: u64,
}

impl Container {
    /// Open a container file for reading.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, true)
    }

    /// Open a container file, optionally forbidding memory mapping.
    pub fn open_with(path: &Path, use_memory_mapping: bool) -> Result<Self> {
        let file = File::open(path)?;
        let metadata = file.metadata()?;
        let size = metadata.len();

        debug!("Opening container: {:?} (size: {} bytes)", path, size);

        let mmap = if use_memory_mapping && size > 0 && size < MMAP_CEILING {
            match unsafe { MmapOptions::new().map(&file) } {
                Ok(mmap) => {
                    debug!("Successfully memory-mapped container");
                    Some(mmap)
                }
                Err(e) => {
                    debug!("Failed to memory-map container, using file reads: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let file = if mmap.is_none() {
            Some(Mutex::new(file))
        } else {
            None
        };

        Ok(Self { mmap, file, size })
    }

    /// Read exactly `length` bytes starting at `offset`.
    pub fn read_at(&self, offset: u64, length: usize) -> Result<Vec<u8>> {
        let end = offset
            .checked_add(length as u64)
            .ok_or(Error::ReadOutOfBounds {
                offset,
                length: length as u64,
                size: self.size,
            })?;
        if end > self.size {
            return Err(Error::ReadOutOfBounds {
                offset,
                length: length as u64,
                size: self.size,
            });
        }

        if let Some(ref mmap) = self.mmap {
            // Fast path: no cursor, safe for concurrent callers
            let data = &mmap[offset as usize..offset as usize + length];
            Ok(data.to_vec())
        } else if let Some(ref file) = self.file {
            let mut file = file.lock();
            file.seek(SeekFrom::Start(offset))?;
            let mut buffer = vec![0u8; length];
            file.read_exact(&mut buffer)?;
            Ok(buffer)
        } else {
            Err(Error::MalformedContainer("container is empty".into()))
        }
    }

    /// Read the last `window` bytes (or the whole container when smaller).
    ///
    /// Returns the absolute offset the returned bytes start at.
    pub fn read_tail(&self, window: usize) -> Result<(u64, Vec<u8>)> {
        let start = self.size.saturating_sub(window as u64);
        let length = (self.size - start) as usize;
        Ok((start, self.read_at(start, length)?))
    }

    /// Total size of the container in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Whether reads go through a memory mapping.
    pub fn is_memory_mapped(&self) -> bool {
        self.mmap.is_some()
    }
}
