//! Locating records in a container: the trailing-window scan used to find
//! the index's directory entry, bounded local-entry reads, and a lazy walk
//! over the full directory.

use crate::container::Container;
use crate::error::{Error, Result};
use crate::records::{
    DIRECTORY_ENTRY_MAGIC, DirectoryEntry, END_OF_DIRECTORY_MAGIC, END_OF_DIRECTORY_SIZE,
    EndOfDirectory, LOCAL_ENTRY_FIXED_SIZE, LocalEntry, ZIP64_END_OF_DIRECTORY_SIZE,
    ZIP64_LOCATOR_SIZE, Zip64EndOfDirectory, Zip64Locator,
};
use std::io::Cursor;
use std::ops::Range;
use tracing::{debug, trace};

/// Fixed size of the trailing window scanned for the end-of-directory
/// marker. The index is the container's last directory entry, so both the
/// marker and that entry's record must sit inside this window.
pub const TAIL_WINDOW: usize = 320;

fn rfind_magic(window: &[u8], magic: &[u8; 4], before: usize) -> Option<usize> {
    let end = before.min(window.len());
    (0..end.saturating_sub(3))
        .rev()
        .find(|&i| window[i..i + 4] == *magic)
}

/// Scan the trailing window for the end-of-directory marker and the last
/// directory entry record before it.
///
/// Returns the absolute byte range covering that one record, which is the
/// reserved index entry on a well-formed container.
pub fn locate_end_of_index(container: &Container) -> Result<Range<u64>> {
    let (tail_start, tail) = container.read_tail(TAIL_WINDOW)?;

    let end_marker = rfind_magic(&tail, &END_OF_DIRECTORY_MAGIC, tail.len())
        .ok_or_else(|| {
            Error::MalformedContainer(format!(
                "no end-of-directory marker in the trailing {TAIL_WINDOW} bytes"
            ))
        })?;

    let entry_start = rfind_magic(&tail, &DIRECTORY_ENTRY_MAGIC, end_marker).ok_or_else(|| {
        Error::MalformedContainer(
            "no directory entry record before the end-of-directory marker".into(),
        )
    })?;

    trace!(
        "trailing scan: directory entry at {:#x}, end marker at {:#x}",
        tail_start + entry_start as u64,
        tail_start + end_marker as u64
    );

    Ok(tail_start + entry_start as u64..tail_start + end_marker as u64)
}

/// Read and parse the local entry record at `offset`.
///
/// The read window is bounded: the fixed header plus the expected name.
pub fn read_local_entry_at(
    container: &Container,
    offset: u64,
    expected_name: &str,
) -> Result<LocalEntry> {
    let window = LOCAL_ENTRY_FIXED_SIZE + expected_name.len();
    let bytes = container.read_at(offset, window)?;
    LocalEntry::parse(&bytes, expected_name)
}

/// Resolve the directory bounds from the end marker, following the zip64
/// records when the 16/32-bit fields are saturated.
fn directory_bounds(container: &Container) -> Result<(u64, usize, u64)> {
    let (tail_start, tail) = container.read_tail(TAIL_WINDOW)?;
    let end_marker = rfind_magic(&tail, &END_OF_DIRECTORY_MAGIC, tail.len())
        .ok_or_else(|| {
            Error::MalformedContainer(format!(
                "no end-of-directory marker in the trailing {TAIL_WINDOW} bytes"
            ))
        })?;

    if tail.len() - end_marker < END_OF_DIRECTORY_SIZE {
        return Err(Error::MalformedContainer(
            "truncated end-of-directory marker".into(),
        ));
    }
    let end = EndOfDirectory::parse(&tail[end_marker..])?;

    if end.is_zip64() {
        let marker_offset = tail_start + end_marker as u64;
        let locator_offset =
            marker_offset
                .checked_sub(ZIP64_LOCATOR_SIZE as u64)
                .ok_or_else(|| {
                    Error::MalformedContainer("no room for a zip64 locator".into())
                })?;
        let locator_bytes = container.read_at(locator_offset, ZIP64_LOCATOR_SIZE)?;
        let locator = Zip64Locator::parse(&locator_bytes)?;

        let record_bytes =
            container.read_at(locator.end_of_directory_offset, ZIP64_END_OF_DIRECTORY_SIZE)?;
        let record = Zip64EndOfDirectory::parse(&record_bytes)?;

        debug!(
            "zip64 directory: {} entries, {} bytes at {:#x}",
            record.total_entries, record.directory_size, record.directory_offset
        );
        Ok((
            record.directory_offset,
            record.directory_size as usize,
            record.total_entries,
        ))
    } else {
        debug!(
            "directory: {} entries, {} bytes at {:#x}",
            end.total_entries, end.directory_size, end.directory_offset
        );
        Ok((
            u64::from(end.directory_offset),
            end.directory_size as usize,
            u64::from(end.total_entries),
        ))
    }
}

/// Lazy, finite, single-pass walk over every directory entry record, in
/// native directory order.
pub struct DirectoryIter {
    cursor: Cursor<Vec<u8>>,
    total: u64,
    yielded: u64,
    failed: bool,
}

impl DirectoryIter {
    /// Number of entries the directory declares.
    pub fn declared_entries(&self) -> u64 {
        self.total
    }
}

impl Iterator for DirectoryIter {
    type Item = Result<DirectoryEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.yielded == self.total {
            return None;
        }
        match DirectoryEntry::parse(&mut self.cursor) {
            Ok(entry) => {
                self.yielded += 1;
                Some(Ok(entry))
            }
            Err(e) => {
                // A broken record poisons everything after it
                self.failed = true;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.total - self.yielded) as usize;
        if self.failed { (0, Some(0)) } else { (left, Some(left)) }
    }
}

/// Read the container's directory once and iterate its entry records.
pub fn read_directory(container: &Container) -> Result<DirectoryIter> {
    let (offset, size, total) = directory_bounds(container)?;
    let data = container.read_at(offset, size)?;
    Ok(DirectoryIter {
        cursor: Cursor::new(data),
        total,
        yielded: 0,
        failed: false,
    })
}
