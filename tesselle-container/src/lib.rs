//! Stored-subset ZIP container parsing for 3D Tiles archives.
//!
//! This crate provides the low-level pieces an indexed tileset archive is
//! built on: the binary record parsers for the container's catalog, the
//! trailing-window scan that locates the reserved index entry, and a
//! read-only container handle supporting bounded positioned reads.

pub mod container;
pub mod directory;
pub mod error;
pub mod records;

pub use container::Container;
pub use directory::{
    DirectoryIter, TAIL_WINDOW, locate_end_of_index, read_directory, read_local_entry_at,
};
pub use error::{Error, Result};
pub use records::{
    DirectoryEntry, EndOfDirectory, LocalEntry, METHOD_STORED, parse_directory_entry,
};
