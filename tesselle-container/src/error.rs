//! Error types for container parsing and positioned reads

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed container: {0}")]
    MalformedContainer(String),

    #[error("read beyond container bounds: offset={offset}, length={length}, size={size}")]
    ReadOutOfBounds { offset: u64, length: u64, size: u64 },

    #[error("entry name mismatch: expected {expected:?}, found {actual:?}")]
    NameMismatch { expected: String, actual: String },

    #[error("disallowed entry feature: {0}")]
    DisallowedFeature(&'static str),

    #[error("unsupported compression method {0}, only stored entries are readable")]
    UnsupportedCompression(u16),

    #[error("offset is the 64-bit sentinel but no zip64 extension record was found")]
    MissingZip64Offset,

    #[error("entry {0} declares a zero compressed size")]
    MissingSize(String),
}

pub type Result<T> = std::result::Result<T, Error>;
