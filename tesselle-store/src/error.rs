//! Error types for index handling and the reader backends

use crate::index::ValidationReport;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("container error: {0}")]
    Container(#[from] tesselle_container::Error),

    #[error("malformed index: blob length {length} is not a multiple of {record_size}")]
    MalformedIndex { length: usize, record_size: usize },

    #[error("index failed validation: {0}")]
    InvalidIndex(ValidationReport),

    #[error("index collision between entries {first} and {second}")]
    IndexCollision { first: usize, second: usize },

    #[error("index order violation at entry {position}")]
    IndexOrderViolation { position: usize },

    #[error("root manifest {0} is not resolvable through the index")]
    RootUnresolvable(String),

    #[error("index disagrees with the container directory: {0}")]
    CrossValidationMismatch(String),

    #[error("entry not found: {0}")]
    NotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("keyed table error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
