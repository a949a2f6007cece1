//! The hash-sorted index and its validation

pub mod sorted_index;
pub mod validator;

pub use sorted_index::{INDEX_RECORD_SIZE, IndexEntry, TilesetIndex};
pub use validator::{
    CrossValidationIssue, OrderingReport, ValidationMode, ValidationReport, check_ordering,
    check_root_resolvable, cross_validate, validate_index,
};
