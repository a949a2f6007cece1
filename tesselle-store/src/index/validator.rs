//! Index integrity validation.
//!
//! Findings accumulate into a [`ValidationReport`] instead of aborting at
//! the first hit, so a broken index can be diagnosed in one pass.

use crate::error::{Result, StoreError};
use crate::index::TilesetIndex;
use crate::types::{ContentHash, INDEX_ENTRY_NAME, ROOT_MANIFEST_NAME};
use std::fmt;
use tesselle_container::{Container, read_directory, read_local_entry_at};
use tracing::{debug, warn};

/// How much validation a reader runs at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Trust the index as-is.
    Skip,
    /// Ordering invariant plus root resolvability.
    #[default]
    Quick,
    /// Quick checks plus the full cross-validation pass.
    Thorough,
}

/// Findings of the adjacent-pair ordering scan.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OrderingReport {
    /// Pairs of entry positions holding byte-identical hashes.
    pub collisions: Vec<(usize, usize)>,
    /// Positions whose entry does not strictly follow its predecessor.
    pub order_violations: Vec<usize>,
}

impl OrderingReport {
    pub fn is_clean(&self) -> bool {
        self.collisions.is_empty() && self.order_violations.is_empty()
    }
}

/// One disagreement between the index and the container's directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrossValidationIssue {
    /// A real container entry whose hash the index does not know.
    MissingEntry { name: String, hash: ContentHash },
    /// The index and the directory disagree on where an entry lives.
    OffsetMismatch {
        name: String,
        index_offset: u64,
        directory_offset: u64,
    },
    /// Validated entry count differs from the index's record count.
    CountMismatch {
        index_entries: usize,
        container_entries: usize,
    },
    /// The directory itself could not be walked to the end.
    DirectoryUnreadable(String),
}

impl fmt::Display for CrossValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEntry { name, hash } => {
                write!(f, "entry {name:?} (hash {hash}) is missing from the index")
            }
            Self::OffsetMismatch {
                name,
                index_offset,
                directory_offset,
            } => write!(
                f,
                "entry {name:?} is at {directory_offset:#x} but the index stores {index_offset:#x}"
            ),
            Self::CountMismatch {
                index_entries,
                container_entries,
            } => write!(
                f,
                "index holds {index_entries} entries but the container holds {container_entries}"
            ),
            Self::DirectoryUnreadable(reason) => {
                write!(f, "container directory is unreadable: {reason}")
            }
        }
    }
}

/// Combined result of the validation passes.
#[derive(Debug, Default, Clone)]
pub struct ValidationReport {
    pub ordering: OrderingReport,
    pub root_resolvable: bool,
    /// Cross-validation findings, present only when the pass ran.
    pub cross: Option<Vec<CrossValidationIssue>>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.ordering.is_clean()
            && self.root_resolvable
            && self.cross.as_ref().is_none_or(Vec::is_empty)
    }

    /// Convert the report into the first matching error, for callers that
    /// want a hard failure instead of a diagnosis.
    pub fn into_result(self) -> Result<()> {
        if let Some(&(first, second)) = self.ordering.collisions.first() {
            return Err(StoreError::IndexCollision { first, second });
        }
        if let Some(&position) = self.ordering.order_violations.first() {
            return Err(StoreError::IndexOrderViolation { position });
        }
        if !self.root_resolvable {
            return Err(StoreError::RootUnresolvable(ROOT_MANIFEST_NAME.to_string()));
        }
        if let Some(issue) = self.cross.as_ref().and_then(|issues| issues.first()) {
            return Err(StoreError::CrossValidationMismatch(issue.to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            return write!(f, "index is valid");
        }
        let mut parts = Vec::new();
        if !self.ordering.collisions.is_empty() {
            parts.push(format!("{} collisions", self.ordering.collisions.len()));
        }
        if !self.ordering.order_violations.is_empty() {
            parts.push(format!(
                "{} order violations",
                self.ordering.order_violations.len()
            ));
        }
        if !self.root_resolvable {
            parts.push(format!("{ROOT_MANIFEST_NAME} unresolvable"));
        }
        if let Some(issues) = &self.cross
            && !issues.is_empty()
        {
            parts.push(format!("{} cross-validation mismatches", issues.len()));
        }
        write!(f, "{}", parts.join(", "))
    }
}

/// Scan adjacent index entries for collisions and ordering violations.
pub fn check_ordering(index: &TilesetIndex) -> OrderingReport {
    let mut report = OrderingReport::default();
    let entries = index.entries();

    for i in 1..entries.len() {
        let previous = &entries[i - 1].hash;
        let current = &entries[i].hash;
        if previous.as_bytes() == current.as_bytes() {
            report.collisions.push((i - 1, i));
        } else if previous >= current {
            report.order_violations.push(i);
        }
    }

    if !report.is_clean() {
        warn!(
            "index ordering check failed: {} collisions, {} order violations",
            report.collisions.len(),
            report.order_violations.len()
        );
    }
    report
}

/// Check that the mandatory root manifest resolves through the index to a
/// readable local entry.
pub fn check_root_resolvable(index: &TilesetIndex, container: &Container) -> bool {
    let hash = ContentHash::of_path(ROOT_MANIFEST_NAME);
    let Some(offset) = index.lookup(&hash) else {
        warn!("root manifest {ROOT_MANIFEST_NAME:?} is not in the index");
        return false;
    };
    match read_local_entry_at(container, offset, ROOT_MANIFEST_NAME) {
        Ok(_) => true,
        Err(e) => {
            warn!("root manifest local entry at {offset:#x} is unreadable: {e}");
            false
        }
    }
}

/// The thorough pass: stream every real directory entry and require the
/// index to agree on presence, offset, and total count.
pub fn cross_validate(index: &TilesetIndex, container: &Container) -> Vec<CrossValidationIssue> {
    let mut issues = Vec::new();

    let iter = match read_directory(container) {
        Ok(iter) => iter,
        Err(e) => {
            issues.push(CrossValidationIssue::DirectoryUnreadable(e.to_string()));
            return issues;
        }
    };

    let mut container_entries = 0usize;
    for entry in iter {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                issues.push(CrossValidationIssue::DirectoryUnreadable(e.to_string()));
                return issues;
            }
        };

        // The index's own storage entry is not indexed
        if entry.name == INDEX_ENTRY_NAME {
            continue;
        }
        container_entries += 1;

        let hash = ContentHash::of_path(&entry.name);
        match index.lookup(&hash) {
            None => issues.push(CrossValidationIssue::MissingEntry {
                name: entry.name,
                hash,
            }),
            Some(index_offset) if index_offset != entry.local_header_offset => {
                issues.push(CrossValidationIssue::OffsetMismatch {
                    name: entry.name,
                    index_offset,
                    directory_offset: entry.local_header_offset,
                });
            }
            Some(_) => {}
        }
    }

    if container_entries != index.len() {
        issues.push(CrossValidationIssue::CountMismatch {
            index_entries: index.len(),
            container_entries,
        });
    }

    for issue in &issues {
        warn!("cross-validation: {issue}");
    }
    debug!(
        "cross-validated {} container entries against {} index entries: {} issues",
        container_entries,
        index.len(),
        issues.len()
    );
    issues
}

/// Run the validation passes.
///
/// Ordering and root checks always run; the expensive cross-validation pass
/// runs only when requested, and only when the cheaper checks came back
/// clean - a structurally broken index is not worth a full enumeration.
pub fn validate_index(
    index: &TilesetIndex,
    container: &Container,
    thorough: bool,
) -> ValidationReport {
    let ordering = check_ordering(index);
    let root_resolvable = check_root_resolvable(index, container);

    let cross = if thorough && ordering.is_clean() && root_resolvable {
        Some(cross_validate(index, container))
    } else {
        None
    };

    ValidationReport {
        ordering,
        root_resolvable,
        cross,
    }
}
