//! Sequential archive producer.
//!
//! Walks source trees in a stable order and streams every entry, stored,
//! into a forward-only ZIP through the `zip` crate's streaming writer. A
//! scan pass sizes the run first; the write pass must reproduce the scanned
//! totals exactly.

mod guard;
mod names;
mod plan;
mod producer;

use std::path::PathBuf;

pub use guard::{check_self_inclusion, resolve_path};
pub use names::archive_name;
pub use plan::{ArchiveEntryPlan, EntryPlanner, ScanSummary, scan};
pub use producer::{ArchiveReport, SequentialArchiveProducer};

/// Errors produced by the archive crate.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("destination {} lies inside source {}", destination.display(), root.display())]
    SelfInclusion { destination: PathBuf, root: PathBuf },

    #[error("cannot resolve {}: {source}", path.display())]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("traversal failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("cannot derive an archive name for {}", .0.display())]
    InvalidName(PathBuf),

    #[error("archive write failed: {0}")]
    Sink(#[source] std::io::Error),

    #[error("zip encoder failed: {0}")]
    Codec(#[from] zip::result::ZipError),

    #[error(
        "archive incomplete: scanned {expected_files} files / {expected_bytes} bytes, \
         wrote {written_files} files / {written_bytes} bytes"
    )]
    Incomplete {
        expected_files: u64,
        expected_bytes: u64,
        written_files: u64,
        written_bytes: u64,
    },
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
