//! Streaming file digests and `.sha256` sidecar records.
//!
//! [`StreamingDigestComputer`] reads a file once, front to back, through the
//! same [`Instrumentation`](seqpack_pipeline::Instrumentation) the archiver
//! uses. [`generate`] and [`verify`] run the sidecar workflow around any
//! digest runner, typically that computer inside a progress session.

mod computer;
mod sidecar;

use std::path::PathBuf;

pub use computer::StreamingDigestComputer;
pub use sidecar::{FileInfo, GenerateReport, SidecarRecord, generate, verify};

/// Errors produced by the digest crate.
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("expected a file but found a directory: {}", .0.display())]
    IsDirectory(PathBuf),

    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("sidecar not found: {}", .0.display())]
    SidecarNotFound(PathBuf),

    #[error("cannot read sidecar {}: {source}", path.display())]
    SidecarUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed sidecar {}: no digest token", .0.display())]
    SidecarFormat(PathBuf),

    #[error("cannot write sidecar {}: {source}", path.display())]
    SidecarWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("progress session failed: {0}")]
    Session(#[source] std::io::Error),

    #[error("digest mismatch: expected {expected}, got {actual}; the file is corrupt or was modified")]
    Mismatch { expected: String, actual: String },
}

pub type Result<T> = std::result::Result<T, DigestError>;
