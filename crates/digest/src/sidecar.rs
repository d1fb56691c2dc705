use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use seqpack_pipeline::format::format_bytes;
use seqpack_pipeline::Config;

use crate::{DigestError, Result};

/// Size and timestamp of a file about to be digested.
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

/// Checks that `path` is an existing regular file and logs its details.
fn inspect(path: &Path) -> Result<FileInfo> {
    let meta = std::fs::metadata(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            DigestError::NotFound(path.to_path_buf())
        } else {
            DigestError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    if meta.is_dir() {
        return Err(DigestError::IsDirectory(path.to_path_buf()));
    }

    let info = FileInfo {
        path: path.to_path_buf(),
        size: meta.len(),
        modified: meta.modified().ok(),
    };
    tracing::info!(
        file = %path.display(),
        size = %format_bytes(info.size),
        modified = %format_time(info.modified),
        "target file"
    );
    Ok(info)
}

/// One parsed sidecar: `<hex-digest>  <basename>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarRecord {
    pub digest: String,
    /// File name recorded next to the digest, if any.
    pub name: Option<String>,
}

impl SidecarRecord {
    /// Parses the first whitespace-delimited token as the digest and the
    /// rest of the line as the file name. `None` if there is no token.
    pub fn parse(content: &str) -> Option<Self> {
        let line = content.trim();
        let mut parts = line.splitn(2, char::is_whitespace);
        let digest = parts.next().filter(|d| !d.is_empty())?;
        let name = parts
            .next()
            .map(|rest| rest.lines().next().unwrap_or_default().trim())
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        Some(Self {
            digest: digest.to_string(),
            name,
        })
    }

    /// The on-disk form, newline terminated.
    pub fn to_line(&self) -> String {
        match &self.name {
            Some(name) => format!("{}  {}\n", self.digest, name),
            None => format!("{}\n", self.digest),
        }
    }
}

/// What [`generate`] wrote.
#[derive(Debug, Clone)]
pub struct GenerateReport {
    pub digest: String,
    pub sidecar: PathBuf,
}

/// Digests `path` with `digest` and writes `<path>.<ext>` with
/// `<digest>  <basename>\n`.
///
/// `digest` receives the inspected file and returns its lowercase hex
/// SHA-256; callers choose how it runs (plain, or inside a progress
/// session).
pub fn generate<F>(path: &Path, config: &Config, digest: F) -> Result<GenerateReport>
where
    F: FnOnce(&FileInfo) -> Result<String>,
{
    let info = inspect(path)?;
    let digest = digest(&info)?;
    write_sidecar(path, config, digest)
}

fn write_sidecar(path: &Path, config: &Config, digest: String) -> Result<GenerateReport> {
    let sidecar = config.sidecar_path(path);
    let record = SidecarRecord {
        digest,
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned()),
    };
    std::fs::write(&sidecar, record.to_line()).map_err(|source| DigestError::SidecarWrite {
        path: sidecar.clone(),
        source,
    })?;

    tracing::info!(digest = %record.digest, sidecar = %sidecar.display(), "sidecar written");
    Ok(GenerateReport {
        digest: record.digest,
        sidecar,
    })
}

/// Reads and parses the sidecar belonging to `path`.
///
/// Missing, unreadable and malformed sidecars are distinct errors. A
/// recorded name that differs from `path`'s basename is only warned about.
fn load_sidecar(path: &Path, config: &Config) -> Result<SidecarRecord> {
    let sidecar = config.sidecar_path(path);
    let content = std::fs::read_to_string(&sidecar).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            DigestError::SidecarNotFound(sidecar.clone())
        } else {
            DigestError::SidecarUnreadable {
                path: sidecar.clone(),
                source,
            }
        }
    })?;
    let record =
        SidecarRecord::parse(&content).ok_or_else(|| DigestError::SidecarFormat(sidecar.clone()))?;

    let created = std::fs::metadata(&sidecar).and_then(|m| m.modified()).ok();
    tracing::info!(
        sidecar = %sidecar.display(),
        written = %format_time(created),
        expected = %record.digest,
        "sidecar loaded"
    );

    match (&record.name, path.file_name().map(|n| n.to_string_lossy())) {
        (Some(recorded), Some(actual)) if recorded.as_str() != actual => {
            tracing::warn!(recorded = %recorded, file = %actual, "sidecar names a different file");
        }
        _ => {}
    }
    Ok(record)
}

/// Exact, case-sensitive comparison of hex digests.
fn check_digest(expected: &str, actual: &str) -> Result<()> {
    tracing::info!(expected, actual, "comparing digests");
    if expected == actual {
        Ok(())
    } else {
        Err(DigestError::Mismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

/// Recomputes the digest of `path` with `digest` and compares it to its
/// sidecar.
///
/// The sidecar is read first; `digest` is never called if it is missing or
/// malformed. Returns the verified digest.
pub fn verify<F>(path: &Path, config: &Config, digest: F) -> Result<String>
where
    F: FnOnce(&FileInfo) -> Result<String>,
{
    let info = inspect(path)?;
    let record = load_sidecar(path, config)?;
    let actual = digest(&info)?;
    check_digest(&record.digest, &actual)?;
    Ok(actual)
}

fn format_time(t: Option<SystemTime>) -> String {
    match t {
        Some(t) => DateTime::<Local>::from(t)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => "unknown".into(),
    }
}
