use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{Datelike, Local};
use seqpack_pipeline::{DEFAULT_COPY_BUFFER_SIZE, Instrumentation};
use zip::write::{SimpleFileOptions, StreamWriter};
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::{ArchiveEntryPlan, ArchiveError, EntryPlanner, Result, ScanSummary};

/// What the write phase actually produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    pub entries: u64,
    pub files: u64,
    pub directories: u64,
    /// Payload bytes copied, excluding ZIP framing.
    pub bytes: u64,
}

/// Streams one or more source trees into a stored ZIP, front to back.
///
/// Runs in two phases over the same roots: [`scan`](Self::scan) totals the
/// tree, [`write`](Self::write) copies it in the identical order and fails
/// with [`ArchiveError::Incomplete`] if the totals no longer agree.
#[derive(Debug, Clone)]
pub struct SequentialArchiveProducer {
    roots: Vec<PathBuf>,
    copy_buffer_size: usize,
}

impl SequentialArchiveProducer {
    pub fn new(roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            copy_buffer_size: DEFAULT_COPY_BUFFER_SIZE,
        }
    }

    /// Per-chunk read size. Zero falls back to the default.
    pub fn copy_buffer_size(mut self, size: usize) -> Self {
        self.copy_buffer_size = if size == 0 {
            DEFAULT_COPY_BUFFER_SIZE
        } else {
            size
        };
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Rejects a destination that resolves inside any source root.
    pub fn check_destination(&self, destination: &Path) -> Result<()> {
        crate::check_self_inclusion(destination, &self.roots)
    }

    /// Scan phase.
    pub fn scan(&self) -> Result<ScanSummary> {
        let summary = crate::scan(&self.roots)?;
        tracing::info!(
            files = summary.files,
            directories = summary.directories,
            bytes = summary.total_bytes,
            "scan complete"
        );
        Ok(summary)
    }

    /// Write phase: streams every entry into `sink` through the zip crate's
    /// forward-only writer, then appends the central directory.
    ///
    /// The sink stays with the caller on every outcome, so whatever reached
    /// it can still be flushed for inspection. A totals mismatch is reported
    /// as [`ArchiveError::Incomplete`] after the central directory is
    /// written; the archive then lists exactly what was copied.
    pub fn write<W: Write>(
        &self,
        sink: &mut W,
        expected: &ScanSummary,
        instrumentation: &Instrumentation,
    ) -> Result<ArchiveReport> {
        let mut zip = ZipWriter::new_stream(sink);
        let mut report = ArchiveReport::default();
        let mut buf = vec![0u8; self.copy_buffer_size];

        for root in &self.roots {
            for plan in EntryPlanner::new(root)? {
                let plan = plan?;
                instrumentation.wait_if_paused();
                tracing::debug!(path = %plan.path.display(), "processing");

                if plan.is_dir {
                    zip.add_directory(plan.name.as_str(), entry_options(&plan))?;
                    report.directories += 1;
                } else {
                    let copied = copy_file(&mut zip, &plan, &mut buf, instrumentation)?;
                    if copied != plan.size {
                        tracing::warn!(
                            path = %plan.path.display(),
                            planned = plan.size,
                            copied,
                            "file changed size while archiving"
                        );
                    }
                    report.files += 1;
                    report.bytes += copied;
                }
                report.entries += 1;
            }
        }

        zip.finish()?;

        if report.files != expected.files || report.bytes != expected.total_bytes {
            return Err(ArchiveError::Incomplete {
                expected_files: expected.files,
                expected_bytes: expected.total_bytes,
                written_files: report.files,
                written_bytes: report.bytes,
            });
        }
        Ok(report)
    }
}

/// Stored, with the entry's own timestamp and permission bits. Entries whose
/// scanned size reaches the 4 GiB field limit get ZIP64 sizes up front,
/// since a streamed entry cannot be rewritten once its payload starts.
fn entry_options(plan: &ArchiveEntryPlan) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(dos_time(plan.modified))
        .unix_permissions(plan.mode)
        .large_file(plan.size >= zip::ZIP64_BYTES_THR)
}

/// Local wall-clock time as an MS-DOS timestamp, clamped to 1980..=2107.
fn dos_time(modified: SystemTime) -> DateTime {
    let local = chrono::DateTime::<Local>::from(modified).naive_local();
    DateTime::try_from(local).unwrap_or_else(|_| {
        if local.year() < 1980 {
            DateTime::default()
        } else {
            DateTime::from_date_and_time(2107, 12, 31, 23, 59, 58).unwrap_or_default()
        }
    })
}

/// Copies one file into a new entry, chunk by chunk through the
/// instrumented reader so every read first checks the pause gate.
fn copy_file<W: Write>(
    zip: &mut ZipWriter<StreamWriter<W>>,
    plan: &ArchiveEntryPlan,
    buf: &mut [u8],
    instrumentation: &Instrumentation,
) -> Result<u64> {
    let read_err = |source: io::Error| ArchiveError::Read {
        path: plan.path.clone(),
        source,
    };

    let file = File::open(&plan.path).map_err(read_err)?;
    let mut reader = instrumentation.wrap(file);

    zip.start_file(plan.name.as_str(), entry_options(plan))?;

    let mut copied = 0u64;
    loop {
        let n = match reader.read(buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_err(e)),
        };
        zip.write_all(&buf[..n]).map_err(ArchiveError::Sink)?;
        copied += n as u64;
    }
    Ok(copied)
}
