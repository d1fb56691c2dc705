//! seqpack: stream directory trees into a stored ZIP for sequential media.

mod batch;
mod cli;

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use seqpack_archive::{ArchiveReport, ScanSummary, SequentialArchiveProducer};
use seqpack_pipeline::format::{format_bytes, format_duration};
use seqpack_pipeline::{
    CoalescingWriter, Config, Instrumentation, InteractiveSession, ProgressReporter,
    stderr_log_writer,
};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout may be carrying the archive.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(stderr_log_writer)
        .init();

    let cli = cli::Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let started = Instant::now();

    let (sources, destination) = if cli.batch {
        let (sources, destination) = batch::load(&cli.src_list, &cli.dst_list)?;
        (sources, Some(destination))
    } else {
        // clap guarantees a source outside batch mode.
        (cli.source.into_iter().collect(), cli.destination)
    };

    let producer =
        SequentialArchiveProducer::new(sources).copy_buffer_size(config.copy_buffer_size);

    match destination {
        Some(destination) => archive_to_file(producer, &destination, &config)?,
        None => archive_to_stdout(&producer, &config)?,
    }

    tracing::info!(total = %format_duration(started.elapsed()), "done");
    Ok(())
}

/// Plain streaming: no pause listener and no progress line.
fn archive_to_stdout(producer: &SequentialArchiveProducer, config: &Config) -> anyhow::Result<()> {
    let summary = producer.scan()?;
    let stdout = raw_stdout().context("cannot open stdout")?;

    let (mut stdout, report) =
        stream_archive(producer, &summary, stdout, config.coalesce_buffer_size)?;
    stdout.flush().context("flushing stdout")?;

    tracing::info!(
        entries = report.entries,
        bytes = %format_bytes(report.bytes),
        "archive streamed to stdout"
    );
    Ok(())
}

/// Streams the archive through a coalescing buffer of `capacity` bytes. The
/// tail is flushed even when the run fails, so the sink holds everything
/// that was archived.
fn stream_archive<W: Write>(
    producer: &SequentialArchiveProducer,
    summary: &ScanSummary,
    sink: W,
    capacity: usize,
) -> anyhow::Result<(W, ArchiveReport)> {
    let mut sink = CoalescingWriter::new(sink, capacity);
    let report = producer.write(&mut sink, summary, &Instrumentation::none());
    let flushed = sink.into_inner();
    let report = report?;
    let sink = flushed.context("flushing archive tail")?;
    Ok((sink, report))
}

/// Unbuffered handle on the stdout descriptor. `io::Stdout` is line
/// buffered and would split every coalesced block at its last newline.
#[cfg(unix)]
fn raw_stdout() -> io::Result<File> {
    use std::os::fd::AsFd;
    Ok(File::from(io::stdout().as_fd().try_clone_to_owned()?))
}

#[cfg(windows)]
fn raw_stdout() -> io::Result<File> {
    use std::os::windows::io::AsHandle;
    Ok(File::from(io::stdout().as_handle().try_clone_to_owned()?))
}

fn archive_to_file(
    producer: SequentialArchiveProducer,
    destination: &Path,
    config: &Config,
) -> anyhow::Result<()> {
    producer.check_destination(destination)?;

    for root in producer.roots() {
        tracing::info!(source = %root.display(), "scanning");
    }
    let summary = producer.scan()?;
    tracing::info!(
        files = summary.files,
        directories = summary.directories,
        size = %format_bytes(summary.total_bytes),
        "archiving"
    );

    let file = File::create(destination)
        .with_context(|| format!("cannot create {}", destination.display()))?;
    tracing::info!(destination = %destination.display(), "writing archive");
    let sink = CoalescingWriter::new(file, config.coalesce_buffer_size);

    let label = label_for(destination);
    let session = InteractiveSession::new(label, summary.total_bytes, config);
    let ((sink, result), snapshot) = session.run(move |instrumentation| {
        let mut sink = sink;
        let result = producer.write(&mut sink, &summary, &instrumentation);
        (sink, result)
    })?;

    // A failed run still leaves everything archived so far on disk.
    let flushed = sink.into_inner();
    let report = result?;
    let file = flushed.with_context(|| format!("cannot flush {}", destination.display()))?;
    file.sync_all()
        .with_context(|| format!("cannot sync {}", destination.display()))?;

    tracing::info!(
        entries = report.entries,
        files = report.files,
        directories = report.directories,
        "archive complete: {}",
        ProgressReporter::summary(&snapshot)
    );
    Ok(())
}

fn label_for(destination: &Path) -> String {
    destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| destination.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Records the length of every write it receives.
    #[derive(Default)]
    struct WriteSizes(Vec<usize>);

    impl Write for WriteSizes {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.push(buf.len());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn newline_heavy_payload_reaches_sink_in_full_blocks() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir(&src).unwrap();
        std::fs::write(src.join("lines.txt"), b"row\n".repeat(40_000)).unwrap();
        std::fs::write(src.join("nl.bin"), vec![b'\n'; 50_000]).unwrap();

        let producer = SequentialArchiveProducer::new([&src]).copy_buffer_size(1000);
        let summary = producer.scan().unwrap();
        let capacity = 8 * 1024;
        let (sink, report) =
            stream_archive(&producer, &summary, WriteSizes::default(), capacity).unwrap();

        assert_eq!(report.bytes, 210_000);
        let (last, full) = sink.0.split_last().unwrap();
        assert!(full.len() > 20);
        assert!(full.iter().all(|&len| len == capacity), "{:?}", sink.0);
        assert!(*last > 0 && *last <= capacity);
    }

    #[test]
    fn failed_run_still_flushes_the_tail() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir(&src).unwrap();
        std::fs::write(src.join("a"), b"abc").unwrap();

        let producer = SequentialArchiveProducer::new([&src]);
        let mut summary = producer.scan().unwrap();
        summary.files += 1;

        let mut bytes = Vec::new();
        assert!(stream_archive(&producer, &summary, &mut bytes, 1 << 20).is_err());
        assert_eq!(&bytes[..4], b"PK\x03\x04");
    }

    #[test]
    fn stdout_descriptor_opens() {
        raw_stdout().unwrap();
    }

    #[test]
    fn label_is_basename() {
        assert_eq!(label_for(Path::new("/tape/2024/backup.zip")), "backup.zip");
        assert_eq!(label_for(Path::new("/")), "/");
    }
}
