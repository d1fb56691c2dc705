//! seqsum: SHA-256 sidecar generation and verification with live progress.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use seqpack_digest::{DigestError, FileInfo, StreamingDigestComputer, generate, verify};
use seqpack_pipeline::format::{format_bytes, format_duration};
use seqpack_pipeline::{Config, InteractiveSession, ProgressReporter, stderr_log_writer};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "seqsum")]
#[command(about = "Generate or verify SHA-256 sidecar files with live throughput")]
#[command(author, version, long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Writes <file>.sha256 next to the file
    #[command(visible_aliases = ["gen", "g"])]
    Generate {
        file: PathBuf,
    },

    /// Checks the file against its .sha256 sidecar
    #[command(visible_aliases = ["check", "v"])]
    Verify {
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(stderr_log_writer)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let started = Instant::now();

    match cli.command {
        Command::Generate { file } => {
            tracing::info!("generate mode");
            let report = generate(&file, &config, |info| digest_with_progress(info, &config))?;
            tracing::info!(
                digest = %report.digest,
                sidecar = %report.sidecar.display(),
                "generated"
            );
        }
        Command::Verify { file } => {
            tracing::info!("verify mode");
            verify(&file, &config, |info| digest_with_progress(info, &config))?;
            tracing::info!(file = %file.display(), "integrity verified, file is unchanged");
        }
    }

    tracing::info!(total = %format_duration(started.elapsed()), "done");
    Ok(())
}

/// Digests the file on a worker thread while the progress line and pause
/// listener run.
fn digest_with_progress(info: &FileInfo, config: &Config) -> seqpack_digest::Result<String> {
    let computer = StreamingDigestComputer::new(config.digest_buffer_size);
    tracing::info!(buffer = %format_bytes(computer.buffer_size() as u64), "computing sha256");

    let label = info
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let session = InteractiveSession::new(label, info.size, config);
    let path = info.path.clone();
    let (digest, snapshot) = session
        .run(move |instrumentation| computer.digest(&path, &instrumentation))
        .map_err(DigestError::Session)?;
    let digest = digest?;

    tracing::info!("{}", ProgressReporter::summary(&snapshot));
    Ok(digest)
}
