//! Instrumented sequential I/O pipeline.
//!
//! The building blocks shared by the archiver and the digest tool: a
//! cooperative [`PauseGate`], a windowed [`ThroughputEstimator`], a
//! [`CoalescingWriter`] that batches small writes into large sequential
//! ones, the [`InstrumentedStream`] wrapper tying the first two to any
//! reader or writer, and the console-facing [`ProgressReporter`].

mod coalesce;
mod config;
mod console;
pub mod format;
mod gate;
mod instrument;
mod report;
mod throughput;

pub use coalesce::{CoalescingBuffer, CoalescingWriter};
pub use config::{Config, ConfigError};
pub use console::{InteractiveSession, listen_for_toggles, spawn_pause_listener};
pub use gate::PauseGate;
pub use instrument::{Instrumentation, InstrumentedStream, ProgressSink};
pub use report::{LineClearingWriter, ProgressReporter, ReporterHandle, stderr_log_writer};
pub use throughput::{Snapshot, ThroughputEstimator, TransferSession};

/// Default archiver copy chunk: 1 MiB.
pub const DEFAULT_COPY_BUFFER_SIZE: usize = 1024 * 1024;

/// Default coalescing buffer capacity: 10 MiB.
///
/// Large enough that a tape drive streams without stopping between writes.
pub const DEFAULT_COALESCE_BUFFER_SIZE: usize = 10 * 1024 * 1024;

/// Default digest read chunk: 32 MiB.
pub const DEFAULT_DIGEST_BUFFER_SIZE: usize = 32 * 1024 * 1024;
