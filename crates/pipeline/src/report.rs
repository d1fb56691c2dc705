use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::format::{format_bytes, format_duration, format_remaining, format_speed};
use crate::{PauseGate, Snapshot, ThroughputEstimator};

/// Default redraw interval.
const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Carriage return plus erase-line, so each draw replaces the previous one.
const REWRITE: &str = "\r\x1b[K";

/// Renders estimator state as a single console line.
///
/// Holds only shared handles and reads snapshots; it never mutates the
/// pipeline.
pub struct ProgressReporter {
    estimator: Arc<ThroughputEstimator>,
    gate: Option<Arc<PauseGate>>,
    label: String,
}

impl ProgressReporter {
    pub fn new(
        estimator: Arc<ThroughputEstimator>,
        gate: Option<Arc<PauseGate>>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            estimator,
            gate,
            label: label.into(),
        }
    }

    /// Formats one progress line from a snapshot.
    pub fn render(label: &str, snap: &Snapshot, paused: bool) -> String {
        let mut line = String::new();
        if !label.is_empty() {
            line.push_str(label);
            line.push(' ');
        }
        if paused {
            line.push_str("[paused] ");
        }
        line.push_str(&format!(
            "{:.2}% | {}/{}",
            snap.percentage(),
            format_bytes(snap.processed_bytes),
            format_bytes(snap.total_bytes),
        ));

        if snap.processed_bytes > 0 && snap.average_speed > 0.0 {
            line.push_str(&format!(
                " | current {} | average {} | elapsed {} | remaining {}",
                format_speed(snap.current_speed),
                format_speed(snap.average_speed),
                format_duration(snap.elapsed),
                format_remaining(snap.eta),
            ));
        } else {
            line.push_str(&format!(" | elapsed {}", format_duration(snap.elapsed)));
        }
        line
    }

    /// Formats the completion summary.
    pub fn summary(snap: &Snapshot) -> String {
        format!(
            "{} in {} | average {} | peak {}",
            format_bytes(snap.processed_bytes),
            format_duration(snap.elapsed),
            format_speed(snap.overall_speed()),
            format_speed(snap.peak_speed),
        )
    }

    /// The line for the current state.
    pub fn render_line(&self) -> String {
        let paused = self.gate.as_ref().is_some_and(|g| g.is_paused());
        Self::render(&self.label, &self.estimator.snapshot(), paused)
    }

    /// Overwrites the current console line with fresh progress.
    pub fn draw<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "{REWRITE}{}", self.render_line())?;
        out.flush()
    }

    /// Starts redrawing to stderr every `interval` (500 ms if `None`).
    pub fn spawn(self: Arc<Self>, interval: Option<Duration>) -> ReporterHandle {
        self.spawn_to(interval, io::stderr())
    }

    /// Starts redrawing to `out` in a background tokio task.
    ///
    /// Call [`ReporterHandle::stop`] to draw the final line and end the task.
    pub fn spawn_to<W>(self: Arc<Self>, interval: Option<Duration>, mut out: W) -> ReporterHandle
    where
        W: Write + Send + 'static,
    {
        let (tx, mut rx) = oneshot::channel::<()>();
        let interval = interval.unwrap_or(DEFAULT_INTERVAL);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // A broken console must not take the transfer down.
                        let _ = self.draw(&mut out);
                    }
                    _ = &mut rx => {
                        let _ = self.draw(&mut out);
                        let _ = writeln!(out);
                        break;
                    }
                }
            }
        });

        ReporterHandle {
            stop: Some(tx),
            task,
        }
    }
}

/// Writer for log events that share the console with the progress line.
///
/// Erases the current line before the first byte of each event so a log
/// line never runs into a half-drawn progress line. The reporter redraws on
/// its next tick.
pub struct LineClearingWriter<W: Write> {
    inner: W,
    cleared: bool,
}

impl<W: Write> LineClearingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            cleared: false,
        }
    }
}

impl<W: Write> Write for LineClearingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.cleared {
            self.inner.write_all(REWRITE.as_bytes())?;
            self.cleared = true;
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// One writer per log event, for `tracing_subscriber::fmt().with_writer`.
pub fn stderr_log_writer() -> LineClearingWriter<io::Stderr> {
    LineClearingWriter::new(io::stderr())
}

/// Handle to a running reporter task.
pub struct ReporterHandle {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ReporterHandle {
    /// Draws the final line and waits for the task to exit.
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }
}
