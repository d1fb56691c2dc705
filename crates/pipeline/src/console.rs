//! Operator console plumbing: the stdin pause listener and the session
//! driver that runs a data-path job alongside the progress reporter.

use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::{Config, Instrumentation, PauseGate, ProgressReporter, Snapshot, ThroughputEstimator};

/// Toggles `gate` once per line read from `input` until it ends or fails.
///
/// Returns the number of toggles performed.
pub fn listen_for_toggles<R: BufRead>(input: R, gate: &PauseGate) -> usize {
    let mut toggles = 0;
    for line in input.lines() {
        if line.is_err() {
            break;
        }
        gate.toggle();
        toggles += 1;
    }
    toggles
}

/// Spawns a detached thread that toggles `gate` on every stdin line.
///
/// A plain thread rather than a tokio task: a blocking stdin read would
/// otherwise hold up runtime shutdown.
pub fn spawn_pause_listener(gate: Arc<PauseGate>) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("pause-listener".into())
        .spawn(move || {
            let toggles = listen_for_toggles(io::stdin().lock(), &gate);
            tracing::debug!(toggles, "pause listener stopped");
        })
}

/// One interactive pipeline run: a pause gate, an estimator, a progress
/// line on stderr and (optionally) the stdin listener.
pub struct InteractiveSession {
    gate: Arc<PauseGate>,
    estimator: Arc<ThroughputEstimator>,
    label: String,
    report_interval: Duration,
    listen_stdin: bool,
}

impl InteractiveSession {
    /// Prepares a session expecting `total_bytes`.
    pub fn new(label: impl Into<String>, total_bytes: u64, config: &Config) -> Self {
        Self {
            gate: Arc::new(PauseGate::new()),
            estimator: Arc::new(ThroughputEstimator::with_interval(
                total_bytes,
                config.sample_interval(),
            )),
            label: label.into(),
            report_interval: config.report_interval(),
            listen_stdin: true,
        }
    }

    /// Enables or disables the stdin pause listener (on by default).
    pub fn listen_stdin(mut self, enabled: bool) -> Self {
        self.listen_stdin = enabled;
        self
    }

    /// The instrumentation handed to the data path.
    pub fn instrumentation(&self) -> Instrumentation {
        Instrumentation::new(Arc::clone(&self.gate), Arc::clone(&self.estimator))
    }

    /// Runs `job` on a blocking worker thread while the reporter redraws.
    ///
    /// Returns the job's output and the final counters. A panic in the job is
    /// resumed on the calling thread.
    pub fn run<F, T>(self, job: F) -> io::Result<(T, Snapshot)>
    where
        F: FnOnce(Instrumentation) -> T + Send + 'static,
        T: Send + 'static,
    {
        let rt = tokio::runtime::Runtime::new()?;

        if self.listen_stdin {
            spawn_pause_listener(Arc::clone(&self.gate))?;
            tracing::info!("press Enter to pause or resume");
        }

        let instrumentation = self.instrumentation();
        let reporter = Arc::new(ProgressReporter::new(
            Arc::clone(&self.estimator),
            Some(Arc::clone(&self.gate)),
            self.label,
        ));
        let interval = self.report_interval;

        let joined = rt.block_on(async move {
            let handle = reporter.spawn(Some(interval));
            let joined = tokio::task::spawn_blocking(move || job(instrumentation)).await;
            handle.stop().await;
            joined
        });

        let value = match joined {
            Ok(value) => value,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => return Err(io::Error::other(e)),
        };
        Ok((value, self.estimator.snapshot()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn each_line_toggles() {
        let gate = PauseGate::new();
        let toggles = listen_for_toggles(Cursor::new("\n\n\n"), &gate);
        assert_eq!(toggles, 3);
        assert!(gate.is_paused());
    }

    #[test]
    fn even_number_of_lines_leaves_gate_open() {
        let gate = PauseGate::new();
        listen_for_toggles(Cursor::new("p\nr\n"), &gate);
        assert!(!gate.is_paused());
    }

    #[test]
    fn empty_input_never_toggles() {
        let gate = PauseGate::new();
        assert_eq!(listen_for_toggles(Cursor::new(""), &gate), 0);
        assert!(!gate.is_paused());
    }

    #[test]
    fn session_runs_job_and_reports_counters() {
        let config = Config::default();
        let session = InteractiveSession::new("test", 4096, &config).listen_stdin(false);

        let (written, snap) = session
            .run(|instr| {
                let mut out = instr.wrap(Vec::new());
                for _ in 0..4 {
                    out.write_all(&[0u8; 1024]).unwrap();
                }
                out.into_inner().len()
            })
            .unwrap();

        assert_eq!(written, 4096);
        assert_eq!(snap.processed_bytes, 4096);
        assert_eq!(snap.total_bytes, 4096);
        assert_eq!(snap.percentage(), 100.0);
    }

    #[test]
    #[should_panic(expected = "job exploded")]
    fn session_resumes_job_panic() {
        let session =
            InteractiveSession::new("panic", 0, &Config::default()).listen_stdin(false);
        let _ = session.run(|_| -> usize { panic!("job exploded") });
    }
}
