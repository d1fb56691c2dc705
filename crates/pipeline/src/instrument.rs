use std::io::{self, Read, Write};
use std::sync::Arc;

use crate::{PauseGate, ThroughputEstimator};

/// Receives byte counts after each successful transfer, e.g. a progress bar.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, bytes: u64);
}

impl<F> ProgressSink for F
where
    F: Fn(u64) + Send + Sync,
{
    fn on_progress(&self, bytes: u64) {
        self(bytes)
    }
}

/// The shared pieces an [`InstrumentedStream`] reports into.
///
/// Every part is optional; [`Instrumentation::none`] yields a transparent
/// wrapper, which is what the archiver uses when streaming to stdout.
#[derive(Clone, Default)]
pub struct Instrumentation {
    gate: Option<Arc<PauseGate>>,
    estimator: Option<Arc<ThroughputEstimator>>,
    sink: Option<Arc<dyn ProgressSink>>,
}

impl Instrumentation {
    /// No pausing, no accounting.
    pub fn none() -> Self {
        Self::default()
    }

    /// Pause checks against `gate`, accounting into `estimator`.
    pub fn new(gate: Arc<PauseGate>, estimator: Arc<ThroughputEstimator>) -> Self {
        Self {
            gate: Some(gate),
            estimator: Some(estimator),
            sink: None,
        }
    }

    /// Adds a progress notification target.
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Blocks while the gate (if any) is paused.
    pub fn wait_if_paused(&self) {
        if let Some(gate) = &self.gate {
            gate.wait_if_paused();
        }
    }

    /// Accounts `bytes` into the estimator and the progress sink.
    pub fn record(&self, bytes: u64) {
        if let Some(estimator) = &self.estimator {
            estimator.update(bytes);
        }
        if let Some(sink) = &self.sink {
            sink.on_progress(bytes);
        }
    }

    /// Wraps `inner` so its reads or writes report here.
    pub fn wrap<S>(&self, inner: S) -> InstrumentedStream<S> {
        InstrumentedStream::new(inner, self.clone())
    }
}

/// Reader/writer wrapper that waits on the pause gate before touching the
/// inner stream and accounts every successful transfer afterwards.
///
/// Pauses land between calls, never inside one, so a caller copying in
/// chunks is suspended at a chunk boundary.
pub struct InstrumentedStream<S> {
    inner: S,
    instrumentation: Instrumentation,
    transferred: u64,
}

impl<S> InstrumentedStream<S> {
    pub fn new(inner: S, instrumentation: Instrumentation) -> Self {
        Self {
            inner,
            instrumentation,
            transferred: 0,
        }
    }

    /// Bytes moved through this wrapper so far.
    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn account(&mut self, n: usize) {
        if n > 0 {
            self.transferred += n as u64;
            self.instrumentation.record(n as u64);
        }
    }
}

impl<R: Read> Read for InstrumentedStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.instrumentation.wait_if_paused();
        let n = self.inner.read(buf)?;
        self.account(n);
        Ok(n)
    }
}

impl<W: Write> Write for InstrumentedStream<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.instrumentation.wait_if_paused();
        let n = self.inner.write(buf)?;
        self.account(n);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
