use std::sync::Mutex;
use std::time::{Duration, Instant};


/// Default sampling interval for speed recomputation.
const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Byte accounting for one pipeline run.
///
/// `processed_bytes` only ever grows. Speeds are recomputed at most once per
/// sampling interval so a burst of tiny reads doesn't make the figure jitter.
#[derive(Debug, Clone)]
pub struct TransferSession {
    total_bytes: u64,
    processed_bytes: u64,
    started_at: Instant,
    last_sample_at: Instant,
    last_sample_bytes: u64,
    current_speed: f64,
    average_speed: f64,
    peak_speed: f64,
}

impl TransferSession {
    /// Starts a session expecting `total_bytes` at `now`.
    pub fn new(total_bytes: u64, now: Instant) -> Self {
        Self {
            total_bytes,
            processed_bytes: 0,
            started_at: now,
            last_sample_at: now,
            last_sample_bytes: 0,
            current_speed: 0.0,
            average_speed: 0.0,
            peak_speed: 0.0,
        }
    }

    /// Accounts `bytes` observed at `now`, resampling speeds when at least
    /// `interval` has passed since the previous sample.
    ///
    /// A zero elapsed window leaves the instantaneous speed as it was.
    pub fn record(&mut self, bytes: u64, now: Instant, interval: Duration) {
        self.processed_bytes = self.processed_bytes.saturating_add(bytes);

        let since_sample = now.saturating_duration_since(self.last_sample_at);
        if since_sample < interval {
            return;
        }

        if !since_sample.is_zero() {
            let delta = self.processed_bytes - self.last_sample_bytes;
            self.current_speed = delta as f64 / since_sample.as_secs_f64();
            self.peak_speed = self.peak_speed.max(self.current_speed);
        }

        let since_start = now.saturating_duration_since(self.started_at);
        if !since_start.is_zero() {
            self.average_speed = self.processed_bytes as f64 / since_start.as_secs_f64();
        }

        self.last_sample_at = now;
        self.last_sample_bytes = self.processed_bytes;
    }

    /// Estimated time left at the average speed, `None` until a speed exists.
    pub fn eta(&self) -> Option<Duration> {
        if self.average_speed.is_nan() || self.average_speed <= 0.0 {
            return None;
        }
        let remaining = self.total_bytes.saturating_sub(self.processed_bytes);
        Duration::try_from_secs_f64(remaining as f64 / self.average_speed).ok()
    }

    fn snapshot(&self, now: Instant) -> Snapshot {
        Snapshot {
            total_bytes: self.total_bytes,
            processed_bytes: self.processed_bytes,
            elapsed: now.saturating_duration_since(self.started_at),
            current_speed: self.current_speed,
            average_speed: self.average_speed,
            peak_speed: self.peak_speed,
            eta: self.eta(),
        }
    }
}

/// Immutable copy of a session's counters, safe to render off the data path.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub total_bytes: u64,
    pub processed_bytes: u64,
    pub elapsed: Duration,
    pub current_speed: f64,
    pub average_speed: f64,
    pub peak_speed: f64,
    pub eta: Option<Duration>,
}

impl Snapshot {
    /// Completion percentage in `0.0..=100.0`. An empty transfer is complete.
    pub fn percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        (self.processed_bytes as f64 / self.total_bytes as f64 * 100.0).min(100.0)
    }

    /// Throughput over the whole run, measured now rather than at the last
    /// sample.
    pub fn overall_speed(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.processed_bytes as f64 / secs
        } else {
            0.0
        }
    }
}

/// Thread-safe windowed speed and ETA calculator.
///
/// Written by the data path through [`update`](Self::update), read by the
/// progress reporter through [`snapshot`](Self::snapshot).
pub struct ThroughputEstimator {
    session: Mutex<TransferSession>,
    interval: Duration,
}

impl ThroughputEstimator {
    /// Creates an estimator for `total_bytes` with the default 500 ms window.
    pub fn new(total_bytes: u64) -> Self {
        Self::with_interval(total_bytes, DEFAULT_INTERVAL)
    }

    /// Creates an estimator with a custom sampling interval.
    pub fn with_interval(total_bytes: u64, interval: Duration) -> Self {
        Self {
            session: Mutex::new(TransferSession::new(total_bytes, Instant::now())),
            interval,
        }
    }

    /// Records `bytes` transferred just now.
    pub fn update(&self, bytes: u64) {
        self.update_at(bytes, Instant::now());
    }

    /// Records `bytes` transferred at `now`.
    pub fn update_at(&self, bytes: u64, now: Instant) {
        let mut s = self.session.lock().unwrap();
        s.record(bytes, now, self.interval);
    }

    /// Returns a copy of the current counters.
    pub fn snapshot(&self) -> Snapshot {
        let s = self.session.lock().unwrap();
        s.snapshot(Instant::now())
    }

    /// Bytes accounted so far.
    pub fn processed_bytes(&self) -> u64 {
        self.session.lock().unwrap().processed_bytes
    }
}
