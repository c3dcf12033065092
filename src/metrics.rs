use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for stream decoding and session outcomes
///
/// Thread-safe atomic counters shared by every session in the process.
#[derive(Default)]
pub struct StreamMetrics {
    /// Transport fragments received
    pub fragments: AtomicU64,

    /// Bytes received across all fragments
    pub bytes: AtomicU64,

    /// Complete records split out of the byte stream
    pub records: AtomicU64,

    /// Records without the data prefix or with an empty payload
    pub ignored_frames: AtomicU64,

    /// Frames dropped because their payload did not decode
    pub malformed_frames: AtomicU64,

    /// Events applied to a live session
    pub applied_events: AtomicU64,

    /// Sessions that reached `Complete`
    pub completed_sessions: AtomicU64,

    /// Sessions that reached `Failed`
    pub failed_sessions: AtomicU64,
}

impl StreamMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a transport fragment of `len` bytes
    pub fn record_fragment(&self, len: usize) {
        self.fragments.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(len as u64, Ordering::Relaxed);
    }

    pub fn record_records(&self, count: usize) {
        self.records.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_ignored(&self) {
        self.ignored_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event(&self) {
        self.applied_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self) {
        self.completed_sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed_sessions.fetch_add(1, Ordering::Relaxed);
    }

    /// Share of finished sessions that completed, as a percentage
    pub fn success_rate(&self) -> f64 {
        let completed = self.completed_sessions.load(Ordering::Relaxed);
        let failed = self.failed_sessions.load(Ordering::Relaxed);
        let total = completed + failed;
        if total > 0 {
            (completed as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Get snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            fragments: self.fragments.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            records: self.records.load(Ordering::Relaxed),
            ignored_frames: self.ignored_frames.load(Ordering::Relaxed),
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
            applied_events: self.applied_events.load(Ordering::Relaxed),
            completed_sessions: self.completed_sessions.load(Ordering::Relaxed),
            failed_sessions: self.failed_sessions.load(Ordering::Relaxed),
            success_rate: self.success_rate(),
        }
    }

    /// Reset all metrics (useful for testing)
    pub fn reset(&self) {
        for counter in [
            &self.fragments,
            &self.bytes,
            &self.records,
            &self.ignored_frames,
            &self.malformed_frames,
            &self.applied_events,
            &self.completed_sessions,
            &self.failed_sessions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Immutable snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub fragments: u64,
    pub bytes: u64,
    pub records: u64,
    pub ignored_frames: u64,
    pub malformed_frames: u64,
    pub applied_events: u64,
    pub completed_sessions: u64,
    pub failed_sessions: u64,
    pub success_rate: f64,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Stream Metrics: {} fragments ({} bytes), {} records, {} events, {} malformed, {} ignored, {} sessions ({:.1}% complete)",
            self.fragments,
            self.bytes,
            self.records,
            self.applied_events,
            self.malformed_frames,
            self.ignored_frames,
            self.completed_sessions + self.failed_sessions,
            self.success_rate
        )
    }
}

lazy_static::lazy_static! {
    /// Global metrics instance
    pub static ref STREAM_METRICS: StreamMetrics = StreamMetrics::new();
}
