//! Lightweight operation timers.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counts timed operations and accumulates their durations.
///
/// Safe to share between tasks; all updates are atomic.
#[derive(Debug, Default)]
pub struct OperationTimer {
    name: &'static str,
    count: AtomicU64,
    total_nanos: AtomicU64,
    max_nanos: AtomicU64,
}

/// Point-in-time view of an [`OperationTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
    /// Timer name.
    pub name: &'static str,
    /// Number of recorded operations.
    pub count: u64,
    /// Sum of all durations.
    pub total: Duration,
    /// Longest single duration.
    pub max: Duration,
}

impl OperationTimer {
    /// Create an empty timer.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            count: AtomicU64::new(0),
            total_nanos: AtomicU64::new(0),
            max_nanos: AtomicU64::new(0),
        }
    }

    /// Record one operation of the given duration.
    pub fn record(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.max_nanos.fetch_max(nanos, Ordering::Relaxed);
    }

    /// Run a synchronous operation and record how long it took.
    pub fn time<T>(&self, op: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = op();
        self.record(start.elapsed());
        out
    }

    /// Await `fut` and record how long it took, whatever its outcome.
    pub async fn time_async<F: Future>(&self, fut: F) -> F::Output {
        let start = Instant::now();
        let out = fut.await;
        self.record(start.elapsed());
        out
    }

    /// Current totals.
    #[must_use]
    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            name: self.name,
            count: self.count.load(Ordering::Relaxed),
            total: Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed)),
            max: Duration::from_nanos(self.max_nanos.load(Ordering::Relaxed)),
        }
    }
}

impl TimerSnapshot {
    /// Mean duration, zero when nothing was recorded.
    #[must_use]
    pub fn mean(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        let count = u32::try_from(self.count).unwrap_or(u32::MAX);
        self.total / count
    }
}

impl fmt::Display for TimerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: count={} mean={:?} max={:?}",
            self.name,
            self.count,
            self.mean(),
            self.max
        )
    }
}
