//! Atomic counters for memory-logger observability.
//!
//! All counters use relaxed ordering; they are diagnostic only.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-logger emission counters.
#[derive(Debug, Default)]
pub struct MemlogMetrics {
    /// Lines written to the destination.
    pub lines_emitted: AtomicU64,
    /// Bytes written to the destination.
    pub bytes_emitted: AtomicU64,
    /// Increment checks that decided not to log.
    pub increments_suppressed: AtomicU64,
    /// Lines below the configured verbosity.
    pub lines_filtered: AtomicU64,
    /// Lines lost to an unavailable or failing destination.
    pub lines_dropped: AtomicU64,
}

impl MemlogMetrics {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lines_emitted: AtomicU64::new(0),
            bytes_emitted: AtomicU64::new(0),
            increments_suppressed: AtomicU64::new(0),
            lines_filtered: AtomicU64::new(0),
            lines_dropped: AtomicU64::new(0),
        }
    }

    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn snapshot(&self) -> MemlogSnapshot {
        MemlogSnapshot {
            lines_emitted: Self::get(&self.lines_emitted),
            bytes_emitted: Self::get(&self.bytes_emitted),
            increments_suppressed: Self::get(&self.increments_suppressed),
            lines_filtered: Self::get(&self.lines_filtered),
            lines_dropped: Self::get(&self.lines_dropped),
        }
    }
}

/// Point-in-time copy of [`MemlogMetrics`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemlogSnapshot {
    pub lines_emitted: u64,
    pub bytes_emitted: u64,
    pub increments_suppressed: u64,
    pub lines_filtered: u64,
    pub lines_dropped: u64,
}
