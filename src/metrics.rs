//! Per-worker counters and their trial-level aggregate.
//!
//! Workers count into a private [`WorkerMetrics`] with plain arithmetic and
//! merge exactly once, on exit, into the shared [`TrialMetrics`]. The merge is
//! an atomic add per counter, so the totals equal the sum over workers no
//! matter how the merges interleave.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::utils::CachePadded;
use serde::Serialize;

/// Reported name of the miss counter.
pub const MISSES: &str = "misses";
/// Reported name of the out-of-range counter.
pub const OUT_OF_RANGE: &str = "expc";
/// Reported name of the collection-cycle delta.
pub const GC: &str = "gc";

/// Counters owned by one worker during its run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerMetrics {
    /// Draws that missed in the candidate.
    pub misses: u64,
    /// Draws at or beyond the precached population.
    pub out_of_range: u64,
    /// Operations executed.
    pub operations: u64,
}

impl WorkerMetrics {
    /// Fraction of operations that missed.
    pub fn miss_rate(&self) -> f64 {
        if self.operations == 0 {
            0.0
        } else {
            self.misses as f64 / self.operations as f64
        }
    }
}

impl std::ops::Add for WorkerMetrics {
    type Output = WorkerMetrics;

    fn add(self, rhs: WorkerMetrics) -> WorkerMetrics {
        WorkerMetrics {
            misses: self.misses + rhs.misses,
            out_of_range: self.out_of_range + rhs.out_of_range,
            operations: self.operations + rhs.operations,
        }
    }
}

impl std::iter::Sum for WorkerMetrics {
    fn sum<I: Iterator<Item = WorkerMetrics>>(iter: I) -> Self {
        iter.fold(WorkerMetrics::default(), |acc, m| acc + m)
    }
}

/// Trial-wide totals, only ever mutated by [`absorb`](Self::absorb).
#[derive(Debug, Default)]
pub struct TrialMetrics {
    misses: CachePadded<AtomicU64>,
    out_of_range: CachePadded<AtomicU64>,
    operations: CachePadded<AtomicU64>,
}

impl TrialMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a finished worker's counters.
    pub fn absorb(&self, worker: &WorkerMetrics) {
        self.misses.fetch_add(worker.misses, Ordering::Relaxed);
        self.out_of_range.fetch_add(worker.out_of_range, Ordering::Relaxed);
        self.operations.fetch_add(worker.operations, Ordering::Relaxed);
    }

    /// Current totals. Exact once every worker has been joined.
    pub fn totals(&self) -> WorkerMetrics {
        WorkerMetrics {
            misses: self.misses.load(Ordering::Relaxed),
            out_of_range: self.out_of_range.load(Ordering::Relaxed),
            operations: self.operations.load(Ordering::Relaxed),
        }
    }
}
