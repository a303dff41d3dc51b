//! Parallel execution harness.
//!
//! Runs one trial: precache the candidate, then let `W` workers drain a shared
//! operation budget against it while the clock and the cycle probe run.
//!
//! ## Trial timeline
//!
//! ```text
//!   precache 0..precache_size        (untimed)
//!   spawn workers, all park on a barrier
//!   ── probe.sample(), start clock ──────────────────────────────
//!   worker i:  claim batch ─► draw ─► get ─► [trace] ─► miss? set + penalty
//!              ... until the budget is empty, then absorb local counters
//!   ── join all, stop clock, probe.sample() ─────────────────────
//! ```
//!
//! Every worker owns its generator and counters; the only shared state on the
//! hot path is the candidate itself and the budget counter, claimed in
//! batches.
//!
//! ## Example Usage
//!
//! ```
//! use std::time::Duration;
//!
//! use cachesweep::candidate::MapCandidate;
//! use cachesweep::config::TrialConfig;
//! use cachesweep::distribution::DistributionKind;
//! use cachesweep::harness::{Harness, Workload};
//!
//! let trial = TrialConfig {
//!     cache_size: 1_000,
//!     precache_ratio: 1.0,
//!     distribution_factor: 1.0,
//!     miss_penalty: Duration::ZERO,
//! };
//! let cache = MapCandidate::with_capacity(trial.cache_size);
//! let outcome = Harness::new(4, 10_000)
//!     .with_seed(1)
//!     .run(&trial, Workload::ReadThrough(DistributionKind::Uniform), &cache, None);
//! assert_eq!(outcome.totals.operations, 10_000);
//! assert_eq!(outcome.totals.out_of_range, 0);
//! assert_eq!(outcome.totals.misses, 0);
//! ```

use std::panic;
use std::sync::Barrier;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::alloc::{CycleProbe, NoProbe};
use crate::config::TrialConfig;
use crate::distribution::{DistributionKind, KeyDistribution, wall_clock_seed, worker_seed};
use crate::key;
use crate::metrics::{TrialMetrics, WorkerMetrics};
use crate::trace::{TraceLogger, TraceSender};
use crate::traits::CandidateCache;

/// Operations a worker claims from the shared budget at a time.
pub const BATCH: u64 = 64;

/// Access pattern driven through the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Workload {
    /// Draw from a distribution, read, insert on miss.
    ReadThrough(DistributionKind),
    /// Single worker writing `i % cache_size`.
    Set,
    /// Single worker reading `i % cache_size` from a precached candidate.
    Get,
    /// All workers writing worker-private keys.
    SetParallel,
    /// All workers reading `counter % cache_size` from a precached candidate.
    GetParallel,
}

impl Workload {
    /// Suffix used in benchmark identifiers, e.g. `ZipfParallel`.
    pub fn label(&self) -> String {
        match self {
            Workload::ReadThrough(kind) => format!("{}Parallel", kind.label()),
            Workload::Set => "Set".to_string(),
            Workload::Get => "Get".to_string(),
            Workload::SetParallel => "SetParallel".to_string(),
            Workload::GetParallel => "GetParallel".to_string(),
        }
    }

    /// Whether draws depend on the domain factor.
    pub fn uses_distribution(&self) -> bool {
        matches!(self, Workload::ReadThrough(_))
    }

    fn precaches(&self) -> bool {
        !matches!(self, Workload::Set | Workload::SetParallel)
    }

    fn is_serial(&self) -> bool {
        matches!(self, Workload::Set | Workload::Get)
    }
}

/// Result of one trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialOutcome {
    /// Merged counters of every worker.
    pub totals: WorkerMetrics,
    /// Each worker's final counters, in worker order.
    pub workers: Vec<WorkerMetrics>,
    /// Wall time of the concurrent region only.
    pub elapsed: Duration,
    /// Probe delta across the concurrent region.
    pub gc: u64,
}

/// Shared operation budget.
#[derive(Debug)]
struct OpBudget {
    remaining: AtomicU64,
}

impl OpBudget {
    fn new(operations: u64) -> Self {
        Self {
            remaining: AtomicU64::new(operations),
        }
    }

    /// Takes up to `batch` operations; 0 means the budget is spent.
    fn claim(&self, batch: u64) -> u64 {
        match self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| {
                (left > 0).then(|| left - left.min(batch))
            }) {
            Ok(left) => left.min(batch),
            Err(_) => 0,
        }
    }
}

/// Runs trials with a fixed worker count and operation budget.
#[derive(Clone, Copy)]
pub struct Harness {
    workers: usize,
    operations: u64,
    seed: Option<u64>,
    probe: &'static dyn CycleProbe,
}

impl std::fmt::Debug for Harness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness")
            .field("workers", &self.workers)
            .field("operations", &self.operations)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

impl Harness {
    /// `workers` is clamped to at least 1.
    pub fn new(workers: usize, operations: u64) -> Self {
        Self {
            workers: workers.max(1),
            operations,
            seed: None,
            probe: &NoProbe,
        }
    }

    /// Fixes the run seed; worker seeds are derived from it.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_optional_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Samples `probe` around the timed region.
    pub fn with_probe(mut self, probe: &'static dyn CycleProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn operations(&self) -> u64 {
        self.operations
    }

    /// Runs one trial of `workload` against `cache`.
    ///
    /// `cache` should be fresh; the harness precaches it itself. When `trace`
    /// is given, every draw is recorded; the caller finishes the logger.
    pub fn run<C>(
        &self,
        trial: &TrialConfig,
        workload: Workload,
        cache: &C,
        trace: Option<&TraceLogger>,
    ) -> TrialOutcome
    where
        C: CandidateCache + ?Sized,
    {
        let precache_size = trial.precache_size();
        if workload.precaches() {
            for i in 0..precache_size {
                cache.set(i);
            }
        }

        let workers = if workload.is_serial() { 1 } else { self.workers };
        let base_seed = self.seed.unwrap_or_else(wall_clock_seed);
        let budget = OpBudget::new(self.operations);
        let metrics = TrialMetrics::new();
        let barrier = Barrier::new(workers + 1);

        debug!(
            cache_size = trial.cache_size,
            precache_size,
            workers,
            operations = self.operations,
            workload = %workload.label(),
            "trial starting"
        );

        let (per_worker, elapsed, gc) = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|id| {
                    let ctx = WorkerContext {
                        id,
                        seed: worker_seed(base_seed, id),
                        trial,
                        precache_size,
                        budget: &budget,
                        trace: trace.and_then(TraceLogger::sender),
                    };
                    let barrier = &barrier;
                    let metrics = &metrics;
                    scope.spawn(move || {
                        barrier.wait();
                        let local = ctx.run(workload, cache);
                        metrics.absorb(&local);
                        local
                    })
                })
                .collect();

            let before = self.probe.sample();
            let start = Instant::now();
            barrier.wait();
            let per_worker: Vec<WorkerMetrics> = handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|payload| panic::resume_unwind(payload)))
                .collect();
            let elapsed = start.elapsed();
            let gc = self.probe.sample().saturating_sub(before);
            (per_worker, elapsed, gc)
        });

        let totals = metrics.totals();
        debug!(
            misses = totals.misses,
            out_of_range = totals.out_of_range,
            elapsed_ms = elapsed.as_millis() as u64,
            gc,
            "trial finished"
        );
        TrialOutcome {
            totals,
            workers: per_worker,
            elapsed,
            gc,
        }
    }
}

struct WorkerContext<'a> {
    id: usize,
    seed: u64,
    trial: &'a TrialConfig,
    precache_size: u64,
    budget: &'a OpBudget,
    trace: Option<TraceSender>,
}

impl WorkerContext<'_> {
    fn run<C>(self, workload: Workload, cache: &C) -> WorkerMetrics
    where
        C: CandidateCache + ?Sized,
    {
        match workload {
            Workload::ReadThrough(kind) => self.read_through(kind, cache),
            Workload::Set | Workload::SetParallel => self.write_cycle(workload, cache),
            Workload::Get | Workload::GetParallel => self.read_cycle(cache),
        }
    }

    fn read_through<C>(&self, kind: DistributionKind, cache: &C) -> WorkerMetrics
    where
        C: CandidateCache + ?Sized,
    {
        let mut dist = kind.build(self.trial.domain(), self.seed);
        let penalty = self.trial.miss_penalty;
        let mut local = WorkerMetrics::default();
        loop {
            let claimed = self.budget.claim(BATCH);
            if claimed == 0 {
                break;
            }
            for _ in 0..claimed {
                let v = dist.next_u64();
                local.operations += 1;
                if v >= self.precache_size {
                    local.out_of_range += 1;
                }
                let missed = cache.get(v);
                if let Some(trace) = &self.trace {
                    trace.record(v, missed);
                }
                if missed {
                    cache.set(v);
                    local.misses += 1;
                    if !penalty.is_zero() {
                        thread::sleep(penalty);
                    }
                }
            }
        }
        local
    }

    fn read_cycle<C>(&self, cache: &C) -> WorkerMetrics
    where
        C: CandidateCache + ?Sized,
    {
        let size = self.trial.cache_size.max(1) as u64;
        let mut counter = 0u64;
        let mut local = WorkerMetrics::default();
        loop {
            let claimed = self.budget.claim(BATCH);
            if claimed == 0 {
                break;
            }
            for _ in 0..claimed {
                let v = counter % size;
                counter += 1;
                local.operations += 1;
                if v >= self.precache_size {
                    local.out_of_range += 1;
                }
                let missed = cache.get(v);
                if let Some(trace) = &self.trace {
                    trace.record(v, missed);
                }
                if missed {
                    local.misses += 1;
                }
            }
        }
        local
    }

    fn write_cycle<C>(&self, workload: Workload, cache: &C) -> WorkerMetrics
    where
        C: CandidateCache + ?Sized,
    {
        let size = self.trial.cache_size.max(1) as u64;
        let parallel = workload == Workload::SetParallel;
        let mut counter = 0u64;
        let mut local = WorkerMetrics::default();
        loop {
            let claimed = self.budget.claim(BATCH);
            if claimed == 0 {
                break;
            }
            for _ in 0..claimed {
                let v = counter % size;
                counter += 1;
                local.operations += 1;
                if parallel {
                    cache.set_key(key::encode_parallel(self.id as u64, v).as_str());
                } else {
                    cache.set(v);
                }
            }
        }
        local
    }
}
