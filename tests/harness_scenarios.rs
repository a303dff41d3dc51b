// ==============================================
// HARNESS SCENARIO TESTS (integration)
// ==============================================
//
// End-to-end trials through the public harness API: precache boundary,
// out-of-range accounting, miss counting and aggregation across workers.

use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use cachesweep::candidate::{CandidateKind, MapCandidate, ShardedFifoCandidate};
use cachesweep::config::TrialConfig;
use cachesweep::distribution::DistributionKind;
use cachesweep::harness::{Harness, Workload};
use cachesweep::metrics::WorkerMetrics;
use cachesweep::trace::TraceLogger;
use cachesweep::traits::CandidateCache;
use parking_lot::Mutex;

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuf {
    fn events(&self) -> Vec<(u64, bool)> {
        let text = String::from_utf8(self.0.lock().clone()).unwrap();
        text.lines()
            .map(|line| {
                let (key, missed) = line.split_once(',').unwrap();
                (key.parse().unwrap(), missed.parse().unwrap())
            })
            .collect()
    }
}

fn trial(cache_size: usize, factor: f64) -> TrialConfig {
    TrialConfig {
        cache_size,
        precache_ratio: 1.0,
        distribution_factor: factor,
        miss_penalty: Duration::ZERO,
    }
}

// ==============================================
// Precache Boundary
// ==============================================

mod precache_boundary {
    use super::*;

    #[test]
    fn domain_equal_to_precache_never_misses() {
        let trial = trial(1000, 1.0);
        let cache = MapCandidate::with_capacity(1000);
        let outcome = Harness::new(4, 50_000).with_seed(17).run(
            &trial,
            Workload::ReadThrough(DistributionKind::Uniform),
            &cache,
            None,
        );
        assert_eq!(outcome.totals.operations, 50_000);
        assert_eq!(outcome.totals.out_of_range, 0);
        assert_eq!(outcome.totals.misses, 0);
    }

    #[test]
    fn zipf_within_precache_never_misses_on_unbounded_map() {
        let trial = trial(500, 1.0);
        let cache = MapCandidate::with_capacity(500);
        let outcome = Harness::new(4, 20_000).with_seed(2).run(
            &trial,
            Workload::ReadThrough(DistributionKind::default()),
            &cache,
            None,
        );
        assert_eq!(outcome.totals.out_of_range, 0);
        assert_eq!(outcome.totals.misses, 0);
    }

    #[test]
    fn zero_precache_misses_every_first_touch() {
        let trial = TrialConfig {
            precache_ratio: 0.0,
            ..trial(50, 1.0)
        };
        let cache = MapCandidate::with_capacity(50);
        let outcome =
            Harness::new(1, 200).run(&trial, Workload::GetParallel, &cache, None);
        // Get-style reads do not insert, so every read misses.
        assert_eq!(outcome.totals.misses, 200);
        assert_eq!(outcome.totals.out_of_range, 200);
    }
}

// ==============================================
// Out-Of-Range Accounting Against The Trace
// ==============================================
//
// One worker over a never-evicting map: each out-of-range key misses on its
// first draw only, so misses equal the number of distinct out-of-range keys.

mod out_of_range {
    use super::*;

    #[test]
    fn counters_match_traced_draws() {
        let trial = trial(100, 2.0);
        let cache = MapCandidate::with_capacity(100);
        let buf = SharedBuf::default();
        let logger = TraceLogger::from_writer(buf.clone(), 64);

        let outcome = Harness::new(1, 5_000).with_seed(4).run(
            &trial,
            Workload::ReadThrough(DistributionKind::Uniform),
            &cache,
            Some(&logger),
        );
        assert_eq!(logger.finish().unwrap(), 5_000);

        let events = buf.events();
        assert_eq!(events.len(), 5_000);
        assert!(events.iter().all(|(k, _)| *k < 200));

        let beyond: Vec<u64> = events.iter().map(|(k, _)| *k).filter(|k| *k >= 100).collect();
        let distinct: HashSet<u64> = beyond.iter().copied().collect();
        assert_eq!(outcome.totals.out_of_range, beyond.len() as u64);
        assert_eq!(outcome.totals.misses, distinct.len() as u64);

        let traced_misses = events.iter().filter(|(_, missed)| *missed).count();
        assert_eq!(traced_misses as u64, outcome.totals.misses);
        assert_eq!(cache.len(), 100 + distinct.len());
    }

    #[test]
    fn same_seed_reproduces_counters() {
        let run = || {
            let cache = MapCandidate::with_capacity(100);
            Harness::new(1, 3_000)
                .with_seed(77)
                .run(
                    &trial(100, 3.0),
                    Workload::ReadThrough(DistributionKind::default()),
                    &cache,
                    None,
                )
                .totals
        };
        assert_eq!(run(), run());
    }
}

// ==============================================
// Aggregation Across Workers
// ==============================================

mod aggregation {
    use super::*;

    #[test]
    fn totals_equal_sum_of_workers_for_every_candidate() {
        for kind in CandidateKind::ALL {
            let cache = kind.build(1_000).unwrap();
            let outcome = Harness::new(8, 40_000).with_seed(1).run(
                &trial(1_000, 2.0),
                Workload::ReadThrough(DistributionKind::default()),
                &cache,
                None,
            );
            let summed: WorkerMetrics = outcome.workers.iter().copied().sum();
            assert_eq!(outcome.totals, summed, "{kind}");
            assert_eq!(outcome.totals.operations, 40_000, "{kind}");
            assert!(outcome.totals.misses <= outcome.totals.operations);
        }
    }

    #[test]
    fn half_capacity_misses_more_than_full() {
        let run = |cache: &dyn CandidateCache| {
            Harness::new(4, 100_000)
                .with_seed(8)
                .run(
                    &trial(2_000, 1.0),
                    Workload::ReadThrough(DistributionKind::Uniform),
                    cache,
                    None,
                )
                .totals
                .misses
        };
        let full = ShardedFifoCandidate::try_new(2_000, 16).unwrap();
        let half = ShardedFifoCandidate::try_new(1_000, 16).unwrap();
        let full_misses = run(&full);
        let half_misses = run(&half);
        assert!(half_misses > full_misses);
        assert!(half.evictions() > 0);
    }

    #[test]
    fn every_worker_participates_under_contention() {
        let cache = ShardedFifoCandidate::try_new(1_000, 64).unwrap();
        let outcome = Harness::new(4, 400_000).with_seed(3).run(
            &trial(1_000, 1.5),
            Workload::ReadThrough(DistributionKind::Uniform),
            &cache,
            None,
        );
        assert_eq!(outcome.workers.len(), 4);
        assert!(outcome.workers.iter().all(|w| w.operations > 0));
    }
}
