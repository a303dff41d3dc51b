//! Sweep orchestration.
//!
//! Expands a [`HarnessConfig`] into the cross product of cache sizes and
//! domain factors, names each trial, and runs them one after another against a
//! freshly built candidate.
//!
//! ## Trial names
//!
//! Without a sweep a trial is named by its cache size (`1000000`). With a
//! sweep the factor is appended with a fixed-point layout shared by every
//! trial of the run, so names sort lexically:
//!
//! ```text
//!   factors  [0.99, 1, 1.5, 2]      ─► pass 1: int digits 1, frac digits 2
//!   names    1000000-0.99  1000000-1.00  1000000-1.50  1000000-2.00
//! ```
//!
//! ## Failure policy
//!
//! A candidate that cannot be built fails that trial only. A trace file that
//! cannot be created, or a trace drain that fails, aborts the run.

use tracing::{info, warn};

use crate::alloc::CycleProbe;
use crate::config::{BASE_SIZE, HarnessConfig, MULTI_SIZES, TrialConfig};
use crate::error::{BenchError, ConfigError};
use crate::harness::{Harness, Workload};
use crate::report::TrialReport;
use crate::trace::TraceLogger;
use crate::traits::CandidateCache;

/// Cache sizes of a run, largest first when the multi-size ladder is on.
pub fn cache_sizes(config: &HarnessConfig) -> Vec<usize> {
    let scale = |base: usize| ((base as f64 * config.size_factor).round() as usize).max(1);
    if config.multi_size {
        MULTI_SIZES.iter().copied().map(scale).collect()
    } else {
        vec![scale(BASE_SIZE)]
    }
}

/// Domain factors a distribution workload runs at.
pub fn factors(config: &HarnessConfig) -> Vec<f64> {
    match &config.sweep_factors {
        Some(list) if !list.is_empty() => list.clone(),
        _ => vec![config.domain_factor],
    }
}

/// Renders trial names with one fixed-point layout for every factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialNamer {
    sweep: bool,
    int_digits: usize,
    frac_digits: usize,
}

impl TrialNamer {
    /// First pass: measure the widest integer part and the deepest decimal
    /// across `factors`.
    pub fn new(factors: &[f64], sweep: bool) -> Self {
        let max = factors.iter().copied().fold(0.0_f64, f64::max);
        let int_digits = digit_count(max.round() as u64);
        let frac_digits = factors.iter().map(|f| decimals(*f)).max().unwrap_or(0);
        Self {
            sweep,
            int_digits,
            frac_digits,
        }
    }

    /// Second pass: `size` alone, or `size-factor` when sweeping.
    pub fn name(&self, cache_size: usize, factor: f64) -> String {
        if !self.sweep {
            return cache_size.to_string();
        }
        format!("{cache_size}-{}", self.factor_label(factor))
    }

    /// The factor in the shared layout.
    pub fn factor_label(&self, factor: f64) -> String {
        let width = if self.frac_digits == 0 {
            self.int_digits
        } else {
            self.int_digits + 1 + self.frac_digits
        };
        format!("{factor:0width$.prec$}", prec = self.frac_digits)
    }
}

fn digit_count(mut n: u64) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

/// Decimal places in the shortest representation of `f`.
fn decimals(f: f64) -> usize {
    let text = f.to_string();
    match text.split_once('.') {
        Some((_, frac)) => frac.trim_end_matches('0').len(),
        None => 0,
    }
}

/// One planned trial.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialPlan {
    pub name: String,
    pub config: TrialConfig,
}

/// Outcome of one planned trial.
#[derive(Debug)]
pub struct TrialRecord {
    pub name: String,
    pub result: Result<TrialReport, BenchError>,
}

/// Runs every planned trial of a workload.
#[derive(Debug)]
pub struct Sweep<'a> {
    config: &'a HarnessConfig,
    harness: Harness,
}

impl<'a> Sweep<'a> {
    pub fn new(config: &'a HarnessConfig) -> Self {
        let harness = Harness::new(config.workers, config.operations)
            .with_optional_seed(config.seed);
        Self { config, harness }
    }

    pub fn with_probe(mut self, probe: &'static dyn CycleProbe) -> Self {
        self.harness = self.harness.with_probe(probe);
        self
    }

    pub fn harness(&self) -> &Harness {
        &self.harness
    }

    /// Trials for `workload`, size-major then factor. Workloads that ignore the
    /// distribution get one trial per size.
    pub fn plan(&self, workload: Workload) -> Vec<TrialPlan> {
        let (factors, sweep) = if workload.uses_distribution() {
            (factors(self.config), self.config.is_sweep())
        } else {
            (vec![self.config.domain_factor], false)
        };
        let namer = TrialNamer::new(&factors, sweep);

        cache_sizes(self.config)
            .into_iter()
            .flat_map(|cache_size| {
                factors.iter().map(move |&factor| (cache_size, factor))
            })
            .map(|(cache_size, factor)| TrialPlan {
                name: namer.name(cache_size, factor),
                config: TrialConfig {
                    cache_size,
                    precache_ratio: self.config.precache_ratio,
                    distribution_factor: factor,
                    miss_penalty: self.config.miss_penalty,
                },
            })
            .collect()
    }

    /// Path of the trace file for one trial, when tracing is on.
    pub fn trace_path(&self, benchmark: &str, trial: &str) -> Option<String> {
        self.config
            .trace_prefix
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(|prefix| format!("{prefix}{benchmark}{trial}"))
    }

    /// Runs every trial of `workload`, building a fresh candidate per trial.
    ///
    /// Returns `Err` only for run-fatal errors; per-trial failures are kept in
    /// the returned records.
    pub fn run<C, F>(
        &self,
        benchmark: &str,
        workload: Workload,
        mut make_candidate: F,
    ) -> Result<Vec<TrialRecord>, BenchError>
    where
        C: CandidateCache,
        F: FnMut(usize) -> Result<C, ConfigError>,
    {
        let plans = self.plan(workload);
        let mut records = Vec::with_capacity(plans.len());

        for plan in plans {
            let cache = match make_candidate(plan.config.cache_size) {
                Ok(cache) => cache,
                Err(err) => {
                    warn!(benchmark, trial = %plan.name, error = %err, "candidate construction failed");
                    records.push(TrialRecord {
                        name: plan.name,
                        result: Err(BenchError::Config(err)),
                    });
                    continue;
                },
            };

            let trace = match self.trace_path(benchmark, &plan.name) {
                Some(path) => Some(TraceLogger::create(path, self.config.trace_capacity)?),
                None => None,
            };

            info!(benchmark, trial = %plan.name, "running trial");
            let outcome = self
                .harness
                .run(&plan.config, workload, &cache, trace.as_ref());
            drop(cache);

            if let Some(trace) = trace {
                trace.finish()?;
            }

            let report = TrialReport::new(benchmark, &plan.name, &outcome);
            info!(
                benchmark,
                trial = %plan.name,
                ns_per_op = report.ns_per_op(),
                misses = report.misses,
                "trial complete"
            );
            records.push(TrialRecord {
                name: plan.name,
                result: Ok(report),
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::MapCandidate;
    use crate::distribution::DistributionKind;

    fn config() -> HarnessConfig {
        HarnessConfig {
            size_factor: 0.001,
            workers: 2,
            operations: 2_000,
            seed: Some(9),
            ..HarnessConfig::default()
        }
    }

    #[test]
    fn namer_pads_to_shared_layout() {
        let factors = [0.99, 1.0, 1.01, 1.05, 1.1, 1.5, 2.0];
        let namer = TrialNamer::new(&factors, true);
        let names: Vec<_> = factors.iter().map(|f| namer.name(1000, *f)).collect();
        assert_eq!(
            names,
            [
                "1000-0.99", "1000-1.00", "1000-1.01", "1000-1.05", "1000-1.10", "1000-1.50",
                "1000-2.00",
            ]
        );
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(sorted, names);
    }

    #[test]
    fn namer_widens_integer_part() {
        let namer = TrialNamer::new(&[0.5, 12.0], true);
        assert_eq!(namer.name(10, 0.5), "10-00.5");
        assert_eq!(namer.name(10, 12.0), "10-12.0");

        let whole = TrialNamer::new(&[1.0, 2.0], true);
        assert_eq!(whole.name(7, 2.0), "7-2");
    }

    #[test]
    fn namer_without_sweep_is_plain_size() {
        let namer = TrialNamer::new(&[2.0], false);
        assert_eq!(namer.name(1_000_000, 2.0), "1000000");
    }

    #[test]
    fn multi_size_ladder_scales() {
        let config = HarnessConfig {
            multi_size: true,
            size_factor: 0.01,
            ..HarnessConfig::default()
        };
        assert_eq!(cache_sizes(&config), vec![100_000, 10_000, 1_000]);
        assert_eq!(cache_sizes(&HarnessConfig::default()), vec![BASE_SIZE]);
    }

    #[test]
    fn plan_is_size_major() {
        let config = HarnessConfig {
            multi_size: true,
            size_factor: 0.001,
            sweep_factors: Some(vec![1.0, 1.5]),
            ..config()
        };
        let sweep = Sweep::new(&config);
        let names: Vec<_> = sweep
            .plan(Workload::ReadThrough(DistributionKind::Uniform))
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(
            names,
            ["10000-1.0", "10000-1.5", "1000-1.0", "1000-1.5", "100-1.0", "100-1.5"]
        );

        // Fixed-pattern workloads ignore the factor list.
        assert_eq!(sweep.plan(Workload::GetParallel).len(), 3);
    }

    #[test]
    fn failed_candidate_fails_only_its_trial() {
        let config = HarnessConfig {
            sweep_factors: Some(vec![1.0, 2.0]),
            ..config()
        };
        let sweep = Sweep::new(&config);
        let mut calls = 0;
        let records = sweep
            .run("MapZipfParallel", Workload::ReadThrough(DistributionKind::default()), |size| {
                calls += 1;
                if calls == 1 {
                    Err(ConfigError::new("boom"))
                } else {
                    Ok(MapCandidate::with_capacity(size))
                }
            })
            .unwrap();
        assert_eq!(records.len(), 2);
        assert!(matches!(records[0].result, Err(BenchError::Config(_))));
        let report = records[1].result.as_ref().unwrap();
        assert_eq!(report.trial, "1000-2.0");
        assert_eq!(report.operations, 2_000);
    }

    #[test]
    fn trace_path_concatenates() {
        let config = HarnessConfig {
            trace_prefix: Some("/tmp/t-".into()),
            ..config()
        };
        let sweep = Sweep::new(&config);
        assert_eq!(
            sweep.trace_path("MapGet", "1000").as_deref(),
            Some("/tmp/t-MapGet1000")
        );
        assert_eq!(Sweep::new(&HarnessConfig::default()).trace_path("a", "b"), None);
    }
}
