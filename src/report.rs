//! Trial reports and the JSON run artifact.
//!
//! Every finished trial becomes a [`TrialReport`], printed as one line in the
//! familiar Go benchmark layout:
//!
//! ```text
//! ShardedZipfParallel/1000000-1.05	1000000	182.40 ns/op	48213 misses	31877 expc	96416 gc
//! ```
//!
//! A run can additionally be saved as a [`RunArtifact`] (JSON) carrying the
//! resolved configuration, a timestamp, every report and every failed trial.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use crate::config::HarnessConfig;
use crate::harness::TrialOutcome;
use crate::metrics::{GC, MISSES, OUT_OF_RANGE};

/// Version of the JSON artifact layout.
pub const SCHEMA_VERSION: u32 = 1;

pub fn duration_to_nanos(d: Duration) -> u64 {
    d.as_nanos().min(u64::MAX as u128) as u64
}

/// One row of results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialReport {
    pub benchmark: String,
    pub trial: String,
    pub operations: u64,
    pub elapsed_ns: u64,
    pub misses: u64,
    pub out_of_range: u64,
    pub gc: u64,
    pub workers: usize,
}

impl TrialReport {
    pub fn new(benchmark: &str, trial: &str, outcome: &TrialOutcome) -> Self {
        Self {
            benchmark: benchmark.to_string(),
            trial: trial.to_string(),
            operations: outcome.totals.operations,
            elapsed_ns: duration_to_nanos(outcome.elapsed),
            misses: outcome.totals.misses,
            out_of_range: outcome.totals.out_of_range,
            gc: outcome.gc,
            workers: outcome.workers.len(),
        }
    }

    /// `benchmark/trial`, as printed.
    pub fn id(&self) -> String {
        format!("{}/{}", self.benchmark, self.trial)
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_ns)
    }

    pub fn ns_per_op(&self) -> f64 {
        if self.operations == 0 {
            0.0
        } else {
            self.elapsed_ns as f64 / self.operations as f64
        }
    }

    pub fn miss_rate(&self) -> f64 {
        if self.operations == 0 {
            0.0
        } else {
            self.misses as f64 / self.operations as f64
        }
    }
}

impl fmt::Display for TrialReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}\t{}\t{:.2} ns/op\t{} {MISSES}\t{} {OUT_OF_RANGE}\t{} {GC}",
            self.benchmark,
            self.trial,
            self.operations,
            self.ns_per_op(),
            self.misses,
            self.out_of_range,
            self.gc,
        )
    }
}

/// A trial that produced no report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedTrial {
    pub benchmark: String,
    pub trial: String,
    pub error: String,
}

/// Everything recorded about one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RunArtifact {
    pub schema_version: u32,
    /// RFC 3339, taken when the artifact is created.
    pub timestamp: String,
    pub config: HarnessConfig,
    pub results: Vec<TrialReport>,
    pub failures: Vec<FailedTrial>,
}

impl RunArtifact {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            timestamp: Utc::now().to_rfc3339(),
            config,
            results: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn push(&mut self, report: TrialReport) {
        self.results.push(report);
    }

    pub fn push_failure(&mut self, benchmark: &str, trial: &str, error: impl fmt::Display) {
        self.failures.push(FailedTrial {
            benchmark: benchmark.to_string(),
            trial: trial.to_string(),
            error: error.to_string(),
        });
    }

    /// Writes the artifact as pretty-printed JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut out, self)?;
        out.write_all(b"\n")?;
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::WorkerMetrics;

    fn outcome() -> TrialOutcome {
        let worker = WorkerMetrics {
            misses: 10,
            out_of_range: 4,
            operations: 500,
        };
        TrialOutcome {
            totals: worker + worker,
            workers: vec![worker, worker],
            elapsed: Duration::from_micros(250),
            gc: 3,
        }
    }

    #[test]
    fn line_uses_bench_layout() {
        let report = TrialReport::new("MapZipfParallel", "1000-1.50", &outcome());
        assert_eq!(report.ns_per_op(), 250.0);
        assert_eq!(
            report.to_string(),
            "MapZipfParallel/1000-1.50\t1000\t250.00 ns/op\t20 misses\t8 expc\t3 gc"
        );
        assert_eq!(report.workers, 2);
    }

    #[test]
    fn zero_operations_report_zero_rates() {
        let mut out = outcome();
        out.totals = WorkerMetrics::default();
        let report = TrialReport::new("Set", "10", &out);
        assert_eq!(report.ns_per_op(), 0.0);
        assert_eq!(report.miss_rate(), 0.0);
    }

    #[test]
    fn artifact_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let mut artifact = RunArtifact::new(HarnessConfig::default());
        artifact.push(TrialReport::new("HalfGet", "1000", &outcome()));
        artifact.push_failure("HalfGet", "0", "capacity must be greater than zero");
        artifact.write_json(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["schema_version"], 1);
        assert_eq!(json["results"][0]["trial"], "1000");
        assert_eq!(json["results"][0]["misses"], 20);
        assert_eq!(json["failures"][0]["trial"], "0");
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }
}
