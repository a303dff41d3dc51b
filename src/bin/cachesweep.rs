//! Command-line driver.
//!
//! Resolves [`HarnessConfig`] from the environment, applies command-line
//! overrides, then runs every selected workload against every selected
//! candidate. Report lines go to stdout, logs to stderr.
//!
//! ```text
//! ZIPF_FACTOR=1.5 SWEEP=1 cachesweep --candidates sharded,half --workload zipf
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use cachesweep::alloc::CountingAllocator;
use cachesweep::candidate::CandidateKind;
use cachesweep::config::HarnessConfig;
use cachesweep::distribution::DistributionKind;
use cachesweep::harness::Workload;
use cachesweep::report::RunArtifact;
use cachesweep::sweep::Sweep;
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[global_allocator]
static ALLOC: CountingAllocator = CountingAllocator::new();

#[derive(Parser, Debug)]
#[command(name = "cachesweep", about = "Concurrent cache benchmark sweeps")]
struct Args {
    /// Candidates to run (map, sharded, half)
    #[arg(long, value_delimiter = ',', default_value = "map,sharded,half")]
    candidates: Vec<CandidateKind>,

    /// Workloads to run
    #[arg(long, value_enum, value_delimiter = ',', default_value = "zipf")]
    workload: Vec<WorkloadArg>,

    /// Draws per trial, overrides BENCH_OPERATIONS
    #[arg(long)]
    operations: Option<u64>,

    /// Parallel workers, overrides BENCH_WORKERS
    #[arg(long)]
    workers: Option<usize>,

    /// Generator seed, overrides BENCH_SEED
    #[arg(long)]
    seed: Option<u64>,

    /// Write a JSON artifact of the run
    #[arg(long)]
    json: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum WorkloadArg {
    Set,
    Get,
    SetParallel,
    GetParallel,
    Zipf,
    Uniform,
}

impl WorkloadArg {
    fn resolve(self, config: &HarnessConfig) -> Workload {
        match self {
            WorkloadArg::Set => Workload::Set,
            WorkloadArg::Get => Workload::Get,
            WorkloadArg::SetParallel => Workload::SetParallel,
            WorkloadArg::GetParallel => Workload::GetParallel,
            WorkloadArg::Zipf => {
                Workload::ReadThrough(DistributionKind::zipf(config.zipf_s, config.zipf_v))
            },
            WorkloadArg::Uniform => Workload::ReadThrough(DistributionKind::Uniform),
        }
    }
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = HarnessConfig::from_env();
    if let Some(operations) = args.operations.filter(|n| *n > 0) {
        config.operations = operations;
    }
    if let Some(workers) = args.workers.filter(|n| *n > 0) {
        config.workers = workers;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    info!(
        workers = config.workers,
        operations = config.operations,
        sweep = config.is_sweep(),
        seed = ?config.seed,
        "configuration resolved"
    );

    let sweep = Sweep::new(&config).with_probe(&ALLOC);
    let mut artifact = RunArtifact::new(config.clone());
    let mut failed = 0usize;

    for arg in &args.workload {
        let workload = arg.resolve(&config);
        for kind in &args.candidates {
            let benchmark = format!("{}{}", kind.display_name(), workload.label());
            let records = sweep
                .run(&benchmark, workload, |size| kind.build(size))
                .with_context(|| format!("{benchmark} aborted"))?;
            for record in records {
                match record.result {
                    Ok(report) => {
                        println!("{report}");
                        artifact.push(report);
                    },
                    Err(err) => {
                        println!("--- FAIL: {benchmark}/{}: {err}", record.name);
                        artifact.push_failure(&benchmark, &record.name, &err);
                        failed += 1;
                    },
                }
            }
        }
    }

    if let Some(path) = &args.json {
        artifact
            .write_json(path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), results = artifact.results.len(), "artifact written");
    }

    if failed > 0 {
        warn!(failed, "some trials failed");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
