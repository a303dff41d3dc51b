//! Harness configuration.
//!
//! [`HarnessConfig`] is built once at startup and passed by reference to the
//! sweep; nothing else in the crate reads the environment. Every field has a
//! default, and a malformed or out-of-range value falls back to that default
//! with a warning instead of failing the run.
//!
//! ## Environment
//!
//! | Variable           | Field            | Default                          |
//! |--------------------|------------------|----------------------------------|
//! | `TEST_SIZE_FACTOR` | `size_factor`    | `1.0`                            |
//! | `TEST_MULTI_SIZE`  | `multi_size`     | `false`                          |
//! | `PRECACHE_RATIO`   | `precache_ratio` | `1.0`                            |
//! | `MISS_PENALTY`     | `miss_penalty`   | `0` (milliseconds)               |
//! | `ZIPF_S`           | `zipf_s`         | `1.01` (must be > 1)             |
//! | `ZIPF_V`           | `zipf_v`         | `1.0` (must be >= 1)             |
//! | `ZIPF_FACTOR`      | `domain_factor`  | `2.0`                            |
//! | `SWEEP`            | `sweep_factors`  | default list when truthy         |
//! | `SWEEP_FACTORS`    | `sweep_factors`  | JSON array, implies sweep        |
//! | `TRACE_LOG_PREFIX` | `trace_prefix`   | disabled                         |
//! | `BENCH_OPERATIONS` | `operations`     | `1_000_000`                      |
//! | `BENCH_WORKERS`    | `workers`        | available parallelism            |
//! | `BENCH_SEED`       | `seed`           | wall-clock                       |
//!
//! ## Example Usage
//!
//! ```
//! use cachesweep::config::HarnessConfig;
//!
//! let config = HarnessConfig::from_lookup(|name| match name {
//!     "ZIPF_S" => Some("0.5".to_string()), // invalid, falls back
//!     "SWEEP_FACTORS" => Some("[1.0, 1.5]".to_string()),
//!     _ => None,
//! });
//! assert_eq!(config.zipf_s, 1.01);
//! assert_eq!(config.sweep_factors, Some(vec![1.0, 1.5]));
//! ```

use std::str::FromStr;
use std::thread;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use crate::distribution::{DEFAULT_ZIPF_S, DEFAULT_ZIPF_V};

/// Single-size trial population before scaling.
pub const BASE_SIZE: usize = 1_000_000;
/// Three-tier ladder used when `multi_size` is set.
pub const MULTI_SIZES: [usize; 3] = [10_000_000, 1_000_000, 100_000];
pub const DEFAULT_SIZE_FACTOR: f64 = 1.0;
pub const DEFAULT_PRECACHE_RATIO: f64 = 1.0;
pub const DEFAULT_DOMAIN_FACTOR: f64 = 2.0;
pub const DEFAULT_SWEEP_FACTORS: [f64; 7] = [0.99, 1.0, 1.01, 1.05, 1.1, 1.5, 2.0];
pub const DEFAULT_OPERATIONS: u64 = 1_000_000;
pub const DEFAULT_TRACE_CAPACITY: usize = 4096;

/// Run-wide configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarnessConfig {
    /// Multiplies every base trial size.
    pub size_factor: f64,
    /// Use the 10M/1M/100K ladder instead of a single 1M size.
    pub multi_size: bool,
    /// Fraction of the cache size inserted before measurement.
    pub precache_ratio: f64,
    /// Delay charged to a worker on every miss.
    pub miss_penalty: Duration,
    /// Zipf concentration exponent.
    pub zipf_s: f64,
    /// Zipf offset.
    pub zipf_v: f64,
    /// Multiplies cache size to get the draw domain when not sweeping.
    pub domain_factor: f64,
    /// Domain factors to sweep; `None` runs `domain_factor` only.
    pub sweep_factors: Option<Vec<f64>>,
    /// Per-trial trace files are written to `<prefix><benchmark><trial>`.
    pub trace_prefix: Option<String>,
    /// Draws per trial, shared by all workers.
    pub operations: u64,
    /// Concurrent workers per parallel trial.
    pub workers: usize,
    /// Fixed generator seed; wall-clock derived when `None`.
    pub seed: Option<u64>,
    /// Depth of the bounded trace queue.
    pub trace_capacity: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            size_factor: DEFAULT_SIZE_FACTOR,
            multi_size: false,
            precache_ratio: DEFAULT_PRECACHE_RATIO,
            miss_penalty: Duration::ZERO,
            zipf_s: DEFAULT_ZIPF_S,
            zipf_v: DEFAULT_ZIPF_V,
            domain_factor: DEFAULT_DOMAIN_FACTOR,
            sweep_factors: None,
            trace_prefix: None,
            operations: DEFAULT_OPERATIONS,
            workers: default_workers(),
            seed: None,
            trace_capacity: DEFAULT_TRACE_CAPACITY,
        }
    }
}

/// Worker count matching the host's available parallelism.
pub fn default_workers() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}

impl HarnessConfig {
    /// Reads the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves configuration through `lookup`, which returns the raw value of
    /// a variable or `None` when unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let size_factor = parse_or(&get, "TEST_SIZE_FACTOR", defaults.size_factor, |v| {
            v.is_finite() && *v > 0.0
        });
        let multi_size = get("TEST_MULTI_SIZE").is_some_and(|raw| flag("TEST_MULTI_SIZE", &raw));
        let precache_ratio = parse_or(&get, "PRECACHE_RATIO", defaults.precache_ratio, |v| {
            v.is_finite() && *v >= 0.0
        });
        let penalty_ms: u64 = parse_or(&get, "MISS_PENALTY", 0, |_| true);
        let zipf_s = parse_or(&get, "ZIPF_S", defaults.zipf_s, |v| v.is_finite() && *v > 1.0);
        let zipf_v = parse_or(&get, "ZIPF_V", defaults.zipf_v, |v| v.is_finite() && *v >= 1.0);
        let domain_factor = parse_or(&get, "ZIPF_FACTOR", defaults.domain_factor, |v| {
            v.is_finite() && *v > 0.0
        });

        let sweep_factors = match get("SWEEP_FACTORS") {
            Some(raw) => Some(parse_factor_list(&raw)),
            None if get("SWEEP").is_some_and(|raw| flag("SWEEP", &raw)) => {
                Some(DEFAULT_SWEEP_FACTORS.to_vec())
            },
            None => None,
        };

        let operations = parse_or(&get, "BENCH_OPERATIONS", defaults.operations, |v| *v > 0);
        let workers = parse_or(&get, "BENCH_WORKERS", defaults.workers, |v| *v > 0);
        let seed = get("BENCH_SEED").and_then(|raw| match raw.trim().parse::<u64>() {
            Ok(seed) => Some(seed),
            Err(_) => {
                warn!(name = "BENCH_SEED", value = %raw, "ignoring malformed seed");
                None
            },
        });

        Self {
            size_factor,
            multi_size,
            precache_ratio,
            miss_penalty: Duration::from_millis(penalty_ms),
            zipf_s,
            zipf_v,
            domain_factor,
            sweep_factors,
            trace_prefix: get("TRACE_LOG_PREFIX"),
            operations,
            workers,
            seed,
            trace_capacity: defaults.trace_capacity,
        }
    }

    /// `true` when domain factors are swept.
    pub fn is_sweep(&self) -> bool {
        self.sweep_factors.is_some()
    }

    /// `true` when per-trial trace files are written.
    pub fn tracing_enabled(&self) -> bool {
        self.trace_prefix.as_deref().is_some_and(|p| !p.is_empty())
    }
}

fn parse_or<T, G, V>(get: &G, name: &str, default: T, valid: V) -> T
where
    T: FromStr + Copy + std::fmt::Debug,
    G: Fn(&str) -> Option<String>,
    V: Fn(&T) -> bool,
{
    let Some(raw) = get(name) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => value,
        _ => {
            warn!(name, value = %raw, fallback = ?default, "invalid value, using default");
            default
        },
    }
}

fn flag(name: &str, raw: &str) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            warn!(name, value = %raw, "unrecognised flag, treating as disabled");
            false
        },
    }
}

/// Parses a JSON array of positive factors, falling back to the default list.
pub fn parse_factor_list(raw: &str) -> Vec<f64> {
    match serde_json::from_str::<Vec<f64>>(raw) {
        Ok(list) if !list.is_empty() && list.iter().all(|f| f.is_finite() && *f > 0.0) => list,
        Ok(_) => {
            warn!(value = %raw, "sweep factors must be a non-empty list of positive numbers");
            DEFAULT_SWEEP_FACTORS.to_vec()
        },
        Err(err) => {
            warn!(value = %raw, error = %err, "malformed sweep factor list");
            DEFAULT_SWEEP_FACTORS.to_vec()
        },
    }
}

/// Immutable parameters of one trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrialConfig {
    pub cache_size: usize,
    pub precache_ratio: f64,
    pub distribution_factor: f64,
    pub miss_penalty: Duration,
}

impl TrialConfig {
    /// Keys inserted before measurement: `round(cache_size * precache_ratio)`.
    pub fn precache_size(&self) -> u64 {
        (self.cache_size as f64 * self.precache_ratio).round() as u64
    }

    /// Draw domain: `round(cache_size * distribution_factor)`, at least 1.
    pub fn domain(&self) -> u64 {
        ((self.cache_size as f64 * self.distribution_factor).round() as u64).max(1)
    }
}
