//! cachesweep: a benchmark harness for concurrent key-value caches.
//!
//! Drives a candidate cache with skewed (Zipf) or uniform key streams from
//! many workers at once, sweeping cache size against key-domain size, and
//! reports throughput, misses, out-of-range draws and allocator churn per
//! trial.
//!
//! ## Architecture
//!
//! ```text
//!   HarnessConfig ─► Sweep ─► (per trial) Harness ─► N workers
//!                                                      │
//!          Distribution ─► key codec ─► CandidateCache.get ─► miss? set
//!                                                      │
//!                       WorkerMetrics ─► TrialMetrics ─┴─► TrialReport
//!                                     TraceLogger (optional, per trial)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: environment-sourced run configuration
//! - [`distribution`]: Zipf and uniform key generators
//! - [`key`]: fixed-width key encoding
//! - [`traits`]: the [`CandidateCache`](traits::CandidateCache) contract
//! - [`candidate`]: shipped candidate adapters and their registry
//! - [`harness`]: one parallel trial
//! - [`sweep`]: the size × factor cross product
//! - [`metrics`], [`report`], [`trace`], [`alloc`]: measurement and output

pub mod alloc;
pub mod candidate;
pub mod config;
pub mod distribution;
pub mod error;
pub mod harness;
pub mod key;
pub mod metrics;
pub mod prelude;
pub mod report;
pub mod sweep;
pub mod trace;
pub mod traits;
