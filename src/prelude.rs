pub use crate::alloc::{CountingAllocator, CycleProbe, NoProbe};
pub use crate::candidate::{CandidateKind, MapCandidate, ShardedFifoCandidate};
pub use crate::config::{HarnessConfig, TrialConfig};
pub use crate::distribution::{DistributionKind, KeyDistribution, Uniform, Zipf};
pub use crate::error::{BenchError, ConfigError};
pub use crate::harness::{Harness, TrialOutcome, Workload};
pub use crate::key::{KeyCodec, encode, encode_parallel};
pub use crate::metrics::WorkerMetrics;
pub use crate::report::{RunArtifact, TrialReport};
pub use crate::sweep::{Sweep, TrialNamer, TrialRecord};
pub use crate::trace::TraceLogger;
pub use crate::traits::CandidateCache;
