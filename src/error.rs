//! Error types for the cachesweep harness.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when a candidate cannot be built from the
//!   requested parameters (e.g. zero capacity, zero shards).
//! - [`BenchError`]: Everything that can stop a trial or a whole run:
//!   candidate construction, trace sink creation, trace drain failures.
//!
//! Configuration *parsing* never produces an error; malformed values fall back
//! to their defaults (see [`crate::config`]).
//!
//! ## Example Usage
//!
//! ```
//! use cachesweep::candidate::ShardedFifoCandidate;
//! use cachesweep::error::{BenchError, ConfigError};
//!
//! let err: ConfigError = ShardedFifoCandidate::try_new(0, 16).unwrap_err();
//! assert!(err.to_string().contains("capacity"));
//!
//! // Candidate failures convert into trial failures with `?`.
//! let bench: BenchError = err.into();
//! assert!(!bench.aborts_run());
//! ```

use std::fmt;
use std::io;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when candidate or trial parameters are invalid.
///
/// Produced by fallible constructors such as
/// [`ShardedFifoCandidate::try_new`](crate::candidate::ShardedFifoCandidate::try_new)
/// and [`CandidateKind::build`](crate::candidate::CandidateKind::build).
/// Carries a human-readable description of which parameter failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// BenchError
// ---------------------------------------------------------------------------

/// Error returned by the sweep orchestrator and the trace logger.
///
/// [`BenchError::Config`] fails a single trial; every other variant aborts the
/// run, since a partially written trace would be a misleading artifact.
#[derive(Debug)]
pub enum BenchError {
    /// The candidate cache could not be constructed for this trial.
    Config(ConfigError),
    /// The per-trial trace file could not be created.
    TraceSink { path: PathBuf, source: io::Error },
    /// The trace drain task failed while writing or flushing.
    TraceWrite(io::Error),
    /// The trace drain thread panicked.
    TraceWorker,
}

impl BenchError {
    /// Returns `true` if this error must stop the whole run rather than one trial.
    pub fn aborts_run(&self) -> bool {
        !matches!(self, BenchError::Config(_))
    }
}

impl fmt::Display for BenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchError::Config(err) => write!(f, "candidate construction failed: {err}"),
            BenchError::TraceSink { path, source } => {
                write!(f, "cannot create trace file {}: {source}", path.display())
            },
            BenchError::TraceWrite(err) => write!(f, "trace write failed: {err}"),
            BenchError::TraceWorker => f.write_str("trace drain thread panicked"),
        }
    }
}

impl std::error::Error for BenchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BenchError::Config(err) => Some(err),
            BenchError::TraceSink { source, .. } => Some(source),
            BenchError::TraceWrite(err) => Some(err),
            BenchError::TraceWorker => None,
        }
    }
}

impl From<ConfigError> for BenchError {
    fn from(err: ConfigError) -> Self {
        BenchError::Config(err)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- ConfigError ------------------------------------------------------

    #[test]
    fn config_display_shows_message() {
        let err = ConfigError::new("capacity must be > 0");
        assert_eq!(err.to_string(), "capacity must be > 0");
    }

    #[test]
    fn config_message_accessor() {
        let err = ConfigError::new("shards must be > 0");
        assert_eq!(err.message(), "shards must be > 0");
    }

    #[test]
    fn config_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<ConfigError>();
    }

    // -- BenchError -------------------------------------------------------

    #[test]
    fn config_failure_is_trial_scoped() {
        let err = BenchError::from(ConfigError::new("capacity must be > 0"));
        assert!(!err.aborts_run());
        assert!(err.to_string().contains("capacity must be > 0"));
    }

    #[test]
    fn trace_sink_failure_aborts_run() {
        let err = BenchError::TraceSink {
            path: PathBuf::from("/nonexistent/trace"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such directory"),
        };
        assert!(err.aborts_run());
        assert!(err.to_string().contains("/nonexistent/trace"));
    }

    #[test]
    fn source_chain_is_preserved() {
        use std::error::Error;

        let err = BenchError::TraceWrite(io::Error::other("disk full"));
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("disk full"));
        assert!(BenchError::TraceWorker.source().is_none());
    }
}
