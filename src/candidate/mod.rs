//! Shipped candidate adapters and their registry.
//!
//! The registry is the single list of candidates the binary can run: to add
//! one, implement [`CandidateCache`] and add a [`CandidateKind`] variant.
//!
//! | id        | Display   | Structure                         | Evicts |
//! |-----------|-----------|-----------------------------------|--------|
//! | `map`     | Map       | `RwLock<FxHashMap>`               | no     |
//! | `sharded` | Sharded   | 256 × `Mutex<map + fifo>`         | yes    |
//! | `half`    | Half      | sharded fifo at half the capacity | yes    |

mod map;
mod sharded;

use std::fmt;
use std::str::FromStr;

pub use map::MapCandidate;
pub use sharded::{DEFAULT_SHARDS, ShardedFifoCandidate};

use crate::error::ConfigError;
use crate::traits::CandidateCache;

/// Registered candidate adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateKind {
    Map,
    Sharded,
    Half,
}

impl CandidateKind {
    /// Every registered candidate, in report order.
    pub const ALL: [CandidateKind; 3] = [
        CandidateKind::Map,
        CandidateKind::Sharded,
        CandidateKind::Half,
    ];

    /// Short identifier used on the command line.
    pub fn id(self) -> &'static str {
        match self {
            CandidateKind::Map => "map",
            CandidateKind::Sharded => "sharded",
            CandidateKind::Half => "half",
        }
    }

    /// Name used in benchmark identifiers.
    pub fn display_name(self) -> &'static str {
        match self {
            CandidateKind::Map => "Map",
            CandidateKind::Sharded => "Sharded",
            CandidateKind::Half => "Half",
        }
    }

    /// Builds a fresh candidate sized for `capacity` entries.
    pub fn build(self, capacity: usize) -> Result<Box<dyn CandidateCache>, ConfigError> {
        Ok(match self {
            CandidateKind::Map => Box::new(MapCandidate::with_capacity(capacity)),
            CandidateKind::Sharded => {
                Box::new(ShardedFifoCandidate::try_new(capacity, DEFAULT_SHARDS)?)
            },
            CandidateKind::Half => {
                Box::new(ShardedFifoCandidate::try_new(capacity / 2, DEFAULT_SHARDS)?)
            },
        })
    }
}

impl fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for CandidateKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CandidateKind::ALL
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let known: Vec<&str> = CandidateKind::ALL.iter().map(|k| k.id()).collect();
                ConfigError::new(format!(
                    "unknown candidate '{s}' (expected one of {})",
                    known.join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for kind in CandidateKind::ALL {
            assert_eq!(kind.id().parse::<CandidateKind>(), Ok(kind));
        }
        assert!("lru".parse::<CandidateKind>().is_err());
    }

    #[test]
    fn build_produces_working_candidates() {
        for kind in CandidateKind::ALL {
            let cache = kind.build(1_000).unwrap();
            assert!(cache.get(5), "{kind} should miss on an empty cache");
            cache.set(5);
            assert!(!cache.get(5), "{kind} should hit after set");
        }
    }

    #[test]
    fn half_rejects_single_entry() {
        assert!(CandidateKind::Half.build(1).is_err());
        assert!(CandidateKind::Sharded.build(0).is_err());
        assert!(CandidateKind::Map.build(0).is_ok());
    }
}
