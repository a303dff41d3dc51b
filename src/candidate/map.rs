//! Unbounded map candidate.
//!
//! A single `RwLock` over an `FxHashMap`. Never evicts, so after precaching
//! every miss is a first touch of a cold key. Useful as the baseline the
//! bounded candidates are compared against.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::traits::{CandidateCache, filler_value};

/// Non-evicting map behind a global read/write lock.
#[derive(Debug, Default)]
pub struct MapCandidate {
    entries: RwLock<FxHashMap<Box<str>, Box<[u8]>>>,
}

impl MapCandidate {
    /// Creates an empty map sized for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut map = FxHashMap::default();
        map.reserve(capacity);
        Self {
            entries: RwLock::new(map),
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CandidateCache for MapCandidate {
    fn set_key(&self, key: &str) {
        let value = filler_value();
        let mut entries = self.entries.write();
        match entries.get_mut(key) {
            Some(slot) => *slot = value,
            None => {
                entries.insert(key.into(), value);
            },
        }
    }

    fn get_key(&self, key: &str) -> bool {
        !self.entries.read().contains_key(key)
    }
}
