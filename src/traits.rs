//! # Candidate Contract
//!
//! The harness sees every benchmarked cache through [`CandidateCache`]: one
//! insert and one lookup, both taking `&self`. One instance is shared by all
//! workers of a trial, so implementations must be `Send + Sync`; how they get
//! there (global lock, shards, lock-free) is their business. The harness adds
//! no locking of its own.
//!
//! ```text
//!   worker ──draw v──► get(v) ──missed?──► set(v)
//!                        │                    │
//!                        ▼                    ▼
//!                 get_key("key-…v")    set_key("key-…v")
//! ```
//!
//! Adapters implement the string-keyed pair; the index-keyed pair encodes
//! through [`crate::key::encode`] by default.
//!
//! ## Example Usage
//!
//! ```
//! use cachesweep::candidate::MapCandidate;
//! use cachesweep::traits::CandidateCache;
//!
//! let cache = MapCandidate::with_capacity(16);
//! assert!(cache.get(3));      // missed
//! cache.set(3);
//! assert!(!cache.get(3));     // hit
//! ```

use std::sync::Arc;

use crate::key;

/// Size of the filler value written on every insert.
pub const VALUE_SIZE: usize = 100;

/// A fresh filler value. Contents are irrelevant to correctness.
#[inline]
pub fn filler_value() -> Box<[u8]> {
    vec![0u8; VALUE_SIZE].into_boxed_slice()
}

/// Minimal capability every benchmarked cache provides.
pub trait CandidateCache: Send + Sync {
    /// Inserts or overwrites `key` with a filler value.
    fn set_key(&self, key: &str);

    /// Looks `key` up; returns `true` when it was absent (or the lookup failed).
    fn get_key(&self, key: &str) -> bool;

    /// Inserts the key encoding `index`.
    #[inline]
    fn set(&self, index: u64) {
        self.set_key(key::encode(index).as_str());
    }

    /// Looks up the key encoding `index`; returns `true` on a miss.
    #[inline]
    fn get(&self, index: u64) -> bool {
        self.get_key(key::encode(index).as_str())
    }
}

impl<C: CandidateCache + ?Sized> CandidateCache for Box<C> {
    #[inline]
    fn set_key(&self, key: &str) {
        (**self).set_key(key)
    }

    #[inline]
    fn get_key(&self, key: &str) -> bool {
        (**self).get_key(key)
    }

    #[inline]
    fn set(&self, index: u64) {
        (**self).set(index)
    }

    #[inline]
    fn get(&self, index: u64) -> bool {
        (**self).get(index)
    }
}

impl<C: CandidateCache + ?Sized> CandidateCache for Arc<C> {
    #[inline]
    fn set_key(&self, key: &str) {
        (**self).set_key(key)
    }

    #[inline]
    fn get_key(&self, key: &str) -> bool {
        (**self).get_key(key)
    }

    #[inline]
    fn set(&self, index: u64) {
        (**self).set(index)
    }

    #[inline]
    fn get(&self, index: u64) -> bool {
        (**self).get(index)
    }
}
