//! Sharded FIFO candidate.
//!
//! ## Architecture
//!
//! ```text
//!   key ──FxHash──► shard = hash % shards
//!
//!   ┌─────────────────┬─────────────────┬─────┬─────────────────┐
//!   │ Mutex<Shard 0>  │ Mutex<Shard 1>  │ ... │ Mutex<Shard N>  │
//!   │  map + fifo     │  map + fifo     │     │  map + fifo     │
//!   └─────────────────┴─────────────────┴─────┴─────────────────┘
//! ```
//!
//! Each shard holds at most `ceil(capacity / shards)` entries and evicts its
//! oldest insertion when full, the way segment-ring caches age out entries.
//! Overwrites keep the original insertion position.
//!
//! ## Example Usage
//!
//! ```
//! use cachesweep::candidate::ShardedFifoCandidate;
//! use cachesweep::traits::CandidateCache;
//!
//! let cache = ShardedFifoCandidate::try_new(2, 1).unwrap();
//! cache.set(1);
//! cache.set(2);
//! cache.set(3); // evicts 1
//! assert!(cache.get(1));
//! assert!(!cache.get(3));
//! ```

use std::collections::VecDeque;
use std::hash::BuildHasher;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::error::ConfigError;
use crate::traits::{CandidateCache, filler_value};

/// Default shard count.
pub const DEFAULT_SHARDS: usize = 256;

#[derive(Debug, Default)]
struct Shard {
    entries: FxHashMap<Arc<str>, Box<[u8]>>,
    order: VecDeque<Arc<str>>,
}

/// Bounded cache with per-shard FIFO eviction.
#[derive(Debug)]
pub struct ShardedFifoCandidate {
    shards: Box<[Mutex<Shard>]>,
    per_shard: usize,
    capacity: usize,
    evictions: AtomicU64,
}

impl ShardedFifoCandidate {
    /// Creates a cache holding roughly `capacity` entries across `shards` shards.
    ///
    /// Fails when either value is zero.
    pub fn try_new(capacity: usize, shards: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::new("capacity must be > 0"));
        }
        if shards == 0 {
            return Err(ConfigError::new("shards must be > 0"));
        }
        let shards = shards.min(capacity);
        let per_shard = capacity.div_ceil(shards);
        Ok(Self {
            shards: (0..shards).map(|_| Mutex::new(Shard::default())).collect(),
            per_shard,
            capacity,
            evictions: AtomicU64::new(0),
        })
    }

    #[inline]
    fn shard_for(&self, key: &str) -> &Mutex<Shard> {
        let idx = (FxBuildHasher.hash_one(key) as usize) % self.shards.len();
        &self.shards[idx]
    }

    /// Requested capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Entries currently held across all shards.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total evictions since construction.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}

impl CandidateCache for ShardedFifoCandidate {
    fn set_key(&self, key: &str) {
        let value = filler_value();
        let mut shard = self.shard_for(key).lock();
        if let Some(slot) = shard.entries.get_mut(key) {
            *slot = value;
            return;
        }
        while shard.entries.len() >= self.per_shard {
            let Some(oldest) = shard.order.pop_front() else {
                break;
            };
            shard.entries.remove(&oldest);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        let key: Arc<str> = Arc::from(key);
        shard.order.push_back(Arc::clone(&key));
        shard.entries.insert(key, value);
    }

    fn get_key(&self, key: &str) -> bool {
        !self.shard_for(key).lock().entries.contains_key(key)
    }
}
