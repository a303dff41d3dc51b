//! Collection-cycle probes.
//!
//! The `gc` trial metric is the delta of [`CycleProbe::sample`] taken right
//! before and right after the timed region. Without a tracing collector the
//! closest signal is allocator churn, so [`CountingAllocator`] counts
//! deallocations. Install it as the global allocator in a binary:
//!
//! ```ignore
//! use cachesweep::alloc::CountingAllocator;
//!
//! #[global_allocator]
//! static ALLOC: CountingAllocator = CountingAllocator::new();
//! ```
//!
//! Library code that has no allocator installed uses [`NoProbe`].

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counter sampled around a trial.
pub trait CycleProbe: Sync {
    fn sample(&self) -> u64;
}

/// Probe that always reads zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProbe;

impl CycleProbe for NoProbe {
    #[inline]
    fn sample(&self) -> u64 {
        0
    }
}

/// `System` allocator wrapper counting allocations and frees.
#[derive(Debug)]
pub struct CountingAllocator {
    allocations: AtomicU64,
    deallocations: AtomicU64,
}

impl CountingAllocator {
    pub const fn new() -> Self {
        Self {
            allocations: AtomicU64::new(0),
            deallocations: AtomicU64::new(0),
        }
    }

    /// Allocation calls so far, reallocations included.
    pub fn allocations(&self) -> u64 {
        self.allocations.load(Ordering::Relaxed)
    }

    /// Deallocation calls so far.
    pub fn deallocations(&self) -> u64 {
        self.deallocations.load(Ordering::Relaxed)
    }
}

impl Default for CountingAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: every call is forwarded unchanged to `System`; the counters are
// plain atomics and never allocate.
unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.allocations.fetch_add(1, Ordering::Relaxed);
        unsafe { System.alloc(layout) }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        self.allocations.fetch_add(1, Ordering::Relaxed);
        unsafe { System.alloc_zeroed(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.deallocations.fetch_add(1, Ordering::Relaxed);
        unsafe { System.dealloc(ptr, layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        self.allocations.fetch_add(1, Ordering::Relaxed);
        unsafe { System.realloc(ptr, layout, new_size) }
    }
}

impl CycleProbe for CountingAllocator {
    #[inline]
    fn sample(&self) -> u64 {
        self.deallocations()
    }
}
