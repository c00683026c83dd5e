use core::sync::atomic::{AtomicUsize, Ordering};
use std::{
    alloc::{GlobalAlloc, Layout, System},
    ptr::NonNull,
    sync::Arc,
};

use parking_lot::Mutex;

use crate::alloc::{Allocator, MAX_ALLOC_ID, NUM_RESERVED_ALLOC_IDS};

/// Allocation statistics gathered by a [`TrackingAllocator`].
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct AllocStats {
    /// Number of successful allocations
    pub num_allocs:    usize,
    /// Number of deallocations
    pub num_deallocs:  usize,
    /// Number of allocation requests that were refused
    pub failed_allocs: usize,
    /// Number of bytes currently allocated
    pub live_bytes:    usize,
    /// Highest number of bytes that were allocated at the same time
    pub peak_bytes:    usize,
}

impl AllocStats {
    /// Get the number of allocations that have not been deallocated yet.
    pub fn live_allocs(&self) -> usize {
        self.num_allocs - self.num_deallocs
    }
}

#[derive(Debug)]
struct TrackingState {
    stats:      AllocStats,
    limit:      usize,
    // Number of allocations that may still succeed before every allocation fails
    fail_after: Option<usize>,
}

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

fn next_alloc_id() -> u16 {
    let range = (MAX_ALLOC_ID - NUM_RESERVED_ALLOC_IDS) as usize;
    NUM_RESERVED_ALLOC_IDS + (NEXT_ID.fetch_add(1, Ordering::Relaxed) % range) as u16
}

/// Allocator that calls into the system allocator and keeps track of what it has handed out.
/// 
/// Clones of a `TrackingAllocator` share their statistics and id, so memory allocated by one clone can be freed by any other clone.
/// Two `TrackingAllocator`s created separately never compare equal, even when their ids collide after the id range wrapped around.
/// 
/// The allocator can be limited to a number of live bytes, and can be told to start refusing allocation requests,
/// which makes it possible to observe how containers deal with allocation failure.
#[derive(Clone, Debug)]
pub struct TrackingAllocator {
    id:    u16,
    state: Arc<Mutex<TrackingState>>,
}

impl TrackingAllocator {
    /// Create a new tracking allocator without a limit.
    pub fn new() -> Self {
        Self::with_limit(isize::MAX as usize)
    }

    /// Create a new tracking allocator that can have at most `limit` bytes allocated at any time.
    /// 
    /// `limit` is also reported as the allocator's maximum allocation size.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            id: next_alloc_id(),
            state: Arc::new(Mutex::new(TrackingState {
                stats: AllocStats::default(),
                limit,
                fail_after: None
            })),
        }
    }

    /// Get a snapshot of the current statistics.
    pub fn stats(&self) -> AllocStats {
        self.state.lock().stats
    }

    /// Let the next `successes` allocations succeed, after which all allocations fail until [`reset_failures`] is called.
    /// 
    /// [`reset_failures`]: TrackingAllocator::reset_failures
    pub fn fail_after(&self, successes: usize) {
        self.state.lock().fail_after = Some(successes);
    }

    /// Make all following allocations fail until [`reset_failures`] is called.
    /// 
    /// [`reset_failures`]: TrackingAllocator::reset_failures
    pub fn fail_next(&self) {
        self.fail_after(0);
    }

    /// Stop injecting allocation failures.
    pub fn reset_failures(&self) {
        self.state.lock().fail_after = None;
    }
}

impl Default for TrackingAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl Allocator for TrackingAllocator {
    unsafe fn alloc(&mut self, layout: Layout) -> Option<NonNull<u8>> {
        let mut state = self.state.lock();

        let refuse = match &mut state.fail_after {
            Some(0) => true,
            Some(remaining) => {
                *remaining -= 1;
                false
            },
            None => false,
        } || state.stats.live_bytes + layout.size() > state.limit;

        if refuse {
            state.stats.failed_allocs += 1;
            return None;
        }

        let ptr = NonNull::new(System.alloc(layout));
        if ptr.is_some() {
            let stats = &mut state.stats;
            stats.num_allocs += 1;
            stats.live_bytes += layout.size();
            stats.peak_bytes = stats.peak_bytes.max(stats.live_bytes);
        } else {
            state.stats.failed_allocs += 1;
        }
        ptr
    }

    unsafe fn dealloc(&mut self, ptr: NonNull<u8>, layout: Layout) {
        let mut state = self.state.lock();
        debug_assert!(state.stats.live_bytes >= layout.size(), "Deallocating more memory than was allocated");
        state.stats.num_deallocs += 1;
        state.stats.live_bytes -= layout.size();
        System.dealloc(ptr.as_ptr(), layout);
    }

    fn max_size(&self) -> usize {
        self.state.lock().limit
    }

    fn alloc_id(&self) -> u16 {
        self.id
    }

    // Ids wrap around, so only clones sharing the same state are interchangeable
    fn is_equal(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

static_assertions::assert_impl_all!(TrackingAllocator: Allocator, Clone, Send, Sync);
