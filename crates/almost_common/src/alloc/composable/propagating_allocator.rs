use std::{alloc::Layout, ptr::NonNull};

use crate::alloc::Allocator;

/// Propagating allocator
/// 
/// Wraps another allocator and makes it travel along with the container's storage on copy-assignment, move-assignment and swap.
#[derive(Clone, Copy, Default, Debug)]
pub struct Propagating<A: Allocator>(A);

impl<A: Allocator> Propagating<A> {
    pub const fn new(alloc: A) -> Self {
        Self(alloc)
    }

    /// Get the wrapped allocator
    pub fn inner(&self) -> &A {
        &self.0
    }
}

impl<A: Allocator> Allocator for Propagating<A> {
    const PROPAGATE_ON_COPY_ASSIGN: bool = true;
    const PROPAGATE_ON_MOVE_ASSIGN: bool = true;
    const PROPAGATE_ON_SWAP: bool = true;

    unsafe fn alloc(&mut self, layout: Layout) -> Option<NonNull<u8>> {
        self.0.alloc(layout)
    }

    unsafe fn dealloc(&mut self, ptr: NonNull<u8>, layout: Layout) {
        self.0.dealloc(ptr, layout)
    }

    fn max_size(&self) -> usize {
        self.0.max_size()
    }

    fn alloc_id(&self) -> u16 {
        self.0.alloc_id()
    }

    fn is_equal(&self, other: &Self) -> bool {
        self.0.is_equal(&other.0)
    }
}

#[cfg(test)]
mod tests {
    use std::alloc::Layout;

    use crate::alloc::{primitives::TrackingAllocator, Allocator};
    use super::Propagating;

    #[test]
    fn forwards_to_inner() {
        let mut alloc = Propagating::new(TrackingAllocator::new());
        let layout = Layout::new::<u32>();
        unsafe {
            let ptr = alloc.alloc(layout).unwrap();
            assert_eq!(alloc.inner().stats().live_allocs(), 1);
            alloc.dealloc(ptr, layout);
        }
        assert_eq!(alloc.inner().stats().live_allocs(), 0);
        assert!(!alloc.is_equal(&Propagating::new(TrackingAllocator::new())));
        assert!(alloc.is_equal(&alloc.clone()));
    }
}
