use std::{
    alloc::{GlobalAlloc, Layout, System},
    ptr::NonNull,
};

use crate::alloc::{AllocId, Allocator};

/// Allocator calling directly to the system allocator
/// 
/// Mallocator is stateless, so every instance can free memory allocated by any other instance.
/// It will always use the reserved allocator id of [`AllocId::Malloc`].
#[derive(Clone, Copy, Default, Debug)]
pub struct Mallocator;

impl Allocator for Mallocator {
    const PROPAGATE_ON_MOVE_ASSIGN: bool = true;

    unsafe fn alloc(&mut self, layout: Layout) -> Option<NonNull<u8>> {
        NonNull::new(System.alloc(layout))
    }

    unsafe fn dealloc(&mut self, ptr: NonNull<u8>, layout: Layout) {
        System.dealloc(ptr.as_ptr(), layout);
    }

    fn alloc_id(&self) -> u16 {
        AllocId::Malloc.get_id()
    }

    fn is_equal(&self, _other: &Self) -> bool {
        true
    }
}

static_assertions::assert_impl_all!(Mallocator: Allocator, Clone, Copy, Default, Send, Sync);

#[cfg(test)]
mod test {
    use std::alloc::Layout;

    use crate::alloc::*;
    use super::Mallocator;

    #[test]
    fn alloc_dealloc() {
        let mut alloc = Mallocator;
        let layout = Layout::new::<u64>();

        unsafe {
            let ptr = alloc.alloc(layout).unwrap();
            ptr.cast::<u64>().as_ptr().write(42);
            assert_eq!(*ptr.cast::<u64>().as_ptr(), 42);
            alloc.dealloc(ptr, layout);
        }
    }

    #[test]
    fn always_equal() {
        assert!(Mallocator.is_equal(&Mallocator));
        assert_eq!(Mallocator.alloc_id(), AllocId::Malloc.get_id());
    }
}
