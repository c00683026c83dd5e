use std::{alloc::Layout, ptr::NonNull};

//------------------------------------------------------------------------------------------------------------------------------

/// Allocator/Arena that can provide memory blocks to a container.
///
/// A container holds its allocator by value and uses it for every block it acquires or releases.
/// Two allocator instances that compare equal (see [`Allocator::is_equal`]) can release each other's blocks,
/// which allows containers to hand over ownership of a block instead of moving every element.
///
/// When an allocator implements `Clone`, a clone must compare equal to the allocator it was cloned from.
pub trait Allocator {
    /// Does copy-assigning a container also replace its allocator with the source's allocator.
    const PROPAGATE_ON_COPY_ASSIGN: bool = false;
    /// Does move-assigning a container also move the source's allocator into the destination.
    const PROPAGATE_ON_MOVE_ASSIGN: bool = false;
    /// Does swapping two containers also swap their allocators.
    const PROPAGATE_ON_SWAP: bool = false;

    /// Allocate memory from an allocator/arena
    ///
    ///  # Return
    /// 
    /// If no memory could be allocated, `None` should be returned.
    /// 
    /// # Safety
    /// 
    /// `layout` must have a non-zero size.
    unsafe fn alloc(&mut self, layout: Layout) -> Option<NonNull<u8>>;

    /// Deallocate an allocation
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `alloc` on this allocator, or an allocator that compares equal to it, using the same `layout`.
    unsafe fn dealloc(&mut self, ptr: NonNull<u8>, layout: Layout);

    /// Get the largest size in bytes a single allocation can have.
    fn max_size(&self) -> usize {
        isize::MAX as usize
    }

    /// Get the allocator's alloc id
    fn alloc_id(&self) -> u16;

    /// Check if memory allocated by `self` can be deallocated by `other`, and the other way around.
    /// 
    /// Default implementation compares the alloc ids.
    fn is_equal(&self, other: &Self) -> bool where
        Self: Sized
    {
        self.alloc_id() == other.alloc_id()
    }
}

//------------------------------------------------------------------------------------------------------------------------------

/// Reserved allocator ids
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AllocId {
    /// The system allocator
    Malloc,
}

/// Reserved allocs IDs
/// - 0: Malloc
pub const NUM_RESERVED_ALLOC_IDS: u16 = 1;

/// Largest id an allocator can be given
pub const MAX_ALLOC_ID: u16 = 0x0FFF;

static_assertions::const_assert!(NUM_RESERVED_ALLOC_IDS < MAX_ALLOC_ID);

impl AllocId {
    pub const fn get_id(&self) -> u16 {
        match self {
            Self::Malloc => 0,
        }
    }
}
