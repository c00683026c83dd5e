use std::{
    alloc::Layout,
    marker::PhantomData,
    mem::{self, size_of},
    ptr::{self, NonNull},
};

use crate::{
    alloc::Allocator,
    collections::{ReserveStrategy, TryReserveError},
};


/// Low level utility for more ergonomically allocating, reallocating, and deallocating
/// a buffer of memory in an allocator without having to worry about all the corner cases involved.
/// In particular:
/// 
/// - Produces `NonNull::dangling` on zero-sized types
/// - Produces `NonNull::dangling` on zero-length allocations.
/// - Avoid freeing `NonNull::dangling`
/// - Catches all overflows in capacity computations (promotes them to "capacity overflow" errors).
/// - Rejects capacities exceeding the allocator's maximum size before calling into the allocator.
/// 
/// This type does not in anyway inspect the memory it manages. When dropped it *will* free its memory, but it *won't* try to drop its contents.
/// It is up to the user of `RawArray` to handle the actual things *stored* inside of `RawArray`.
/// 
/// Moving elements between blocks is always a bitwise copy, elements are never cloned or dropped by this type.
/// 
/// Note that the capacity of a zero-sized type is always infinite, so `capacity()` always return `usize::MAX`.
pub(crate) struct RawArray<T, A: Allocator, R: ReserveStrategy> {
    ptr:      NonNull<T>,
    cap:      usize,
    alloc:    A,
    _phantom: PhantomData<(T, fn() -> R)>,
}

impl<T, A: Allocator, R: ReserveStrategy> RawArray<T, A, R> {
    const IS_ZST: bool = size_of::<T>() == 0;

    /// Creates the biggest possible `RawArray` (in the allocator) without allocating.
    /// If `T` has a non-zero size, the this makes a `RawArray` with a capacity of `0`.
    /// If `T` is zero-sized, the it makes a `RawArray` with a capacity of `usize::MAX`.
    #[must_use]
    pub const fn new_in(alloc: A) -> Self {
        Self { ptr: NonNull::dangling(), cap: 0, alloc, _phantom: PhantomData }
    }

    /// Creates a `RawArray` (in the allocator) with exactly the capacity and alignment requirements for a `[T; capacity]`.
    /// This is equivalent to calling `RawArray::new_in` when `capacity` is `0` or `T` is zero-sized.
    /// 
    /// # Panics
    /// 
    /// Panics if the requested capacity exceeds the allocator's maximum or if the allocation fails.
    #[must_use]
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        match Self::try_with_capacity_in(capacity, alloc) {
            Ok(arr) => arr,
            Err(err) => handle_error(err),
        }
    }

    /// Tries to create a `RawArray` (in the allocator) with exactly the capacity and alignment requirements for a `[T; capacity]`.
    /// This is equivalent to calling `RawArray::new_in` when `capacity` is `0` or `T` is zero-sized.
    pub fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self, TryReserveError> {
        let mut arr = Self::new_in(alloc);
        if !Self::IS_ZST && capacity != 0 {
            arr.ptr = arr.allocate_block(capacity)?;
            arr.cap = capacity;
        }
        Ok(arr)
    }

    /// Get the capacity of the allocation.
    /// 
    /// This will always be `usize::MAX` if `T` is zero-sized.
    #[inline]
    pub fn capacity(&self) -> usize {
        if Self::IS_ZST {
            usize::MAX
        } else {
            self.cap
        }
    }

    /// Get the maximum number of elements a single block from the allocator can hold.
    pub fn max_len(&self) -> usize {
        if Self::IS_ZST {
            usize::MAX
        } else {
            self.alloc.max_size().min(isize::MAX as usize) / size_of::<T>()
        }
    }

    /// Get the allocator used for the allocation.
    #[inline]
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    #[inline]
    pub fn allocator_mut(&mut self) -> &mut A {
        &mut self.alloc
    }

    /// Get a raw pointer to the start of the allocation.
    /// Note that this is a dangling pointer when either `capacity() == 0` or `T` is zero-sized.
    #[inline]
    pub fn ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Ensures that the buffer contains at least enough space to hold `len + additional` elements.
    /// If it doesn't already have enough capacity, will reallocate enough space plus the slack space the reserve strategy asks for.
    /// 
    /// `len` may not exceed `self.capacity()`, and the first `len` elements are moved to the new block.
    /// 
    /// # Panics
    /// 
    /// Panics if the new capacity exceeds the allocator's maximum or if the allocation fails.
    pub fn reserve(&mut self, len: usize, additional: usize) {
        // Callers expect this function to be very cheap when there is already sufficient capacity.
        // Therefore, we move all the resizing and error-handling logic behind a call,
        // while making sure that this function is likely to be inlined as just a comparison and a call if the comparison fails.
        #[cold]
        fn do_reserve_and_handle<T, A: Allocator, R: ReserveStrategy>(
            slf: &mut RawArray<T, A, R>,
            len: usize,
            additional: usize,
        ) {
            if let Err(err) = slf.grow_amortized(len, additional) {
                handle_error(err);
            }
        }

        if self.needs_to_grow(len, additional) {
            do_reserve_and_handle(self, len, additional);
        }
    }

    /// The same as `reserve`, but returns on errors instead of panicking.
    pub fn try_reserve(&mut self, len: usize, additional: usize) -> Result<(), TryReserveError> {
        if self.needs_to_grow(len, additional) {
            self.grow_amortized(len, additional)?;
        }
        Ok(())
    }

    /// Ensures that the buffer contains at least enough space to hold `len + additional` elements.
    /// If it doesn't already, will reallocate exactly the amount of memory necessary.
    /// 
    /// `len` may not exceed `self.capacity()`.
    pub fn try_reserve_exact(&mut self, len: usize, additional: usize) -> Result<(), TryReserveError> {
        if self.needs_to_grow(len, additional) {
            let target_cap = len.checked_add(additional).ok_or(TryReserveError::CapacityOverflow)?;
            // SAFETY: `len <= self.capacity()` is required of the caller
            unsafe { self.relocate(len, target_cap)?; }
        }
        Ok(())
    }

    /// Shrinks the buffer down to the specified capacity, moving the first `len` elements into the new block.
    /// If the given amount is 0, actually completely deallocates.
    /// 
    /// # Panics
    /// 
    /// Panics if the given amount is *larger* than the current capacity or smaller than `len`.
    pub fn try_shrink(&mut self, len: usize, cap: usize) -> Result<(), TryReserveError> {
        assert!(cap <= self.capacity(), "Tried to shrink to a larger capacity");
        assert!(len <= cap, "Tried to shrink below the number of live elements");

        if Self::IS_ZST || cap == self.cap {
            return Ok(());
        }

        if cap == 0 {
            self.release();
            Ok(())
        } else {
            // SAFETY: `len <= cap` was checked above
            unsafe { self.relocate(len, cap) }
        }
    }

    /// Compute the capacity the buffer would grow to, to hold at least `len + additional` elements.
    pub fn grown_capacity(&self, len: usize, additional: usize) -> Result<usize, TryReserveError> {
        if Self::IS_ZST {
            // Since we return a capacity of `usize::MAX` when `elem_size` is 0, getting to here necessarily means that `RawArray` is overfull.
            return Err(TryReserveError::CapacityOverflow);
        }

        let required_cap = len.checked_add(additional).ok_or(TryReserveError::CapacityOverflow)?;
        let max_len = self.max_len();
        if required_cap > max_len {
            return Err(TryReserveError::CapacityOverflow);
        }

        let new_cap = R::calculate(len, self.capacity(), required_cap).map_err(|_| TryReserveError::CapacityOverflow)?;
        Ok(new_cap.clamp(required_cap, max_len))
    }

    /// Allocate a block that can hold `cap` elements, without installing it.
    /// 
    /// The block needs to be either installed with [`RawArray::replace_block`] or freed with [`RawArray::release_block`].
    pub fn allocate_block(&mut self, cap: usize) -> Result<NonNull<T>, TryReserveError> {
        if Self::IS_ZST || cap == 0 {
            return Ok(NonNull::dangling());
        }
        if cap > self.max_len() {
            return Err(TryReserveError::CapacityOverflow);
        }

        let layout = Layout::array::<T>(cap).map_err(|_| TryReserveError::CapacityOverflow)?;
        // SAFETY: `layout` has a non-zero size, as both `cap` and the size of `T` are non-zero
        match unsafe { self.alloc.alloc(layout) } {
            Some(ptr) => Ok(ptr.cast()),
            None => Err(TryReserveError::AllocError(layout)),
        }
    }

    /// Free a block that was returned by [`RawArray::allocate_block`], without touching its contents.
    /// 
    /// # Safety
    /// 
    /// - `ptr` must have been allocated by this `RawArray`'s allocator with a capacity of `cap`.
    /// - `ptr` may not be used afterwards.
    pub unsafe fn release_block(&mut self, ptr: NonNull<T>, cap: usize) {
        if Self::IS_ZST || cap == 0 {
            return;
        }
        // SAFETY: The layout was already valid when the block was allocated
        let layout = Layout::from_size_align_unchecked(size_of::<T>() * cap, mem::align_of::<T>());
        self.alloc.dealloc(ptr.cast(), layout);
    }

    /// Free the current block and take ownership of `ptr`.
    /// 
    /// Nothing stored in the current block is dropped.
    /// 
    /// # Safety
    /// 
    /// - `ptr` must have been allocated by this `RawArray`'s allocator with a capacity of `cap`.
    pub unsafe fn replace_block(&mut self, ptr: NonNull<T>, cap: usize) {
        self.release_block(self.ptr, self.cap);
        self.ptr = ptr;
        self.cap = cap;
    }

    /// Deallocate the current block, leaving the array with a capacity of 0.
    pub fn release(&mut self) {
        // SAFETY: Our own block was allocated by our allocator with our capacity.
        unsafe { self.replace_block(NonNull::dangling(), 0) };
    }

    /// Exchange the blocks of 2 arrays, the allocators stay in place.
    pub fn swap_block(&mut self, other: &mut Self) {
        mem::swap(&mut self.ptr, &mut other.ptr);
        mem::swap(&mut self.cap, &mut other.cap);
    }

    /// Exchange the blocks and allocators of 2 arrays.
    pub fn swap_all(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    //--------------------------------------------------------------

    /// Returns if the buffer needs to grow to fulfill the needed extra capacity.
    /// Mainly used to make inlining reserve-calls possible without inlining `grow`.
    #[inline]
    pub fn needs_to_grow(&self, len: usize, additional: usize) -> bool {
        additional > self.capacity().wrapping_sub(len)
    }

    fn grow_amortized(&mut self, len: usize, additional: usize) -> Result<(), TryReserveError> {
        debug_assert!(additional > 0);
        let new_cap = self.grown_capacity(len, additional)?;
        // SAFETY: `len <= self.capacity() < new_cap`
        unsafe { self.relocate(len, new_cap) }
    }

    /// Move the first `len` elements to a new block of `new_cap` elements.
    /// 
    /// The current block stays untouched when the allocation fails.
    /// 
    /// # Safety
    /// 
    /// `len` elements need to be initialized and `len <= new_cap`.
    unsafe fn relocate(&mut self, len: usize, new_cap: usize) -> Result<(), TryReserveError> {
        if Self::IS_ZST {
            return Err(TryReserveError::CapacityOverflow);
        }

        let new_ptr = self.allocate_block(new_cap)?;
        ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), len);
        self.replace_block(new_ptr, new_cap);
        Ok(())
    }
}

// SAFETY: The block is uniquely owned, so sending or sharing it is as safe as sending or sharing `T` and the allocator
unsafe impl<T: Send, A: Allocator + Send, R: ReserveStrategy> Send for RawArray<T, A, R> {}
unsafe impl<T: Sync, A: Allocator + Sync, R: ReserveStrategy> Sync for RawArray<T, A, R> {}

impl<T, A: Allocator, R: ReserveStrategy> Drop for RawArray<T, A, R> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Central function for reserve error handling
#[cold]
#[track_caller]
pub(crate) fn handle_error(e: TryReserveError) -> ! {
    match e {
        TryReserveError::CapacityOverflow => capacity_overflow(),
        TryReserveError::AllocError(layout) => panic!("memory allocation of {} bytes failed", layout.size()),
    }
}

#[track_caller]
fn capacity_overflow() -> ! {
    panic!("capacity overflow");
}
