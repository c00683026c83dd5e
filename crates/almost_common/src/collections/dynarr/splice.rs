use core::{
    mem,
    ptr::{self, NonNull},
    slice,
};

use crate::{
    alloc::Allocator,
    collections::{imp::array::RawArray, ReserveStrategy, TryReserveError},
};

use super::DynArr;

/// Order in which a reallocating insertion fills the new block.
/// 
/// Both orders result in the same arrangement, they only differ in what has been moved when constructing an incoming element fails.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(super) enum InsertOrder {
    /// Construct the incoming elements before moving the prefix, used for sources that need to be consumed immediately.
    NewFirst,
    /// Move the prefix, construct the incoming elements, then move the suffix.
    Natural,
}

#[cold]
#[track_caller]
fn fill_failed(filled: usize, count: usize) -> ! {
    panic!("insertion source yielded {filled} elements, but {count} were expected");
}

//--------------------------------------------------------------

/// Gap opened inside of the current block of a `DynArr`.
/// 
/// While the gap is open, the dynamic array's length only covers the elements in front of the gap.
/// If the gap is dropped before it is completely filled, the values written into it are dropped and the tail is moved back,
/// so the dynamic array looks exactly like it did before the gap was opened.
pub(super) struct InPlaceGap<'a, T, A: Allocator, R: ReserveStrategy> {
    arr:    &'a mut DynArr<T, A, R>,
    index:  usize,
    count:  usize,
    filled: usize,
    tail:   usize,
}

impl<'a, T, A: Allocator, R: ReserveStrategy> InPlaceGap<'a, T, A, R> {
    /// Shift the elements in `[index, len)` up by `count` slots.
    /// 
    /// # Safety
    /// 
    /// - `index <= arr.len()`
    /// - `arr.len() + count <= arr.capacity()`
    pub unsafe fn open(arr: &'a mut DynArr<T, A, R>, index: usize, count: usize) -> Self {
        let len = arr.len();
        debug_assert!(index <= len);
        debug_assert!(count <= arr.capacity() - len);

        let tail = len - index;
        arr.set_len(index);

        // The ranges overlap, `ptr::copy` moves the highest elements first when moving up
        let p = arr.as_mut_ptr().add(index);
        ptr::copy(p, p.add(count), tail);

        Self { arr, index, count, filled: 0, tail }
    }

    /// The elements in front of the gap.
    pub fn prefix(&self) -> &[T] {
        self.arr.as_slice()
    }

    /// Construct the next value in the gap.
    pub fn write(&mut self, value: T) {
        debug_assert!(self.filled < self.count);
        // SAFETY: The gap was reserved when it was opened and `filled < count`
        unsafe { ptr::write(self.arr.as_mut_ptr().add(self.index + self.filled), value) };
        self.filled += 1;
    }

    /// Close the gap, making all elements part of the dynamic array again.
    /// 
    /// # Panics
    /// 
    /// Panics if the gap was not completely filled.
    pub fn finish(self) {
        if self.filled != self.count {
            fill_failed(self.filled, self.count);
        }
        // SAFETY: All slots up to the end of the tail are initialized
        unsafe { self.arr.set_len(self.index + self.count + self.tail) };
        mem::forget(self);
    }
}

impl<T, A: Allocator, R: ReserveStrategy> Drop for InPlaceGap<'_, T, A, R> {
    fn drop(&mut self) {
        // SAFETY: `filled` values were written at the start of the gap, the tail is still located right after the gap.
        unsafe {
            let p = self.arr.as_mut_ptr().add(self.index);
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(p, self.filled));
            ptr::copy(p.add(self.count), p, self.tail);
            self.arr.set_len(self.index + self.tail);
        }
    }
}

//--------------------------------------------------------------

/// New block being filled by an insertion that did not fit in the current block.
/// 
/// The current block keeps ownership of its elements until [`SpliceBlock::finish`] installs the new block,
/// if the splice block is dropped before that, the incoming elements are dropped and the new block is released.
pub(super) struct SpliceBlock<'a, T, A: Allocator, R: ReserveStrategy> {
    arr:          &'a mut RawArray<T, A, R>,
    ptr:          NonNull<T>,
    cap:          usize,
    len:          usize,
    index:        usize,
    count:        usize,
    filled:       usize,
    prefix_moved: bool,
}

impl<'a, T, A: Allocator, R: ReserveStrategy> SpliceBlock<'a, T, A, R> {
    /// Allocate a block large enough to hold `len + count` elements.
    /// 
    /// # Safety
    /// 
    /// - The first `len` elements of `arr` need to be initialized.
    /// - `index <= len`
    pub unsafe fn new(arr: &'a mut RawArray<T, A, R>, len: usize, index: usize, count: usize, order: InsertOrder) -> Result<Self, TryReserveError> {
        debug_assert!(index <= len);

        let cap = arr.grown_capacity(len, count)?;
        let ptr = arr.allocate_block(cap)?;

        let mut block = Self { arr, ptr, cap, len, index, count, filled: 0, prefix_moved: false };
        if order == InsertOrder::Natural {
            block.move_prefix();
        }
        Ok(block)
    }

    /// The elements in the current block, which are still valid until the new block is installed.
    pub fn old_elements(&self) -> &[T] {
        // SAFETY: The first `len` elements of the current block are initialized.
        unsafe { slice::from_raw_parts(self.arr.ptr(), self.len) }
    }

    /// Construct the next incoming value at its final location.
    pub fn write(&mut self, value: T) {
        debug_assert!(self.filled < self.count);
        // SAFETY: The new block has space for `index + count` elements and `filled < count`
        unsafe { ptr::write(self.ptr.as_ptr().add(self.index + self.filled), value) };
        self.filled += 1;
    }

    /// Move the prefix and suffix around the incoming elements and install the new block.
    /// 
    /// # Panics
    /// 
    /// Panics if not all incoming elements were written.
    pub fn finish(mut self) {
        if self.filled != self.count {
            fill_failed(self.filled, self.count);
        }

        if !self.prefix_moved {
            self.move_prefix();
        }

        // SAFETY: The suffix is initialized in the old block and fits behind the incoming elements
        unsafe {
            let src = self.arr.ptr().add(self.index);
            let dst = self.ptr.as_ptr().add(self.index + self.count);
            ptr::copy_nonoverlapping(src, dst, self.len - self.index);

            self.arr.replace_block(self.ptr, self.cap);
        }
        mem::forget(self);
    }

    fn move_prefix(&mut self) {
        // SAFETY: Copying the bits does not transfer ownership, the old block stays the owner until the new block is installed.
        unsafe { ptr::copy_nonoverlapping(self.arr.ptr(), self.ptr.as_ptr(), self.index) };
        self.prefix_moved = true;
    }
}

impl<T, A: Allocator, R: ReserveStrategy> Drop for SpliceBlock<'_, T, A, R> {
    fn drop(&mut self) {
        // SAFETY: Only the incoming elements are owned by the new block, which is still owned by us.
        unsafe {
            let p = self.ptr.as_ptr().add(self.index);
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(p, self.filled));
            self.arr.release_block(self.ptr, self.cap);
        }
    }
}
