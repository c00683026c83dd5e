use core::{
    fmt,
    hash::{Hash, Hasher},
    iter,
    mem::{self, ManuallyDrop},
    ops::{self, Bound, Index, IndexMut, RangeBounds},
    ptr,
    slice::{self, SliceIndex},
};

use scopeguard::{guard, ScopeGuard};

use crate::alloc::{primitives::Mallocator, Allocator};

use super::{
    imp::array::{handle_error, RawArray},
    impl_slice_partial_eq_generic,
    DoubleLenOrMinReserveStrategy, OutOfBoundsError, ReserveStrategy, TryReserveError,
};

mod into_iter;
mod splice;

#[cfg(test)]
mod tests;

pub use into_iter::IntoIter;

use splice::{InPlaceGap, InsertOrder, SpliceBlock};

/// A contiguous growable array type, also known as a dynamic array, or DynArr.
///
/// Dynamic arrays have *O*(1) indexing, amortized *O*(1) push (to the end), and *O*(1) pop (from the back).
///
/// _Note: It was decided to not name this `Vec` as in the standard library, as this is easily confusable with a math vector_
///
/// # Examples
///
/// ```
/// use almost_common::collections::DynArr;
///
/// let mut arr = DynArr::new();
/// arr.push(1);
/// arr.push(2);
///
/// assert_eq!(arr.len(), 2);
/// assert_eq!(arr[0], 1);
///
/// arr[0] = 7;
/// assert_eq!(arr[0], 7);
///
/// arr.extend([1, 2, 3]);
/// assert_eq!(arr, [7, 2, 1, 2, 3]);
/// ```
///
/// The [`dynarr!`] macro is provided for convenient initialization:
///
/// ```
/// use almost_common::dynarr;
///
/// let mut arr1 = dynarr![1, 2, 3];
/// arr1.push(4);
/// let arr2 = dynarr![1, 2, 3, 4];
/// assert_eq!(arr1, arr2);
///
/// let arr = dynarr![0; 5];
/// assert_eq!(arr, [0, 0, 0, 0, 0]);
/// ```
///
/// # Allocators
///
/// Every `DynArr` holds its own allocator by value, all memory for its elements is acquired from and released to that allocator.
/// Whether the allocator moves along with the storage on copy-assignment ([`Clone::clone_from`]), [`move_assign`] and [`swap_with`]
/// is decided by the allocator's propagation constants, see [`Allocator`].
///
/// # Capacity and reallocation
///
/// The capacity of a dynamic array is the amount of space allocated for any future elements that will be added onto the dynamic array.
/// This is not to be confused with the *length* of the dynamic array, which specifies the number of actual elements within the dynamic array.
/// If a dynamic array's length exceeds its capacity, its capacity will automatically be increased, but its elements will have to be reallocated.
///
/// How much the capacity grows is decided by the reserve strategy `R`.
/// The default strategy, [`DoubleLenOrMinReserveStrategy`], grows to either double the current *length*, or the required capacity, whichever is larger.
///
/// # Failure guarantees
///
/// Moving elements into a new block can never fail, so every operation that only has to grow the storage either succeeds completely,
/// or leaves the dynamic array exactly as it was.
/// This also holds for insertions when the construction of an inserted element panics.
/// Operations that have a `try_` variant report allocation failures as a [`TryReserveError`], the panicking variants panic with a description of the error.
///
/// [`move_assign`]: DynArr::move_assign
/// [`swap_with`]: DynArr::swap_with
pub struct DynArr<T, A: Allocator = Mallocator, R: ReserveStrategy = DoubleLenOrMinReserveStrategy> {
    arr: RawArray<T, A, R>,
    len: usize,
}

#[cold]
#[track_caller]
fn insert_assert_failed(index: usize, len: usize) -> ! {
    panic!("insertion index (is {index}) should be <= len (is {len})");
}

#[cold]
#[track_caller]
fn range_start_assert_failed(start: usize, len: usize) -> ! {
    panic!("range start (is {start}) should be <= len (is {len})");
}

#[cold]
#[track_caller]
fn index_assert_failed(index: usize, len: usize) -> ! {
    panic!("index (is {index}) should be < len (is {len})");
}

impl<T> DynArr<T> {
    /// Constructs a new, empty `DynArr<T>`.
    ///
    /// The dynamic array will not allocate until elements are pushed onto it.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self::new_in(Mallocator)
    }

    /// Constructs a new `DynArr<T>` with at least the specified capacity.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity exceeds `isize::MAX` _bytes_, or if the allocation fails.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, Mallocator)
    }

    /// Tries to construct a new `DynArr<T>` with at least the specified capacity.
    pub fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        Self::try_with_capacity_in(capacity, Mallocator)
    }
}

impl<T, A: Allocator, R: ReserveStrategy> DynArr<T, A, R> {

    /// Constructs a new, empty `DynArr<T, A, R>` using the provided allocator.
    ///
    /// The dynamic array will not allocate until elements are pushed onto it.
    #[inline]
    #[must_use]
    pub const fn new_in(alloc: A) -> Self {
        Self { arr: RawArray::new_in(alloc), len: 0 }
    }

    /// Constructs a new `DynArr<T, A, R>` with exactly the specified capacity with the provided allocator.
    ///
    /// It is important to note that although the returned dynamic array has the minimum *capacity* specified, the dynamic array will have a zero length.
    ///
    /// For `DynArr<T, A, R>` where `T` is a zero-sized type, there will be no allocation and the capacity will always be `usize::MAX`.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity exceeds the allocator's maximum size, or if the allocation fails.
    #[must_use]
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        Self { arr: RawArray::with_capacity_in(capacity, alloc), len: 0 }
    }

    /// Tries to construct a new `DynArr<T, A, R>` with exactly the specified capacity with the provided allocator.
    ///
    /// # Errors
    ///
    /// Returns an error if the capacity exceeds the allocator's maximum size, or if the allocator reports an allocation failure.
    pub fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self, TryReserveError> {
        Ok(Self { arr: RawArray::try_with_capacity_in(capacity, alloc)?, len: 0 })
    }

    /// Constructs a `DynArr` with `len` default constructed elements, using the provided allocator.
    pub fn with_len_in(len: usize, alloc: A) -> Self where
        T: Default
    {
        let mut arr = Self::with_capacity_in(len, alloc);
        arr.resize_default(len);
        arr
    }

    /// Constructs a `DynArr` holding the elements produced by `iter`, using the provided allocator.
    pub fn from_iter_in<I: IntoIterator<Item = T>>(iter: I, alloc: A) -> Self {
        let mut arr = Self::new_in(alloc);
        arr.extend(iter);
        arr
    }

    /// Returns the total number of element the dynamic array can hold without reallocating.
    ///
    /// # Example
    ///
    /// ```
    /// use almost_common::collections::DynArr;
    ///
    /// let mut arr = DynArr::with_capacity(10);
    /// arr.push(42);
    /// assert!(arr.capacity() >= 10);
    /// ```
    #[inline]
    pub fn capacity(&self) -> usize {
        self.arr.capacity()
    }

    /// Returns the maximum number of elements the dynamic array could hold, as limited by its allocator.
    #[inline]
    pub fn max_len(&self) -> usize {
        self.arr.max_len()
    }

    /// Returns a reference to the underlying allocator.
    #[inline]
    pub fn allocator(&self) -> &A {
        self.arr.allocator()
    }

    /// Reserves capacity for at least `additional` more elements to be inserted in the given `DynArr<T>`.
    /// The collection may reserve more space to speculatively avoid frequent reallocations.
    /// After calling `reserve`, capacity  will be greater than or equal to `self.len() + additional`.
    /// Does nothing if capacity is already sufficient.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity exceeds the allocator's maximum size, or if the allocation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use almost_common::dynarr;
    ///
    /// let mut arr = dynarr![1];
    /// arr.reserve(10);
    /// assert!(arr.capacity() >= 11);
    /// ```
    pub fn reserve(&mut self, additional: usize) {
        self.arr.reserve(self.len, additional)
    }

    /// Reserves the minimum capacity for at least `additional` more elements to be inserted in the given `DynArr<T>`.
    /// Unlike [`reserve`], this will not deliberately over-allocate to speculatively avoid frequent allocations.
    ///
    /// [`reserve`]: DynArr::reserve
    ///
    /// # Panics
    ///
    /// Panics if the new capacity exceeds the allocator's maximum size, or if the allocation fails.
    pub fn reserve_exact(&mut self, additional: usize) {
        if let Err(err) = self.try_reserve_exact(additional) {
            handle_error(err);
        }
    }

    /// Tries to reserve capacity for at least `additional` more elements to be inserted in the given `DynArr<T>`.
    ///
    /// # Errors
    ///
    /// If the capacity overflows, or the allocator reports a failure, then an error is returned and the dynamic array is left unchanged.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.arr.try_reserve(self.len, additional)
    }

    /// Tries to reserve the minimum capacity for at least `additional` more elements to be inserted in the given `DynArr<T>`.
    ///
    /// # Errors
    ///
    /// If the capacity overflows, or the allocator reports a failure, then an error is returned and the dynamic array is left unchanged.
    pub fn try_reserve_exact(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.arr.try_reserve_exact(self.len, additional)
    }

    /// Shrinks the capacity of the dynamic array to its length.
    ///
    /// An empty dynamic array releases its block completely, otherwise the elements are moved into a block of exactly the right size.
    ///
    /// # Examples
    ///
    /// ```
    /// use almost_common::collections::DynArr;
    ///
    /// let mut arr = DynArr::with_capacity(10);
    /// arr.extend([1, 2, 3]);
    /// arr.shrink_to_fit();
    /// assert_eq!(arr.capacity(), 3);
    /// ```
    pub fn shrink_to_fit(&mut self) {
        if let Err(err) = self.try_shrink_to_fit() {
            handle_error(err);
        }
    }

    /// Tries to shrink the capacity of the dynamic array to its length.
    pub fn try_shrink_to_fit(&mut self) -> Result<(), TryReserveError> {
        if self.capacity() > self.len {
            self.arr.try_shrink(self.len, self.len)?;
        }
        Ok(())
    }

    /// Shrinks the capacity of the dynamic array with a lower bound.
    ///
    /// The capacity will remain at least as large as both the length and the supplied value.
    ///
    /// If the current capacity is less than the lower limit, this is a no-op.
    pub fn shrink_to(&mut self, min_capacity: usize) {
        if self.capacity() > min_capacity {
            if let Err(err) = self.arr.try_shrink(self.len, self.len.max(min_capacity)) {
                handle_error(err);
            }
        }
    }

    /// Shortens the dynamic array, keeping the first `len` elements and dropping the rest.
    ///
    /// If `len` is greater or equal to the dynamic array's current length, this has no effect.
    ///
    /// Note that this method has no effect on the allocated capacity of the dynamic array.
    pub fn truncate(&mut self, len: usize) {
        // Safety:
        // - The slice passed to `drop_in_place` is valid; the `len > self.len` case avoids creating an invalid slice, and
        // - The `len` of the dynamic array is shrunk before calling `drop_in_place` such that no value will be dropped twice
        //   in case `drop_in_place` were to panic once (if it panics twice, the program aborts.)
        unsafe {
            if len >= self.len {
                return;
            }
            let remaining_len = self.len - len;
            let s = ptr::slice_from_raw_parts_mut(self.as_mut_ptr().add(len), remaining_len);
            self.len = len;
            ptr::drop_in_place(s);
        }
    }

    /// Extracts a slice containing the entire dynamic array.
    ///
    /// Equivalent to `&s[..]`.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self
    }

    /// Extracts a mutable slice of the entire dynamic array.
    ///
    /// Equivalent to `&mut s[..]`.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self
    }

    /// Returns a raw pointer to the dynamic array's buffer, or a dangling raw pointer valid for zero sized reads if the dynamic array didn't allocate.
    ///
    /// The caller must ensure that the dynamic array outlives the pointer this function returns, or else it will end up pointing to garbage.
    /// Modifying the dynamic array may cause its buffer to be reallocated, which would also make any pointer to it invalid.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.arr.ptr()
    }

    /// Returns an unsafe mutable pointer to the dynamic array's buffer, or a dangling raw pointer valid for zero sized reads if the dynamic array didn't allocate.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.arr.ptr()
    }

    /// Forces the length of the dynamic array to `new_len`.
    ///
    /// # Safety
    ///
    /// - `new_len` must be less than or equal to [`capacity()`].
    /// - The elements at `old_len..new_len` must be initialized.
    ///
    /// [`capacity()`]: DynArr::capacity
    #[inline]
    pub unsafe fn set_len(&mut self, new_len: usize) {
        debug_assert!(new_len <= self.capacity());
        self.len = new_len;
    }

    /// Returns a reference to the element at `index`, or an [`OutOfBoundsError`] when `index` is past the end.
    ///
    /// # Examples
    ///
    /// ```
    /// use almost_common::{dynarr, collections::OutOfBoundsError};
    ///
    /// let arr = dynarr![10, 20];
    /// assert_eq!(arr.at(1), Ok(&20));
    /// assert_eq!(arr.at(2), Err(OutOfBoundsError { index: 2, len: 2 }));
    /// ```
    pub fn at(&self, index: usize) -> Result<&T, OutOfBoundsError> {
        self.as_slice().get(index).ok_or(OutOfBoundsError { index, len: self.len })
    }

    /// Returns a mutable reference to the element at `index`, or an [`OutOfBoundsError`] when `index` is past the end.
    pub fn at_mut(&mut self, index: usize) -> Result<&mut T, OutOfBoundsError> {
        let len = self.len;
        self.as_mut_slice().get_mut(index).ok_or(OutOfBoundsError { index, len })
    }

    /// Returns the first element, or `None` if the dynamic array is empty.
    #[inline]
    pub fn front(&self) -> Option<&T> {
        self.as_slice().first()
    }

    /// Returns a mutable reference to the first element, or `None` if the dynamic array is empty.
    #[inline]
    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.as_mut_slice().first_mut()
    }

    /// Returns the last element, or `None` if the dynamic array is empty.
    #[inline]
    pub fn back(&self) -> Option<&T> {
        self.as_slice().last()
    }

    /// Returns a mutable reference to the last element, or `None` if the dynamic array is empty.
    #[inline]
    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.as_mut_slice().last_mut()
    }

    /// Inserts an element at position `index` within the dynamic array, shifting all element after it to the right.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`, if the new capacity exceeds the allocator's maximum size, or if the allocation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use almost_common::dynarr;
    ///
    /// let mut arr = dynarr![1, 2, 3];
    /// arr.insert(1, 4);
    /// assert_eq!(arr, [1, 4, 2, 3]);
    /// arr.insert(4, 5);
    /// assert_eq!(arr, [1, 4, 2, 3, 5]);
    /// ```
    ///
    /// # Time complexity
    ///
    /// Takes *O*([`DynArr::len`]) time.
    /// All items after the insertion index must be shifted to the right.
    /// In the worst case, all elements are shifted when the insertion index is 0.
    #[track_caller]
    pub fn insert(&mut self, index: usize, element: T) {
        if let Err(err) = self.try_insert(index, element) {
            handle_error(err);
        }
    }

    /// Tries to insert an element at position `index`, the dynamic array is left unchanged when an error is returned.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    #[track_caller]
    pub fn try_insert(&mut self, index: usize, element: T) -> Result<(), TryReserveError> {
        self.try_insert_exact(index, 1, InsertOrder::Natural, iter::once(element))
    }

    /// Moves all elements produced by `iter` into the dynamic array at position `index`.
    ///
    /// The elements are first collected in a temporary dynamic array (using a clone of this dynamic array's allocator),
    /// after which they are moved into place.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`, if the new capacity exceeds the allocator's maximum size, or if the allocation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use almost_common::dynarr;
    ///
    /// let mut arr = dynarr![1, 5];
    /// arr.insert_iter(1, (2..5).into_iter());
    /// assert_eq!(arr, [1, 2, 3, 4, 5]);
    /// ```
    #[track_caller]
    pub fn insert_iter<I: IntoIterator<Item = T>>(&mut self, index: usize, iter: I) where
        A: Clone
    {
        if let Err(err) = self.try_insert_iter(index, iter) {
            handle_error(err);
        }
    }

    /// Tries to move all elements produced by `iter` into the dynamic array at position `index`.
    ///
    /// The dynamic array is left unchanged when an error is returned.
    #[track_caller]
    pub fn try_insert_iter<I: IntoIterator<Item = T>>(&mut self, index: usize, iter: I) -> Result<(), TryReserveError> where
        A: Clone
    {
        if index > self.len {
            insert_assert_failed(index, self.len);
        }

        let mut tmp = Self::new_in(self.allocator().clone());
        for value in iter {
            tmp.try_push(value)?;
        }
        let count = tmp.len;
        self.try_insert_exact(index, count, InsertOrder::NewFirst, tmp.into_iter())
    }

    /// Inserts `count` elements produced by `values` at `index`.
    ///
    /// `values` needs to produce exactly `count` elements.
    #[track_caller]
    fn try_insert_exact<I>(&mut self, index: usize, count: usize, order: InsertOrder, mut values: I) -> Result<(), TryReserveError> where
        I: Iterator<Item = T>
    {
        let len = self.len;
        if index > len {
            insert_assert_failed(index, len);
        }
        if count == 0 {
            return Ok(());
        }

        if self.arr.needs_to_grow(len, count) {
            // SAFETY: `index <= len` and the first `len` elements are initialized
            let mut block = unsafe { SpliceBlock::new(&mut self.arr, len, index, count, order)? };
            for value in values.by_ref().take(count) {
                block.write(value);
            }
            block.finish();
            self.len = len + count;
        } else {
            // SAFETY: `index <= len` and there is space for `count` more elements
            let mut gap = unsafe { InPlaceGap::open(self, index, count) };
            for value in values.by_ref().take(count) {
                gap.write(value);
            }
            gap.finish();
        }
        Ok(())
    }

    /// Constructs a new element at position `index`, shifting all elements after it to the right.
    ///
    /// The closure receives the elements currently in the dynamic array, so the new element can be built from them,
    /// the new element is built before any element is moved.
    ///
    /// Returns a reference to the new element.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`, if the new capacity exceeds the allocator's maximum size, or if the allocation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use almost_common::dynarr;
    ///
    /// let mut arr = dynarr![1, 2, 3];
    /// let new = arr.emplace(0, |elems| elems[2] * 10);
    /// assert_eq!(*new, 30);
    /// assert_eq!(arr, [30, 1, 2, 3]);
    /// ```
    #[track_caller]
    pub fn emplace<F>(&mut self, index: usize, f: F) -> &mut T where
        F: FnOnce(&[T]) -> T
    {
        match self.try_emplace(index, f) {
            Ok(elem) => elem,
            Err(err) => handle_error(err),
        }
    }

    /// Tries to construct a new element at position `index`, the dynamic array is left unchanged when an error is returned.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    #[track_caller]
    pub fn try_emplace<F>(&mut self, index: usize, f: F) -> Result<&mut T, TryReserveError> where
        F: FnOnce(&[T]) -> T
    {
        let len = self.len;
        if index > len {
            insert_assert_failed(index, len);
        }

        if self.arr.needs_to_grow(len, 1) {
            // The current block stays alive until the new one is installed, so `f` can be run on the old elements
            // and its result can be written directly into its final location.
            // SAFETY: `index <= len` and the first `len` elements are initialized
            let mut block = unsafe { SpliceBlock::new(&mut self.arr, len, index, 1, InsertOrder::NewFirst)? };
            let value = f(block.old_elements());
            block.write(value);
            block.finish();
            self.len = len + 1;
        } else {
            let value = f(self.as_slice());
            // SAFETY: `index <= len` and there is space for 1 more element
            let mut gap = unsafe { InPlaceGap::open(self, index, 1) };
            gap.write(value);
            gap.finish();
        }

        // SAFETY: `index` was just initialized
        Ok(unsafe { &mut *self.as_mut_ptr().add(index) })
    }

    /// Constructs a new element at the back of the dynamic array, see [`DynArr::emplace`].
    ///
    /// # Examples
    ///
    /// ```
    /// use almost_common::dynarr;
    ///
    /// let mut arr = dynarr![1, 2];
    /// arr.emplace_back(|elems| elems.iter().sum());
    /// assert_eq!(arr, [1, 2, 3]);
    /// ```
    pub fn emplace_back<F>(&mut self, f: F) -> &mut T where
        F: FnOnce(&[T]) -> T
    {
        let len = self.len;
        self.emplace(len, f)
    }

    /// Removes and returns the element at position `index` within the dynamic array, shifting all elements after it to the left.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    ///
    /// # Examples
    ///
    /// ```
    /// use almost_common::dynarr;
    ///
    /// let mut arr = dynarr![1, 2, 3];
    /// assert_eq!(arr.remove(1), 2);
    /// assert_eq!(arr, [1, 3]);
    /// ```
    #[track_caller]
    pub fn remove(&mut self, index: usize) -> T {
        let len = self.len;
        if index >= len {
            index_assert_failed(index, len);
        }
        unsafe {
            // infallible
            let ret;
            {
                // the place we are taking from
                let ptr = self.as_mut_ptr().add(index);
                // copy it out, unsafely having a copy of the value on the stack and in the dynamic array at the same time
                ret = ptr::read(ptr);

                // Shift everything down to fill in that spot
                ptr::copy(ptr.add(1), ptr, len - index - 1);
            }
            self.set_len(len - 1);
            ret
        }
    }

    /// Drops the element at position `index`, shifting all elements after it to the left.
    ///
    /// Returns the index of the element that now follows the erased element, which is `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[track_caller]
    pub fn erase_at(&mut self, index: usize) -> usize {
        if index >= self.len {
            index_assert_failed(index, self.len);
        }
        self.erase_range(index..index + 1)
    }

    /// Drops all elements in `range`, shifting all elements after it to the left.
    ///
    /// The end of the range is clamped to the length of the dynamic array, and an empty range does nothing.
    ///
    /// Returns the index of the element that now follows the erased range, which is the start of the range.
    ///
    /// # Panics
    ///
    /// Panics if the start of the range is past the end of the dynamic array.
    ///
    /// # Examples
    ///
    /// ```
    /// use almost_common::dynarr;
    ///
    /// let mut arr = dynarr![1, 2, 3, 4, 5];
    /// assert_eq!(arr.erase_range(1..3), 1);
    /// assert_eq!(arr, [1, 4, 5]);
    ///
    /// arr.erase_range(1..10);
    /// assert_eq!(arr, [1]);
    /// ```
    #[track_caller]
    pub fn erase_range<RA: RangeBounds<usize>>(&mut self, range: RA) -> usize {
        let len = self.len;
        let start = match range.start_bound() {
            Bound::Included(&start) => start,
            Bound::Excluded(&start) => start.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&end) => end.saturating_add(1),
            Bound::Excluded(&end) => end,
            Bound::Unbounded => len,
        }.min(len);

        if start > len {
            range_start_assert_failed(start, len);
        }
        if start >= end {
            return start;
        }

        // Moves the tail over the erased range, also when dropping an erased element panics.
        struct CloseGapOnDrop<'a, T, A: Allocator, R: ReserveStrategy> {
            arr:   &'a mut DynArr<T, A, R>,
            start: usize,
            end:   usize,
            tail:  usize,
        }

        impl<T, A: Allocator, R: ReserveStrategy> Drop for CloseGapOnDrop<'_, T, A, R> {
            fn drop(&mut self) {
                // SAFETY: The tail is still valid and the erased range has been dropped
                unsafe {
                    let p = self.arr.as_mut_ptr();
                    ptr::copy(p.add(self.end), p.add(self.start), self.tail);
                    self.arr.set_len(self.start + self.tail);
                }
            }
        }

        // Only the elements in front of the range are known to be valid while dropping
        self.len = start;
        let mut guard = CloseGapOnDrop { arr: self, start, end, tail: len - end };
        // SAFETY: `[start, end)` is in bounds and never used again
        unsafe {
            let erased = ptr::slice_from_raw_parts_mut(guard.arr.as_mut_ptr().add(start), end - start);
            ptr::drop_in_place(erased);
        }
        drop(guard);
        start
    }

    /// Retains only the elements specified by the predicate.
    ///
    /// In other words, remove all elements `e` for which `f(e)` returns `false`.
    /// This method operates in place, visiting each element exactly once in the original order, and preserves the order of the retained elements.
    ///
    /// # Examples
    ///
    /// ```
    /// use almost_common::dynarr;
    ///
    /// let mut arr = dynarr![1, 2, 3, 4];
    /// arr.retain(|&x| x % 2 == 0);
    /// assert_eq!(arr, [2, 4]);
    /// ```
    pub fn retain<F>(&mut self, mut f: F) where
        F: FnMut(&T) -> bool
    {
        self.retain_mut(|elem| f(elem))
    }

    /// Retains only the elements specified by the predicate, passing a mutable reference to it.
    ///
    /// In other words, remove all elements `e` for which `f(e)` returns `false`.
    /// This method operates in place, visiting each element exactly once in the original order, and preserves the order of the retained elements.
    pub fn retain_mut<F>(&mut self, mut f: F) where
        F: FnMut(&mut T) -> bool
    {
        let original_len = self.len;
        // avoid double drop if the drop guard is not executed, since we may make some holes during the process.
        unsafe { self.set_len(0) };

        // DynArr: [Kept, Kept, Hole, Hole, Hole, Hole, Hole, Unchecked, Unchecked]
        //         |<-                   processed len  ->| ^- next to check
        //                     |<-       deleted cnt    ->|
        //         |<-                   original_len                          ->|
        // Kept: Elements to which the predicate returns true on.
        // Hole: Moved or dropped element slot.
        // Unchecked: Unchecked valid elements.
        //
        // This drop guard will be invoked when predicate or `drop` of elements panicked.
        // It shifts unchecked elements to cover holes and `set_len` to the current length.
        struct BackshiftOnDrop<'a, T, A: Allocator, R: ReserveStrategy> {
            a:             &'a mut DynArr<T, A, R>,
            processed_len: usize,
            deleted_cnt:   usize,
            original_len:  usize,
        }

        impl<T, A: Allocator, R: ReserveStrategy> Drop for BackshiftOnDrop<'_, T, A, R> {
            fn drop(&mut self) {
                if self.deleted_cnt > 0 {
                    // SAFETY: trailing unchecked items must be valid since we never touch them.
                    unsafe {
                        let p = self.a.as_mut_ptr();
                        ptr::copy(
                            p.add(self.processed_len),
                            p.add(self.processed_len - self.deleted_cnt),
                            self.original_len - self.processed_len
                        );
                    }
                }
                // SAFETY: After filling holes, all items are in contiguous memory.
                unsafe {
                    self.a.set_len(self.original_len - self.deleted_cnt);
                }
            }
        }

        let mut g = BackshiftOnDrop { a: self, processed_len: 0, deleted_cnt: 0, original_len };

        while g.processed_len != original_len {
            // SAFETY: Unchecked element must be valid.
            let cur = unsafe { &mut *g.a.as_mut_ptr().add(g.processed_len) };
            if !f(cur) {
                // Advance early to avoid double drop if `drop_in_place` panicked.
                g.processed_len += 1;
                g.deleted_cnt += 1;
                // SAFETY: We never touch this element again after dropped.
                unsafe { ptr::drop_in_place(cur) };
                continue;
            }
            if g.deleted_cnt > 0 {
                // SAFETY: `deleted_cnt` > 0, so the hole slot must not overlap with the current element.
                // We use copy for move, and never touch this element again.
                unsafe {
                    let hole_slot = g.a.as_mut_ptr().add(g.processed_len - g.deleted_cnt);
                    ptr::copy_nonoverlapping(cur, hole_slot, 1);
                }
            }
            g.processed_len += 1;
        }

        // All items are processed.
        drop(g);
    }

    /// Appends an element to the back of the collection.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity exceeds the allocator's maximum size, or if the allocation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use almost_common::dynarr;
    ///
    /// let mut arr = dynarr![1, 2];
    /// arr.push(3);
    /// assert_eq!(arr, [1, 2, 3]);
    /// ```
    ///
    /// # Time complexity
    ///
    /// Takes amortized *O*(1) time.
    /// If the dynamic array's length would exceed its capacity after the push, *O*(*capacity*) time is taken to move the elements to a larger block.
    #[inline]
    pub fn push(&mut self, value: T) {
        if let Err(err) = self.try_push(value) {
            handle_error(err);
        }
    }

    /// Tries to append an element to the back of the collection.
    ///
    /// # Errors
    ///
    /// When the dynamic array needs to grow and fails to, the error is returned and the dynamic array is left unchanged, `value` is dropped.
    #[inline]
    pub fn try_push(&mut self, value: T) -> Result<(), TryReserveError> {
        let len = self.len;
        if len == self.arr.capacity() {
            self.arr.try_reserve(len, 1)?;
        }
        unsafe {
            ptr::write(self.as_mut_ptr().add(len), value);
            self.len = len + 1;
        }
        Ok(())
    }

    /// Removes the last element from a dynamic array and returns it, or [`None`] if it is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use almost_common::dynarr;
    ///
    /// let mut arr = dynarr![1, 2, 3];
    /// assert_eq!(arr.pop(), Some(3));
    /// assert_eq!(arr, [1, 2]);
    /// ```
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            None
        } else {
            unsafe {
                self.len -= 1;
                Some(ptr::read(self.as_ptr().add(self.len)))
            }
        }
    }

    /// Clears the dynamic array, removing all values.
    ///
    /// Note that this method has no effect on the allocated capacity of the dynamic array.
    #[inline]
    pub fn clear(&mut self) {
        self.truncate(0)
    }

    /// Clears the dynamic array and releases its block back to the allocator, leaving it with a capacity of 0.
    pub fn clear_and_release(&mut self) {
        self.truncate(0);
        self.arr.release();
    }

    /// Returns the number of elements in the dynamic array, also referred to as its 'length'.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the dynamic array contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Resizes the `DynArr` in-place so that `len` is equal to `new_len`.
    ///
    /// If `new_len` is greater than `len`, the `DynArr` is extended by the difference, with each additional slot filled with the result of calling the closure `f`.
    /// The return values from `f` will end up in the `DynArr` in the order they have been generated.
    ///
    /// If `new_len` is less than `len`, the `DynArr` is simply truncated.
    ///
    /// # Examples
    ///
    /// ```
    /// use almost_common::dynarr;
    ///
    /// let mut arr = dynarr![1, 2, 3];
    /// let mut i = 4;
    /// arr.resize_with(6, || { let res = i; i *= 2; res });
    /// assert_eq!(arr, [1, 2, 3, 4, 8, 16]);
    /// ```
    pub fn resize_with<F>(&mut self, new_len: usize, f: F) where
        F: FnMut() -> T
    {
        if let Err(err) = self.try_resize_with(new_len, f) {
            handle_error(err);
        }
    }

    /// Tries to resize the `DynArr` in-place so that `len` is equal to `new_len`, see [`DynArr::resize_with`].
    pub fn try_resize_with<F>(&mut self, new_len: usize, f: F) -> Result<(), TryReserveError> where
        F: FnMut() -> T
    {
        let len = self.len;
        if new_len > len {
            self.try_extend_exact(new_len - len, iter::repeat_with(f))
        } else {
            self.truncate(new_len);
            Ok(())
        }
    }

    /// Resizes the `DynArr` in-place so that `len` is equal to `new_len`, new elements are default constructed.
    pub fn resize_default(&mut self, new_len: usize) where
        T: Default
    {
        self.resize_with(new_len, T::default)
    }

    /// Appends `count` elements produced by `values` to the back of the dynamic array.
    ///
    /// If producing an element panics, the elements that were already appended stay in the dynamic array.
    fn try_extend_exact<I>(&mut self, count: usize, values: I) -> Result<(), TryReserveError> where
        I: Iterator<Item = T>
    {
        self.arr.try_reserve(self.len, count)?;
        for value in values.take(count) {
            unsafe {
                ptr::write(self.as_mut_ptr().add(self.len), value);
                // Since next() executes user code which can panic, we have to bump the length after each step.
                self.len += 1;
            }
        }
        Ok(())
    }

    /// Replaces the content of the dynamic array with the elements produced by `iter`.
    ///
    /// Existing elements are assigned the new values in order, remaining values are appended,
    /// and remaining existing elements are dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use almost_common::dynarr;
    ///
    /// let mut arr = dynarr![1, 2, 3];
    /// arr.assign_iter([4, 5]);
    /// assert_eq!(arr, [4, 5]);
    /// arr.assign_iter(6..10);
    /// assert_eq!(arr, [6, 7, 8, 9]);
    /// ```
    pub fn assign_iter<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        if let Err(err) = self.try_assign_iter(iter) {
            handle_error(err);
        }
    }

    /// Tries to replace the content of the dynamic array with the elements produced by `iter`, see [`DynArr::assign_iter`].
    ///
    /// # Errors
    ///
    /// When the dynamic array fails to grow, an error is returned and the elements that were already assigned or appended stay in place.
    pub fn try_assign_iter<I: IntoIterator<Item = T>>(&mut self, iter: I) -> Result<(), TryReserveError> {
        let mut iter = iter.into_iter();
        let mut assigned = 0;
        for slot in self.as_mut_slice() {
            match iter.next() {
                Some(value) => *slot = value,
                None => break,
            }
            assigned += 1;
        }

        if assigned < self.len {
            self.truncate(assigned);
        } else {
            for value in iter {
                self.try_push(value)?;
            }
        }
        Ok(())
    }

    /// Takes the content of the dynamic array, leaving it empty.
    ///
    /// The returned dynamic array uses a clone of the allocator and takes over the current block.
    pub fn take(&mut self) -> Self where
        A: Clone
    {
        let mut taken = Self::new_in(self.allocator().clone());
        taken.arr.swap_block(&mut self.arr);
        mem::swap(&mut taken.len, &mut self.len);
        taken
    }

    /// Moves the content of `other` into a new dynamic array using `alloc`.
    ///
    /// If `alloc` is equal to the allocator of `other`, the block of `other` is taken over.
    /// Otherwise the elements are moved one by one into a new block, `other` is left empty but keeps its capacity.
    ///
    /// # Errors
    ///
    /// Returns an error if a new block could not be allocated, `other` is left unchanged.
    pub fn move_in(other: &mut Self, alloc: A) -> Result<Self, TryReserveError> {
        if alloc.is_equal(other.allocator()) {
            let mut new = Self::new_in(alloc);
            new.arr.swap_block(&mut other.arr);
            mem::swap(&mut new.len, &mut other.len);
            Ok(new)
        } else {
            let mut new = Self::try_with_capacity_in(other.len, alloc)?;
            // SAFETY: `new` has room for all elements of `other`, which no longer owns them afterwards
            unsafe {
                ptr::copy_nonoverlapping(other.as_ptr(), new.as_mut_ptr(), other.len);
                new.set_len(other.len);
                other.set_len(0);
            }
            Ok(new)
        }
    }

    /// Moves the content of `other` into `self`, dropping the current content of `self`.
    ///
    /// When the allocator propagates on move-assignment, or both allocators are equal, the block of `other` is taken over
    /// and `other` is left empty, with a capacity of 0, holding the old allocator and block of `self` (when propagating) after they were released.
    /// Otherwise, the elements of `other` are moved one by one into the storage of `self`, and `other` is left empty but keeps its capacity.
    ///
    /// # Panics
    ///
    /// Panics if `self` needs to grow to hold the elements of `other` and fails to.
    pub fn move_assign(&mut self, other: &mut Self) {
        if let Err(err) = self.try_move_assign(other) {
            handle_error(err);
        }
    }

    /// Tries to move the content of `other` into `self`, see [`DynArr::move_assign`].
    ///
    /// # Errors
    ///
    /// If `self` needs a bigger block to hold the elements of `other` and can't allocate it, an error is returned and both dynamic arrays are left unchanged.
    pub fn try_move_assign(&mut self, other: &mut Self) -> Result<(), TryReserveError> {
        if A::PROPAGATE_ON_MOVE_ASSIGN {
            self.arr.swap_all(&mut other.arr);
            mem::swap(&mut self.len, &mut other.len);
            other.clear_and_release();
            return Ok(());
        }
        if self.allocator().is_equal(other.allocator()) {
            self.arr.swap_block(&mut other.arr);
            mem::swap(&mut self.len, &mut other.len);
            other.clear_and_release();
            return Ok(());
        }

        // Storage can't change hands, so move the elements over one by one
        if other.len > self.capacity() {
            let cap = other.len;
            let block = self.arr.allocate_block(cap)?;

            let len = mem::replace(&mut self.len, 0);
            let old = ptr::slice_from_raw_parts_mut(self.as_mut_ptr(), len);
            // SAFETY: `block` was allocated by our allocator with a capacity of `cap`
            let arr = guard(&mut self.arr, move |arr| unsafe { arr.release_block(block, cap) });
            // SAFETY: `len` was set to 0 beforehand, so the old elements can't be dropped twice
            unsafe { ptr::drop_in_place(old) };
            let arr = ScopeGuard::into_inner(arr);
            // SAFETY: as above, the old elements were dropped and only the old block remains to be released
            unsafe { arr.replace_block(block, cap) };
        } else {
            self.clear();
        }

        // SAFETY: `self` has room for all elements of `other`, which no longer owns them afterwards
        unsafe {
            ptr::copy_nonoverlapping(other.as_ptr(), self.as_mut_ptr(), other.len);
            self.set_len(other.len);
            other.set_len(0);
        }
        Ok(())
    }

    /// Swaps the content of two dynamic arrays in constant time.
    ///
    /// The allocators are swapped as well when the allocator propagates on swap.
    ///
    /// # Panics
    ///
    /// Panics if the allocator doesn't propagate on swap, and the allocators of `self` and `other` are not equal.
    #[track_caller]
    pub fn swap_with(&mut self, other: &mut Self) {
        if A::PROPAGATE_ON_SWAP {
            self.arr.swap_all(&mut other.arr);
        } else {
            if !self.allocator().is_equal(other.allocator()) {
                swap_assert_failed(self.allocator().alloc_id(), other.allocator().alloc_id());
            }
            self.arr.swap_block(&mut other.arr);
        }
        mem::swap(&mut self.len, &mut other.len);
    }
}

#[cold]
#[track_caller]
fn swap_assert_failed(lhs: u16, rhs: u16) -> ! {
    panic!("cannot swap dynamic arrays with unequal allocators that don't propagate on swap (alloc ids {lhs} and {rhs})");
}

impl<T: Clone, A: Allocator, R: ReserveStrategy> DynArr<T, A, R> {
    /// Constructs a `DynArr` with clones of all elements in `slice`, using the provided allocator.
    pub fn from_slice_in(slice: &[T], alloc: A) -> Self {
        let mut arr = Self::with_capacity_in(slice.len(), alloc);
        arr.extend_from_slice(slice);
        arr
    }

    /// Clones the dynamic array into a new dynamic array using `alloc`.
    pub fn clone_in(&self, alloc: A) -> Self {
        Self::from_slice_in(self, alloc)
    }

    /// Resizes the `DynArr` in-place so that `len` is equal to `new_len`.
    ///
    /// If `new_len` is greater than `len`, the `DynArr` is extended by the difference, with each additional slot filled with `value`.
    /// If `new_len` is less than `len`, the `DynArr` is simply truncated.
    ///
    /// # Examples
    ///
    /// ```
    /// use almost_common::dynarr;
    ///
    /// let mut arr = dynarr![1, 2, 3];
    /// arr.resize(5, 0);
    /// assert_eq!(arr, [1, 2, 3, 0, 0]);
    /// arr.resize(2, 0);
    /// assert_eq!(arr, [1, 2]);
    /// ```
    pub fn resize(&mut self, new_len: usize, value: T) {
        if let Err(err) = self.try_resize(new_len, value) {
            handle_error(err);
        }
    }

    /// Tries to resize the `DynArr` in-place so that `len` is equal to `new_len`, see [`DynArr::resize`].
    pub fn try_resize(&mut self, new_len: usize, value: T) -> Result<(), TryReserveError> {
        let len = self.len;
        if new_len > len {
            let count = new_len - len;
            self.try_extend_exact(count, iter::repeat_n(value, count))
        } else {
            self.truncate(new_len);
            Ok(())
        }
    }

    /// Clones and appends all elements in a slice to the `DynArr`.
    pub fn extend_from_slice(&mut self, other: &[T]) {
        if let Err(err) = self.try_extend_exact(other.len(), other.iter().cloned()) {
            handle_error(err);
        }
    }

    /// Inserts `count` clones of `value` at position `index`.
    ///
    /// `value` itself is moved into the last inserted slot.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`, if the new capacity exceeds the allocator's maximum size, or if the allocation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use almost_common::dynarr;
    ///
    /// let mut arr = dynarr![1, 2];
    /// arr.insert_n(1, 3, 0);
    /// assert_eq!(arr, [1, 0, 0, 0, 2]);
    /// ```
    #[track_caller]
    pub fn insert_n(&mut self, index: usize, count: usize, value: T) {
        if let Err(err) = self.try_insert_n(index, count, value) {
            handle_error(err);
        }
    }

    /// Tries to insert `count` clones of `value` at position `index`, the dynamic array is left unchanged when an error is returned.
    #[track_caller]
    pub fn try_insert_n(&mut self, index: usize, count: usize, value: T) -> Result<(), TryReserveError> {
        self.try_insert_exact(index, count, InsertOrder::Natural, iter::repeat_n(value, count))
    }

    /// Inserts clones of all elements in `slice` at position `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`, if the new capacity exceeds the allocator's maximum size, or if the allocation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use almost_common::dynarr;
    ///
    /// let mut arr = dynarr![1, 4];
    /// arr.insert_from_slice(1, &[2, 3]);
    /// assert_eq!(arr, [1, 2, 3, 4]);
    /// ```
    #[track_caller]
    pub fn insert_from_slice(&mut self, index: usize, slice: &[T]) {
        if let Err(err) = self.try_insert_from_slice(index, slice) {
            handle_error(err);
        }
    }

    /// Tries to insert clones of all elements in `slice` at position `index`, the dynamic array is left unchanged when an error is returned.
    #[track_caller]
    pub fn try_insert_from_slice(&mut self, index: usize, slice: &[T]) -> Result<(), TryReserveError> {
        self.try_insert_exact(index, slice.len(), InsertOrder::Natural, slice.iter().cloned())
    }

    /// Inserts a clone of the element at `src` at position `index`.
    ///
    /// # Panics
    ///
    /// Panics if `src` is out of bounds, if `index > len`, if the new capacity exceeds the allocator's maximum size, or if the allocation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use almost_common::dynarr;
    ///
    /// let mut arr = dynarr![1, 2, 3];
    /// arr.insert_from_within(0, 2);
    /// assert_eq!(arr, [3, 1, 2, 3]);
    /// ```
    #[track_caller]
    pub fn insert_from_within(&mut self, index: usize, src: usize) {
        self.insert_n_from_within(index, 1, src)
    }

    /// Inserts `count` clones of the element at `src` at position `index`.
    ///
    /// # Panics
    ///
    /// Panics if `src` is out of bounds, if `index > len`, if the new capacity exceeds the allocator's maximum size, or if the allocation fails.
    #[track_caller]
    pub fn insert_n_from_within(&mut self, index: usize, count: usize, src: usize) {
        if let Err(err) = self.try_insert_n_from_within(index, count, src) {
            handle_error(err);
        }
    }

    /// Tries to insert `count` clones of the element at `src` at position `index`, the dynamic array is left unchanged when an error is returned.
    ///
    /// When the elements are inserted in the current block in front of `src`, the source element would be moved before all clones are made,
    /// so a single clone is made up front from which the inserted elements are cloned.
    /// In all other cases, the clones are made directly from the source element.
    ///
    /// # Panics
    ///
    /// Panics if `src` is out of bounds or if `index > len`.
    #[track_caller]
    pub fn try_insert_n_from_within(&mut self, index: usize, count: usize, src: usize) -> Result<(), TryReserveError> {
        let len = self.len;
        if src >= len {
            index_assert_failed(src, len);
        }
        if index > len {
            insert_assert_failed(index, len);
        }
        if count == 0 {
            return Ok(());
        }

        if self.arr.needs_to_grow(len, count) {
            // SAFETY: `index <= len` and the first `len` elements are initialized
            let mut block = unsafe { SpliceBlock::new(&mut self.arr, len, index, count, InsertOrder::Natural)? };
            for _ in 0..count {
                let value = block.old_elements()[src].clone();
                block.write(value);
            }
            block.finish();
            self.len = len + count;
            Ok(())
        } else if index == len {
            // Nothing moves when appending, so clone straight from the source
            // SAFETY: `index == len` and there is space for `count` more elements
            let mut gap = unsafe { InPlaceGap::open(self, index, count) };
            for _ in 0..count {
                let value = gap.prefix()[src].clone();
                gap.write(value);
            }
            gap.finish();
            Ok(())
        } else {
            let value = self[src].clone();
            self.try_insert_exact(index, count, InsertOrder::Natural, iter::repeat_n(value, count))
        }
    }

    /// Replaces the content of the dynamic array with `count` clones of `value`.
    ///
    /// Existing elements are assigned using [`Clone::clone_from`], new elements are cloned from `value`,
    /// and `value` itself is moved into the last new element.
    /// Elements past `count` are only dropped after all remaining elements were assigned.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity exceeds the allocator's maximum size, or if the allocation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use almost_common::dynarr;
    ///
    /// let mut arr = dynarr![7; 3];
    /// arr.assign_n(5, 2);
    /// assert_eq!(arr, [2, 2, 2, 2, 2]);
    /// ```
    pub fn assign_n(&mut self, count: usize, value: T) {
        if let Err(err) = self.try_assign_n(count, value) {
            handle_error(err);
        }
    }

    /// Tries to replace the content of the dynamic array with `count` clones of `value`, see [`DynArr::assign_n`].
    ///
    /// # Errors
    ///
    /// If the dynamic array needs to grow and fails to, an error is returned and the dynamic array is left unchanged.
    pub fn try_assign_n(&mut self, count: usize, value: T) -> Result<(), TryReserveError> {
        let len = self.len;
        if count > len {
            self.arr.try_reserve(len, count - len)?;
        }

        let overlap = count.min(len);
        for slot in &mut self.as_mut_slice()[..overlap] {
            slot.clone_from(&value);
        }
        if count > len {
            let remaining = count - len;
            self.try_extend_exact(remaining, iter::repeat_n(value, remaining))
        } else {
            self.truncate(count);
            Ok(())
        }
    }

    /// Replaces the content of the dynamic array with clones of the elements in `src`.
    ///
    /// If `src` does not fit in the current block, a new block is filled with clones first and only then replaces the current content.
    /// Otherwise, existing elements are assigned using [`Clone::clone_from`], the rest of `src` is cloned past the current length,
    /// and existing elements past the length of `src` are dropped last.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity exceeds the allocator's maximum size, or if the allocation fails.
    pub fn assign_from_slice(&mut self, src: &[T]) where
        A: Clone
    {
        if let Err(err) = self.try_assign_from_slice(src) {
            handle_error(err);
        }
    }

    /// Tries to replace the content of the dynamic array with clones of the elements in `src`, see [`DynArr::assign_from_slice`].
    ///
    /// # Errors
    ///
    /// If a new block is needed and can't be allocated, an error is returned and the dynamic array is left unchanged.
    pub fn try_assign_from_slice(&mut self, src: &[T]) -> Result<(), TryReserveError> where
        A: Clone
    {
        if src.len() > self.capacity() {
            let mut new = Self::try_with_capacity_in(src.len(), self.allocator().clone())?;
            new.extend_from_slice(src);
            // Hand the old content to `new`, which drops it
            self.arr.swap_block(&mut new.arr);
            mem::swap(&mut self.len, &mut new.len);
            return Ok(());
        }

        let overlap = src.len().min(self.len);
        let (init, tail) = src.split_at(overlap);
        self.as_mut_slice()[..overlap].clone_from_slice(init);
        self.try_extend_exact(tail.len(), tail.iter().cloned())?;
        self.truncate(src.len());
        Ok(())
    }
}

/// Creates a `DynArr` holding `n` clones of `elem`, using the provided allocator.
pub fn from_elem_in<T: Clone, A: Allocator, R: ReserveStrategy>(elem: T, n: usize, alloc: A) -> DynArr<T, A, R> {
    let mut arr = DynArr::with_capacity_in(n, alloc);
    arr.resize(n, elem);
    arr
}

/// Creates a `DynArr` holding `n` clones of `elem`.
pub fn from_elem<T: Clone>(elem: T, n: usize) -> DynArr<T> {
    from_elem_in(elem, n, Mallocator)
}

/// Removes all elements equal to `value`, returning the number of removed elements.
///
/// # Examples
///
/// ```
/// use almost_common::{dynarr, collections};
///
/// let mut arr = dynarr![1, 2, 1, 3];
/// assert_eq!(collections::erase(&mut arr, &1), 2);
/// assert_eq!(arr, [2, 3]);
/// ```
pub fn erase<T: PartialEq, A: Allocator, R: ReserveStrategy>(arr: &mut DynArr<T, A, R>, value: &T) -> usize {
    erase_if(arr, |elem| elem == value)
}

/// Removes all elements for which `pred` returns `true`, returning the number of removed elements.
pub fn erase_if<T, A: Allocator, R: ReserveStrategy, F>(arr: &mut DynArr<T, A, R>, mut pred: F) -> usize where
    F: FnMut(&T) -> bool
{
    let len = arr.len();
    arr.retain(|elem| !pred(elem));
    len - arr.len()
}

/// Swaps the content of 2 dynamic arrays, see [`DynArr::swap_with`].
#[track_caller]
pub fn swap<T, A: Allocator, R: ReserveStrategy>(lhs: &mut DynArr<T, A, R>, rhs: &mut DynArr<T, A, R>) {
    lhs.swap_with(rhs)
}

//--------------------------------------------------------------

impl<T, A: Allocator, R: ReserveStrategy> ops::Deref for DynArr<T, A, R> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &Self::Target {
        unsafe { slice::from_raw_parts(self.as_ptr(), self.len) }
    }
}

impl<T, A: Allocator, R: ReserveStrategy> ops::DerefMut for DynArr<T, A, R> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { slice::from_raw_parts_mut(self.as_mut_ptr(), self.len) }
    }
}

impl<T: Clone, A: Allocator + Clone, R: ReserveStrategy> Clone for DynArr<T, A, R> {
    fn clone(&self) -> Self {
        self.clone_in(self.allocator().clone())
    }

    /// Overwrites the contents of `self` with a clone of the contents of `source`.
    ///
    /// This method is preferred over simply assigning `source.clone()` to `self`, as it avoids reallocation if possible.
    /// Additionally, if the element type `T` overrides `clone_from()`, this will reuse the resources of `self`'s element as well.
    ///
    /// When the allocator propagates on copy-assignment and the allocators differ, the current block is released and the allocator of `source` is cloned first.
    fn clone_from(&mut self, source: &Self) {
        if A::PROPAGATE_ON_COPY_ASSIGN && !self.allocator().is_equal(source.allocator()) {
            self.clear_and_release();
            *self.arr.allocator_mut() = source.allocator().clone();
        }
        self.assign_from_slice(source);
    }
}

impl<T: Hash, A: Allocator, R: ReserveStrategy> Hash for DynArr<T, A, R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Hash::hash(&**self, state)
    }
}

impl<T, I: SliceIndex<[T]>, A: Allocator, R: ReserveStrategy> Index<I> for DynArr<T, A, R> {
    type Output = I::Output;

    fn index(&self, index: I) -> &Self::Output {
        Index::index(&**self, index)
    }
}

impl<T, I: SliceIndex<[T]>, A: Allocator, R: ReserveStrategy> IndexMut<I> for DynArr<T, A, R> {
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        IndexMut::index_mut(&mut **self, index)
    }
}

impl<T, A: Allocator + Default, R: ReserveStrategy> FromIterator<T> for DynArr<T, A, R> {
    #[inline]
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_iter_in(iter, A::default())
    }
}

impl<T, A: Allocator, R: ReserveStrategy> IntoIterator for DynArr<T, A, R> {
    type Item = T;
    type IntoIter = IntoIter<T, A, R>;

    /// Creates a consuming iterator, that is, one that moves each value out of the dynamic array (from start to end).
    /// The dynamic array cannot be used after calling this.
    fn into_iter(self) -> Self::IntoIter {
        let me = ManuallyDrop::new(self);
        // SAFETY: `me` is never used or dropped again, so the `RawArray` is moved into the iterator
        let arr = unsafe { ptr::read(&me.arr) };
        IntoIter { arr, start: 0, end: me.len }
    }
}

impl<'a, T, A: Allocator, R: ReserveStrategy> IntoIterator for &'a DynArr<T, A, R> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, A: Allocator, R: ReserveStrategy> IntoIterator for &'a mut DynArr<T, A, R> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T, A: Allocator, R: ReserveStrategy> Extend<T> for DynArr<T, A, R> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let mut iter = iter.into_iter();
        while let Some(elem) = iter.next() {
            let len = self.len;
            if len == self.capacity() {
                let (lower, _) = iter.size_hint();
                self.reserve(lower.saturating_add(1));
            }
            unsafe {
                ptr::write(self.as_mut_ptr().add(len), elem);
                // Since next() executes user code which can panic, we have to bump the length after each step.
                self.len = len + 1;
            }
        }
    }
}

impl<'a, T: Copy + 'a, A: Allocator, R: ReserveStrategy> Extend<&'a T> for DynArr<T, A, R> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied())
    }
}

impl_slice_partial_eq_generic!([A0: Allocator, A1: Allocator, R0: ReserveStrategy, R1: ReserveStrategy] DynArr<T, A0, R0>, DynArr<U, A1, R1>);
impl_slice_partial_eq_generic!([A: Allocator, R: ReserveStrategy] DynArr<T, A, R>, &[U]);
impl_slice_partial_eq_generic!([A: Allocator, R: ReserveStrategy] DynArr<T, A, R>, &mut [U]);
impl_slice_partial_eq_generic!([A: Allocator, R: ReserveStrategy] &[T], DynArr<U, A, R>);
impl_slice_partial_eq_generic!([A: Allocator, R: ReserveStrategy] &mut [T], DynArr<U, A, R>);
impl_slice_partial_eq_generic!([A: Allocator, R: ReserveStrategy] DynArr<T, A, R>, [U]);
impl_slice_partial_eq_generic!([A: Allocator, R: ReserveStrategy] [T], DynArr<U, A, R>);
impl_slice_partial_eq_generic!([A: Allocator, R: ReserveStrategy, const N: usize] DynArr<T, A, R>, [U; N]);
impl_slice_partial_eq_generic!([A: Allocator, R: ReserveStrategy, const N: usize] [T; N], DynArr<U, A, R>);

impl<T, A0, A1, R0, R1> PartialOrd<DynArr<T, A1, R1>> for DynArr<T, A0, R0> where
    T: PartialOrd,
    A0: Allocator,
    A1: Allocator,
    R0: ReserveStrategy,
    R1: ReserveStrategy
{
    #[inline]
    fn partial_cmp(&self, other: &DynArr<T, A1, R1>) -> Option<core::cmp::Ordering> {
        PartialOrd::partial_cmp(&**self, &**other)
    }
}

impl<T: Eq, A: Allocator, R: ReserveStrategy> Eq for DynArr<T, A, R> {}

impl<T: Ord, A: Allocator, R: ReserveStrategy> Ord for DynArr<T, A, R> {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        Ord::cmp(&**self, &**other)
    }
}

impl<T, A: Allocator, R: ReserveStrategy> Drop for DynArr<T, A, R> {
    fn drop(&mut self) {
        unsafe {
            // use drop for [T]
            // uses a raw slice to refer to the elements of the dynamic array as the weakest necessary type;
            // could avoid question of validity in certain cases
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.as_mut_ptr(), self.len))
        }
        // RawArray handles deallocation
    }
}

impl<T, A: Allocator + Default, R: ReserveStrategy> Default for DynArr<T, A, R> {
    /// Creates an empty `DynArr<T>`.
    ///
    /// The dynamic array will not allocate until elements are pushed onto it.
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T: fmt::Debug, A: Allocator, R: ReserveStrategy> fmt::Debug for DynArr<T, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T, A: Allocator, R: ReserveStrategy> AsRef<[T]> for DynArr<T, A, R> {
    fn as_ref(&self) -> &[T] {
        self
    }
}

impl<T, A: Allocator, R: ReserveStrategy> AsMut<[T]> for DynArr<T, A, R> {
    fn as_mut(&mut self) -> &mut [T] {
        self
    }
}

impl<T: Clone, A: Allocator + Default, R: ReserveStrategy> From<&[T]> for DynArr<T, A, R> {
    /// Allocate a `DynArr<T>` and fill it by cloning `s`'s items.
    fn from(s: &[T]) -> Self {
        Self::from_slice_in(s, A::default())
    }
}

impl<T: Clone, A: Allocator + Default, R: ReserveStrategy, const N: usize> From<&[T; N]> for DynArr<T, A, R> {
    /// Allocate a `DynArr<T>` and fill it by cloning `s`'s items.
    fn from(s: &[T; N]) -> Self {
        Self::from_slice_in(s, A::default())
    }
}

impl<T, A: Allocator + Default, R: ReserveStrategy, const N: usize> From<[T; N]> for DynArr<T, A, R> {
    /// Allocate a `DynArr<T>` and move `s`'s items into it.
    fn from(s: [T; N]) -> Self {
        let mut arr = Self::with_capacity_in(N, A::default());
        let s = ManuallyDrop::new(s);
        // SAFETY: The array is never used or dropped again, so its elements are moved into the dynamic array
        unsafe {
            ptr::copy_nonoverlapping(s.as_ptr(), arr.as_mut_ptr(), N);
            arr.set_len(N);
        }
        arr
    }
}

static_assertions::assert_eq_size!(DynArr<u64>, [usize; 3]);
static_assertions::assert_impl_all!(DynArr<u32>: Send, Sync, Clone, Default);

/// Creates a [`DynArr`] containing the arguments.
///
/// - Create a [`DynArr`] containing a given list of elements:
///
/// ```
/// use almost_common::dynarr;
///
/// let arr = dynarr![1, 2, 3];
/// assert_eq!(arr[0], 1);
/// ```
///
/// - Create a [`DynArr`] from a given element and size:
///
/// ```
/// use almost_common::dynarr;
///
/// let arr = dynarr![1; 3];
/// assert_eq!(arr, [1, 1, 1]);
/// ```
#[macro_export]
macro_rules! dynarr {
    () => {
        <$crate::collections::DynArr<_>>::new()
    };
    ($elem:expr; $n:expr) => {
        $crate::collections::from_elem($elem, $n)
    };
    ($($x:expr),+ $(,)?) => {
        <$crate::collections::DynArr<_>>::from([$($x),+])
    };
}
