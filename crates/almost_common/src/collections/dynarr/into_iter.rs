use core::{
    fmt,
    iter::FusedIterator,
    ptr,
    slice,
};

use crate::{
    alloc::Allocator,
    collections::{imp::array::RawArray, ReserveStrategy},
};

/// An iterator that moves out of a dynamic array.
/// 
/// This `struct` is created by the `into_iter` method on [`DynArr`](super::DynArr).
pub struct IntoIter<T, A: Allocator, R: ReserveStrategy> {
    pub(super) arr:   RawArray<T, A, R>,
    /// Index of the next element yielded from the front
    pub(super) start: usize,
    /// One past the index of the next element yielded from the back
    pub(super) end:   usize,
}

impl<T: fmt::Debug, A: Allocator, R: ReserveStrategy> fmt::Debug for IntoIter<T, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.as_slice()).finish()
    }
}

impl<T, A: Allocator, R: ReserveStrategy> IntoIter<T, A, R> {
    /// Returns the remaining items of this iterator as a slice.
    /// 
    /// # Examples
    /// 
    /// ```
    /// use almost_common::dynarr;
    /// 
    /// let arr = dynarr!['a', 'b', 'c'];
    /// let mut into_iter = arr.into_iter();
    /// assert_eq!(into_iter.as_slice(), &['a', 'b', 'c']);
    /// let _ = into_iter.next().unwrap();
    /// assert_eq!(into_iter.as_slice(), &['b', 'c']);
    /// ```
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: Elements in `[start, end)` have not been moved out yet
        unsafe { slice::from_raw_parts(self.arr.ptr().add(self.start), self.end - self.start) }
    }

    /// Returns the remaining items of this iterator as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: Elements in `[start, end)` have not been moved out yet
        unsafe { slice::from_raw_parts_mut(self.arr.ptr().add(self.start), self.end - self.start) }
    }

    /// Returns a reference to the allocator
    pub fn allocator(&self) -> &A {
        self.arr.allocator()
    }
}

impl<T, A: Allocator, R: ReserveStrategy> Iterator for IntoIter<T, A, R> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        if self.start == self.end {
            None
        } else {
            // SAFETY: `start` is in bounds and never read again after this
            let value = unsafe { ptr::read(self.arr.ptr().add(self.start)) };
            self.start += 1;
            Some(value)
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.end - self.start;
        (len, Some(len))
    }

    #[inline]
    fn count(self) -> usize {
        self.len()
    }
}

impl<T, A: Allocator, R: ReserveStrategy> DoubleEndedIterator for IntoIter<T, A, R> {
    #[inline]
    fn next_back(&mut self) -> Option<T> {
        if self.start == self.end {
            None
        } else {
            self.end -= 1;
            // SAFETY: `end` is in bounds and never read again after this
            Some(unsafe { ptr::read(self.arr.ptr().add(self.end)) })
        }
    }
}

impl<T, A: Allocator, R: ReserveStrategy> ExactSizeIterator for IntoIter<T, A, R> {}

impl<T, A: Allocator, R: ReserveStrategy> FusedIterator for IntoIter<T, A, R> {}

impl<T, A: Allocator, R: ReserveStrategy> Drop for IntoIter<T, A, R> {
    fn drop(&mut self) {
        // SAFETY: Drop the elements that were not yielded, `RawArray` handles deallocation
        unsafe {
            let remaining = ptr::slice_from_raw_parts_mut(self.arr.ptr().add(self.start), self.end - self.start);
            ptr::drop_in_place(remaining);
        }
    }
}
