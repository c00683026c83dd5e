mod imp;

mod dynarr;

use core::{alloc::Layout, fmt};

pub use dynarr::*;

//--------------------------------------------------------------

macro_rules! impl_slice_partial_eq_generic {
    ([$($vars:tt)*] $lhs:ty, $rhs:ty $(where $ty:ty: $bound:ident)?) => {
        impl<T, U, $($vars)*> PartialEq<$rhs> for $lhs  where
            T : PartialEq<U>,
            $($ty: $bound)?
        {
            #[inline]
            fn eq(&self, other: &$rhs) -> bool { self[..] == other[..] }
            #[inline]
            fn ne(&self, other: &$rhs) -> bool { self[..] != other[..] }
        }
    };
}
use impl_slice_partial_eq_generic;

//--------------------------------------------------------------

/// Error returned when a container could not get the memory it needed.
/// 
/// The container is left unchanged when this error is returned.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TryReserveError {
    /// The requested capacity exceeds the maximum the allocator can represent, no allocation was attempted.
    CapacityOverflow,
    /// The allocator failed to provide memory for the given layout.
    AllocError(Layout),
}

impl fmt::Display for TryReserveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("memory allocation failed")?;
        match self {
            TryReserveError::CapacityOverflow => f.write_str(" because the computed capacity exceeded the collection's maximum"),
            TryReserveError::AllocError(layout) => f.write_fmt(format_args!(" because the allocator returned an error (size: {}, align: {})", layout.size(), layout.align())),
        }
    }
}

impl std::error::Error for TryReserveError {}

/// Error returned by checked element access.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct OutOfBoundsError {
    pub index: usize,
    pub len:   usize,
}

impl fmt::Display for OutOfBoundsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("index (is {}) should be < len (is {})", self.index, self.len))
    }
}

impl std::error::Error for OutOfBoundsError {}

//--------------------------------------------------------------

/// A trait used to define a strategy to reserve additional memory for containers.
pub trait ReserveStrategy {
    /// Calculate the new capacity for a container.
    /// 
    /// `len` represents the number of elements currently in the container.
    /// 
    /// `cur_capacity` represents the current capacity of the container.
    /// 
    /// `min_capacity` represents the minimum required capacity to be able to resize.
    /// 
    /// Returns `Err(())` if the capacity were to overflow
    fn calculate(len: usize, cur_capacity: usize, min_capacity: usize) -> Result<usize, ()>;
}

/// A reserve strategy that will return either double the current number of elements, or the minimum required capacity, whichever is bigger.
/// 
/// Growth is based on the occupancy of the container, so a container that over-reserved will not keep growing relative to that reservation.
pub struct DoubleLenOrMinReserveStrategy;

impl ReserveStrategy for DoubleLenOrMinReserveStrategy {
    fn calculate(len: usize, _cur_capacity: usize, min_capacity: usize) -> Result<usize, ()> {
        let double_len = len.checked_mul(2).ok_or(())?;
        let new_cap = if double_len > min_capacity { double_len } else { min_capacity };
        if new_cap <= isize::MAX as usize {
            Ok(new_cap)
        } else {
            Err(())
        }
    }
}

/// A reserve strategy that will try to either return double the current capacity, or the minimum required capacity, whichever is bigger.
pub struct DoubleOrMinReserveStrategy;

impl ReserveStrategy for DoubleOrMinReserveStrategy {
    fn calculate(_len: usize, cur_capacity: usize, min_capacity: usize) -> Result<usize, ()> {
        let double_cap = cur_capacity.checked_mul(2).ok_or(())?;
        let new_cap = if double_cap > min_capacity { double_cap } else { min_capacity };
        if new_cap <= isize::MAX as usize { 
            Ok(new_cap)
        } else {
            Err(())
        }
    }
}

/// A reserve strategy that will return a power of 2 capacity
pub struct Pow2ReserveStrategy;

impl ReserveStrategy for Pow2ReserveStrategy {
    fn calculate(_len: usize, _cur_capacity: usize, min_capacity: usize) -> Result<usize, ()> {
        min_capacity.checked_next_power_of_two().ok_or(())
    }
}
