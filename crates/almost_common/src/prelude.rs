pub use core::prelude::rust_2021::*;

pub use crate::alloc::{AllocId, Allocator};
pub use crate::alloc::primitives::Mallocator;

pub use crate::collections::{DynArr, TryReserveError, OutOfBoundsError};
pub use crate::dynarr;
