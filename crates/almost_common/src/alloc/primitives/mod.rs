mod mallocator;
mod tracking_allocator;

pub use mallocator::*;
pub use tracking_allocator::*;
