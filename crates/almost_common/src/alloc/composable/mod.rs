mod propagating_allocator;

pub use propagating_allocator::*;
