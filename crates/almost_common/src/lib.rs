#[cfg(test)]
#[macro_use]
extern crate scopeguard;

pub mod alloc;
pub mod collections;

pub mod prelude;
