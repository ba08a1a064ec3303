//! Stored-versus-live comparison
//!
//! [`compare_descriptors`] compares one column; [`DiffEngine`] classifies a
//! whole live snapshot against the stored tables and columns.

mod comparator;
mod diff;
mod engine;

#[cfg(test)]
mod tests;

pub use comparator::*;
pub use diff::*;
pub use engine::*;
