//! Generic containers and helpers

pub mod sorted_set;

pub use sorted_set::SortedSet;
