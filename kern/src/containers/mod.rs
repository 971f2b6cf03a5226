//! Fixed-capacity, allocation-free containers used by the rest of the
//! kernel.
//!
//! None of these types ever reach for `alloc`: every one is backed by a
//! plain array sized by a const generic, matching the "no dynamic
//! allocation of task descriptors beyond a compile-time table" design
//! constraint. The algorithms themselves are kept intentionally simple
//! (linear scans, array-based binary heap) -- the task counts involved are
//! small enough that naive and obviously-correct beats clever.

mod priority_queue;
mod queue;
mod sparse;

pub use priority_queue::PriorityQueue;
pub use queue::Queue;
pub use sparse::SparseArray;

/// Error returned by a container whose fixed capacity has been exhausted.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Full;
