//! # llrb-rs
//!
//! An ordered map backed by a left-leaning red-black (LLRB) tree whose nodes
//! live in dense parallel arrays indexed by 32-bit slot ids.
//!
//! The layout is built for use as the backing structure of an in-memory
//! database index or ordered cache:
//!
//! - **Arena storage**: keys, values, link records and colors are four
//!   parallel containers addressed by a dense `u32` id. Links are half the
//!   width of pointers on 64-bit targets, teardown is a bulk free, and
//!   removal compacts by swap-with-last so the id space never has holes.
//! - **Allocation discipline**: only construction and [`LlrbTree::reserve`]
//!   allocate. Every other mutating operation assumes pre-reserved capacity,
//!   so the tree can be driven from latency-sensitive sections without
//!   involving the allocator.
//! - **Worst-case logarithmic operations**: point lookup, insert, update,
//!   delete and bounded range enumeration.
//!
//! ## Example
//!
//! ```rust
//! use llrb_rs::LlrbTree;
//!
//! let mut tree: LlrbTree<u64, u64> = LlrbTree::with_capacity(16).unwrap();
//! tree.insert(20, 200).unwrap();
//! tree.insert(10, 100).unwrap();
//! tree.insert(30, 300).unwrap();
//!
//! assert_eq!(tree.get(&10), Some(&100));
//!
//! // Range query over [10, 20], inorder.
//! let keys: Vec<u64> = tree.range_iter(&10, &20).copied().collect();
//! assert_eq!(keys, vec![10, 20]);
//! ```
//!
//! The tree is single-threaded by design: `&mut self` on every mutating
//! operation gives the caller exclusive ownership, and the borrowing
//! iterators make mutation during iteration a compile error.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod arena;
mod delete;
mod iter;
mod tree;

pub use iter::{Iter, RangeIter};
pub use tree::LlrbTree;

use std::collections::TryReserveError;
use thiserror::Error;

/// Errors surfaced by the fallible tree operations.
///
/// Everything else that can go wrong (capacity assumptions, stale slot ids,
/// comparator impurity) is a contract violation checked by debug assertions,
/// not an API error.
#[derive(Debug, Error)]
pub enum LlrbError {
    /// A backing container failed to allocate. Raised only by
    /// [`LlrbTree::with_capacity`] and [`LlrbTree::reserve`]; the tree is
    /// left semantically unchanged.
    #[error("allocation failed: {0}")]
    Allocation(#[from] TryReserveError),

    /// The 32-bit slot id space is exhausted. Raised only by
    /// [`LlrbTree::insert`] on a tree already holding `2^32 - 1` entries;
    /// nothing is mutated.
    #[error("tree full: slot id space exhausted")]
    TreeFull,

    /// [`LlrbTree::update`] was called for a key that is not present.
    #[error("key not found")]
    NotFound,
}

#[cfg(test)]
mod proptests;
