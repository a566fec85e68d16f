// model = "claude-opus-4-5"
// created = "2026-08-08"
// modified = "2026-08-08"
// driver = "Isaac Clayton"

//! Canopy - a mutable 2-4 tree with memoized monoid summaries.
//!
//! The tree stores an ordered sequence of opaque leaf payloads and keeps
//! per-subtree summary values (length, line count, checksum, anything
//! expressible as a monoid) incrementally up to date. Structural edits are
//! O(log n), summary reads are O(1) amortized after an O(log n) update.
//! This is the building block underneath a text buffer or rope.
//!
//! # Quick Start
//!
//! ```
//! use canopy::monoid::Count;
//! use canopy::tree::Tree;
//!
//! // Create a tree and a root node
//! let mut tree = Tree::new();
//! let root = tree.internal(&[]).unwrap();
//!
//! // Attach some leaves, rebalancing after each edit
//! for word in ["lorem", "ipsum", "dolor"] {
//!     let leaf = tree.leaf(word.to_string());
//!     tree.push(root, leaf).unwrap();
//!     tree.rebalance(root);
//! }
//!
//! // Query a summary over the whole sequence
//! assert_eq!(tree.aggregate(root, &Count), 3);
//! ```

pub mod error;
mod memo;
pub mod monoid;
pub mod profiling;
pub mod tree;
