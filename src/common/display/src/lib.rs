//! Display utilities for Quarry.
//!
//! Renders translated queries as indented trees for EXPLAIN output.

mod tree;

pub use tree::{DisplayTree, TreeNode};
