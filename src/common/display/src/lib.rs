//! Display utilities for Helion.

mod tree;

pub use tree::{DisplayTree, TreeNode};
