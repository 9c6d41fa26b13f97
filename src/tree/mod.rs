//! The config tree.
//!
//! This module handles:
//! - Mapping logical paths onto real files plus keys inside them
//! - Loading files and directories into one tree, once
//! - Re-rooting the tree when a path outside it is requested

pub mod manager;
pub mod node;
pub mod paths;

pub use manager::ConfigTree;
pub use node::Node;
pub use paths::{common_ancestor, normalize, resolve_path, split_real_path};
