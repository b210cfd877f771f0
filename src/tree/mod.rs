//! Organization tree
//!
//! Nested document model, pre-order flattening for the write path and nested
//! view assembly for the read path.

pub mod builder;
pub mod flatten;
pub mod node;

pub use builder::{TreeBuilder, TreeNode};
pub use flatten::{flatten, flatten_document, Flatten};
pub use node::{parse_document, FlatNode, OrgNode};
