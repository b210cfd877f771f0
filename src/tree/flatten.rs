//! Tree flattening
//!
//! Walks a nested org chart in pre-order and yields one `FlatNode` per unit, each
//! carrying the external id of the unit that listed it as a child. A parent is always
//! yielded before any of its descendants; the importer relies on that ordering to
//! resolve parents created earlier in the same pass.

use crate::tree::node::{FlatNode, OrgNode};
use crate::types::ROOT_PARENT;

/// Lazy pre-order traversal over one or more roots
pub struct Flatten<'a> {
    stack: Vec<(&'a OrgNode, &'a str)>,
}

impl<'a> Flatten<'a> {
    pub fn new(roots: &'a [OrgNode]) -> Self {
        let stack = roots.iter().rev().map(|root| (root, ROOT_PARENT)).collect();
        Self { stack }
    }
}

impl<'a> Iterator for Flatten<'a> {
    type Item = FlatNode;

    fn next(&mut self) -> Option<Self::Item> {
        let (node, parent) = self.stack.pop()?;
        if let Some(children) = &node.children {
            // Reverse so the first child is popped next.
            for child in children.iter().rev() {
                self.stack.push((child, node.external_id.as_str()));
            }
        }
        Some(FlatNode::from_org(node, parent))
    }
}

/// Flatten a single traversal root
pub fn flatten(root: &OrgNode) -> Vec<FlatNode> {
    Flatten::new(std::slice::from_ref(root)).collect()
}

/// Flatten every top-level unit of a document, in document order
pub fn flatten_document(roots: &[OrgNode]) -> Vec<FlatNode> {
    Flatten::new(roots).collect()
}
