//! Tree view builder
//!
//! Reassembles the nested organization tree from the repository's depth-annotated
//! listing. An excluded node is skipped on its own: its children are not reattached
//! to the nearest kept ancestor but come back as detached top-level subtrees.

use crate::error::StorageError;
use crate::store::{NodeRepository, StoredNode, TreeEntry};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// One node of the read-side view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub node: StoredNode,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    fn leaf(node: StoredNode) -> Self {
        Self {
            node,
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, self included
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TreeNode::size).sum::<usize>()
    }

    /// Pre-order walk with depth relative to this node
    pub fn walk(&self) -> Vec<(usize, &TreeNode)> {
        let mut out = Vec::new();
        let mut stack = vec![(0usize, self)];
        while let Some((depth, node)) = stack.pop() {
            out.push((depth, node));
            for child in node.children.iter().rev() {
                stack.push((depth + 1, child));
            }
        }
        out
    }
}

pub struct TreeBuilder {
    repository: Arc<dyn NodeRepository>,
}

impl TreeBuilder {
    pub fn new(repository: Arc<dyn NodeRepository>) -> Self {
        Self { repository }
    }

    /// Build the nested view under `root` (every top-level node when `None`).
    ///
    /// `max_depth` counts levels including the root; 0 is unlimited. Children of an
    /// excluded node are returned as extra top-level subtrees, ordered with the
    /// listing roots by listing position.
    pub fn build_tree(
        &self,
        root: Option<&str>,
        excluded_type_ids: &HashSet<String>,
        max_depth: usize,
    ) -> Result<Vec<TreeNode>, StorageError> {
        let entries = self.repository.list_tree(root, max_depth)?;
        let total = entries.len();
        let roots = assemble(entries, excluded_type_ids);
        debug!(
            scope = %self.repository.scope(),
            listed = total,
            kept = roots.iter().map(TreeNode::size).sum::<usize>(),
            tops = roots.len(),
            excluded = excluded_type_ids.len(),
            "Built tree view"
        );
        Ok(roots)
    }
}

/// An entry whose subtree is still being collected; `None` marks an excluded node.
struct Open {
    depth: usize,
    position: usize,
    node: Option<TreeNode>,
}

/// Nest a pre-order, depth-annotated listing, skipping excluded entries.
fn assemble(entries: Vec<TreeEntry>, excluded: &HashSet<String>) -> Vec<TreeNode> {
    let mut roots: Vec<(usize, TreeNode)> = Vec::new();
    let mut open: Vec<Open> = Vec::new();

    for (position, entry) in entries.into_iter().enumerate() {
        close_until(&mut open, &mut roots, entry.depth);
        let node = if excluded.contains(entry.node.type_id.as_str()) {
            None
        } else {
            Some(TreeNode::leaf(entry.node))
        };
        open.push(Open {
            depth: entry.depth,
            position,
            node,
        });
    }
    close_until(&mut open, &mut roots, 0);

    roots.sort_by_key(|(position, _)| *position);
    roots.into_iter().map(|(_, node)| node).collect()
}

fn close_until(open: &mut Vec<Open>, roots: &mut Vec<(usize, TreeNode)>, depth: usize) {
    while open.last().map(|o| o.depth >= depth).unwrap_or(false) {
        if let Some(Open {
            position,
            node: Some(node),
            ..
        }) = open.pop()
        {
            match open.last_mut().and_then(|parent| parent.node.as_mut()) {
                Some(parent) => parent.children.push(node),
                // Listing root, or the parent was excluded.
                None => roots.push((position, node)),
            }
        }
    }
}
