//! Node Store
//!
//! Persisted organization nodes and the repository port the sync engine writes
//! through. Records are keyed by external id inside a named scope; the repository
//! assigns internal ids and owns the create-or-update decision.

pub mod memory;
pub mod persistence;

use crate::error::StorageError;
use crate::tree::node::FlatNode;
use crate::types::{is_root_parent, InternalId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub use memory::InMemoryNodeRepository;
pub use persistence::SledNodeRepository;

/// StoredNode: one organization unit as persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredNode {
    pub internal_id: InternalId,
    pub external_id: String,
    pub name: String,
    pub node_type: String,
    pub type_id: String,
    pub parent_external_id: String,
    pub parent_internal_id: Option<InternalId>,
}

impl StoredNode {
    /// Whether the node declares no parent
    pub fn is_top_level(&self) -> bool {
        is_root_parent(&self.parent_external_id)
    }

    pub(crate) fn create(internal_id: InternalId, upsert: &NodeUpsert) -> Self {
        let parent_internal_id = match upsert.parent {
            ParentRef::Linked(id) => Some(id),
            ParentRef::Root | ParentRef::Pending => None,
        };
        Self {
            internal_id,
            external_id: upsert.external_id.clone(),
            name: upsert.name.clone(),
            node_type: upsert.node_type.clone(),
            type_id: upsert.type_id.clone(),
            parent_external_id: upsert.parent_external_id.clone(),
            parent_internal_id,
        }
    }

    /// Apply an upsert to an existing record, keeping its internal id.
    ///
    /// A pending parent keeps the current link only while the declared parent is
    /// unchanged.
    pub(crate) fn merged(&self, upsert: &NodeUpsert) -> Self {
        let parent_internal_id = match upsert.parent {
            ParentRef::Root => None,
            ParentRef::Linked(id) => Some(id),
            ParentRef::Pending => {
                if self.parent_external_id == upsert.parent_external_id {
                    self.parent_internal_id
                } else {
                    None
                }
            }
        };
        Self {
            internal_id: self.internal_id,
            external_id: self.external_id.clone(),
            name: upsert.name.clone(),
            node_type: upsert.node_type.clone(),
            type_id: upsert.type_id.clone(),
            parent_external_id: upsert.parent_external_id.clone(),
            parent_internal_id,
        }
    }
}

/// Parent reference carried by an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRef {
    /// The node declares no parent
    Root,
    /// The parent resolved to this internal id
    Linked(InternalId),
    /// The parent is declared but not (yet) stored
    Pending,
}

/// Create-or-update request for one external id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeUpsert {
    pub external_id: String,
    pub name: String,
    pub node_type: String,
    pub type_id: String,
    pub parent_external_id: String,
    pub parent: ParentRef,
}

impl NodeUpsert {
    pub fn from_flat(node: &FlatNode, parent: ParentRef) -> Self {
        Self {
            external_id: node.external_id.trim().to_string(),
            name: node.name.clone(),
            node_type: node.node_type.clone(),
            type_id: node.type_id.clone(),
            parent_external_id: node.parent_external_id.trim().to_string(),
            parent,
        }
    }
}

/// What an upsert did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    Created,
    Updated,
    Unchanged,
}

/// Result of a repository upsert
#[derive(Debug, Clone)]
pub struct Upserted {
    pub node: StoredNode,
    pub kind: UpsertKind,
}

/// One row of a depth-annotated tree listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub node: StoredNode,
    /// 0 for the listing root(s)
    pub depth: usize,
}

/// Repository port for organization nodes
///
/// Implementations must make `upsert` atomic per external id. Every method is
/// scoped to the collection the repository instance was opened for.
pub trait NodeRepository: Send + Sync {
    /// Name of the managed collection
    fn scope(&self) -> &str;

    /// Create the node or update it in place, as one durable write.
    fn upsert(&self, upsert: &NodeUpsert) -> Result<Upserted, StorageError>;

    fn find_by_external_id(&self, external_id: &str) -> Result<Option<StoredNode>, StorageError>;

    fn find_children_by_parent_external_id(
        &self,
        parent_external_id: &str,
    ) -> Result<Vec<StoredNode>, StorageError>;

    /// All nodes of the scope, in insertion order
    fn list_all(&self) -> Result<Vec<StoredNode>, StorageError>;

    /// Set or clear the internal parent link of a stored node
    fn set_parent(
        &self,
        external_id: &str,
        parent_internal_id: Option<InternalId>,
    ) -> Result<StoredNode, StorageError>;

    /// Remove every node of the scope, returning how many were removed
    fn delete_all(&self) -> Result<usize, StorageError>;

    /// Pre-order listing along internal parent links.
    ///
    /// `root` is an external id; `None` lists every node without a resolvable
    /// internal parent, then any node those walks never reached (links that loop)
    /// as a root of its own. `max_depth` counts levels including the root, 0 is
    /// unlimited. Siblings come in insertion order.
    fn list_tree(
        &self,
        root: Option<&str>,
        max_depth: usize,
    ) -> Result<Vec<TreeEntry>, StorageError> {
        let mut nodes = self.list_all()?;
        nodes.sort_by_key(|n| n.internal_id);

        let known: HashSet<InternalId> = nodes.iter().map(|n| n.internal_id).collect();
        let mut children: HashMap<Option<InternalId>, Vec<StoredNode>> = HashMap::new();
        for node in &nodes {
            // A link to a node that no longer exists counts as top-level.
            let key = node.parent_internal_id.filter(|id| known.contains(id));
            children.entry(key).or_default().push(node.clone());
        }

        let mut entries = Vec::new();
        let mut visited = HashSet::new();
        match root {
            Some(external_id) => {
                let start = self
                    .find_by_external_id(external_id)?
                    .ok_or_else(|| StorageError::NodeNotFound(external_id.to_string()))?;
                walk_listing(start, &children, max_depth, &mut visited, &mut entries);
            }
            None => {
                for start in children.get(&None).cloned().unwrap_or_default() {
                    walk_listing(start, &children, max_depth, &mut visited, &mut entries);
                }
                for start in nodes {
                    if !visited.contains(&start.internal_id) {
                        walk_listing(start, &children, max_depth, &mut visited, &mut entries);
                    }
                }
            }
        }

        Ok(entries)
    }
}

fn walk_listing(
    start: StoredNode,
    children: &HashMap<Option<InternalId>, Vec<StoredNode>>,
    max_depth: usize,
    visited: &mut HashSet<InternalId>,
    entries: &mut Vec<TreeEntry>,
) {
    let mut stack: Vec<(StoredNode, usize)> = vec![(start, 0)];
    while let Some((node, depth)) = stack.pop() {
        if !visited.insert(node.internal_id) {
            continue;
        }
        if max_depth == 0 || depth + 1 < max_depth {
            if let Some(kids) = children.get(&Some(node.internal_id)) {
                for kid in kids.iter().rev() {
                    stack.push((kid.clone(), depth + 1));
                }
            }
        }
        entries.push(TreeEntry { node, depth });
    }
}
