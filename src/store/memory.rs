//! In-memory node repository for offline runs and tests

use crate::error::StorageError;
use crate::store::{NodeRepository, NodeUpsert, StoredNode, UpsertKind, Upserted};
use crate::types::InternalId;
use parking_lot::RwLock;
use std::collections::HashMap;

struct Inner {
    nodes: HashMap<String, StoredNode>,
    next_id: InternalId,
}

pub struct InMemoryNodeRepository {
    scope: String,
    inner: RwLock<Inner>,
}

impl InMemoryNodeRepository {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            inner: RwLock::new(Inner {
                nodes: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().nodes.is_empty()
    }
}

impl NodeRepository for InMemoryNodeRepository {
    fn scope(&self) -> &str {
        &self.scope
    }

    fn upsert(&self, upsert: &NodeUpsert) -> Result<Upserted, StorageError> {
        // Single write lock per upsert keeps create-or-update atomic.
        let mut inner = self.inner.write();
        if let Some(existing) = inner.nodes.get(&upsert.external_id) {
            let merged = existing.merged(upsert);
            if &merged == existing {
                return Ok(Upserted {
                    node: merged,
                    kind: UpsertKind::Unchanged,
                });
            }
            inner
                .nodes
                .insert(upsert.external_id.clone(), merged.clone());
            return Ok(Upserted {
                node: merged,
                kind: UpsertKind::Updated,
            });
        }

        let internal_id = inner.next_id;
        inner.next_id += 1;
        let node = StoredNode::create(internal_id, upsert);
        inner.nodes.insert(upsert.external_id.clone(), node.clone());
        Ok(Upserted {
            node,
            kind: UpsertKind::Created,
        })
    }

    fn find_by_external_id(&self, external_id: &str) -> Result<Option<StoredNode>, StorageError> {
        Ok(self.inner.read().nodes.get(external_id.trim()).cloned())
    }

    fn find_children_by_parent_external_id(
        &self,
        parent_external_id: &str,
    ) -> Result<Vec<StoredNode>, StorageError> {
        let parent_external_id = parent_external_id.trim();
        let mut children: Vec<StoredNode> = self
            .inner
            .read()
            .nodes
            .values()
            .filter(|n| n.parent_external_id == parent_external_id)
            .cloned()
            .collect();
        children.sort_by_key(|n| n.internal_id);
        Ok(children)
    }

    fn list_all(&self) -> Result<Vec<StoredNode>, StorageError> {
        let mut nodes: Vec<StoredNode> = self.inner.read().nodes.values().cloned().collect();
        nodes.sort_by_key(|n| n.internal_id);
        Ok(nodes)
    }

    fn set_parent(
        &self,
        external_id: &str,
        parent_internal_id: Option<InternalId>,
    ) -> Result<StoredNode, StorageError> {
        let mut inner = self.inner.write();
        let node = inner
            .nodes
            .get_mut(external_id)
            .ok_or_else(|| StorageError::NodeNotFound(external_id.to_string()))?;
        node.parent_internal_id = parent_internal_id;
        Ok(node.clone())
    }

    fn delete_all(&self) -> Result<usize, StorageError> {
        let mut inner = self.inner.write();
        let removed = inner.nodes.len();
        inner.nodes.clear();
        Ok(removed)
    }
}
