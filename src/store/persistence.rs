//! Sled-backed node repository
//!
//! Each scope is its own sled tree (`nodes/<scope>`), keyed by external id with
//! bincode-encoded `StoredNode` values. Upserts run inside a sled transaction so the
//! read-merge-write is atomic per key, and every write is flushed before returning.

use crate::error::StorageError;
use crate::store::{NodeRepository, NodeUpsert, StoredNode, UpsertKind, Upserted};
use crate::types::InternalId;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::path::Path;
use tracing::debug;

pub struct SledNodeRepository {
    db: sled::Db,
    tree: sled::Tree,
    scope: String,
}

fn tree_name(scope: &str) -> String {
    format!("nodes/{}", scope)
}

fn encode(node: &StoredNode) -> Result<Vec<u8>, StorageError> {
    Ok(bincode::serialize(node)?)
}

fn decode(bytes: &[u8]) -> Result<StoredNode, StorageError> {
    Ok(bincode::deserialize(bytes)?)
}

fn unwrap_transaction(err: TransactionError<StorageError>) -> StorageError {
    match err {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => StorageError::Database(e),
    }
}

impl SledNodeRepository {
    /// Open (or create) a database at `path` and bind to `scope`
    pub fn open(path: &Path, scope: &str) -> Result<Self, StorageError> {
        std::fs::create_dir_all(path)?;
        let db = sled::open(path)?;
        Self::from_db(db, scope)
    }

    pub fn from_db(db: sled::Db, scope: &str) -> Result<Self, StorageError> {
        let tree = db.open_tree(tree_name(scope))?;
        Ok(Self {
            db,
            tree,
            scope: scope.to_string(),
        })
    }

    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    fn scan(&self) -> Result<Vec<StoredNode>, StorageError> {
        let mut nodes = Vec::new();
        for item in self.tree.iter() {
            let (_, value) = item?;
            nodes.push(decode(&value)?);
        }
        Ok(nodes)
    }
}

impl NodeRepository for SledNodeRepository {
    fn scope(&self) -> &str {
        &self.scope
    }

    fn upsert(&self, upsert: &NodeUpsert) -> Result<Upserted, StorageError> {
        let key = upsert.external_id.as_bytes();
        let result = self
            .tree
            .transaction(|tx| {
                let existing = match tx.get(key)? {
                    Some(bytes) => {
                        Some(decode(&bytes).map_err(ConflictableTransactionError::Abort)?)
                    }
                    None => None,
                };

                let (node, kind) = match existing {
                    Some(existing) => {
                        let merged = existing.merged(upsert);
                        if merged == existing {
                            return Ok(Upserted {
                                node: merged,
                                kind: UpsertKind::Unchanged,
                            });
                        }
                        (merged, UpsertKind::Updated)
                    }
                    None => {
                        // sled ids start at 0; internal id 0 is reserved.
                        let internal_id = tx.generate_id()? + 1;
                        (StoredNode::create(internal_id, upsert), UpsertKind::Created)
                    }
                };

                let bytes = encode(&node).map_err(ConflictableTransactionError::Abort)?;
                tx.insert(key, bytes)?;
                Ok(Upserted { node, kind })
            })
            .map_err(unwrap_transaction)?;

        if result.kind != UpsertKind::Unchanged {
            self.tree.flush()?;
        }

        debug!(
            scope = %self.scope,
            external_id = %result.node.external_id,
            internal_id = result.node.internal_id,
            kind = ?result.kind,
            "Upserted node"
        );
        Ok(result)
    }

    fn find_by_external_id(&self, external_id: &str) -> Result<Option<StoredNode>, StorageError> {
        match self.tree.get(external_id.trim().as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn find_children_by_parent_external_id(
        &self,
        parent_external_id: &str,
    ) -> Result<Vec<StoredNode>, StorageError> {
        let parent_external_id = parent_external_id.trim();
        let mut children: Vec<StoredNode> = self
            .scan()?
            .into_iter()
            .filter(|n| n.parent_external_id == parent_external_id)
            .collect();
        children.sort_by_key(|n| n.internal_id);
        Ok(children)
    }

    fn list_all(&self) -> Result<Vec<StoredNode>, StorageError> {
        let mut nodes = self.scan()?;
        nodes.sort_by_key(|n| n.internal_id);
        Ok(nodes)
    }

    fn set_parent(
        &self,
        external_id: &str,
        parent_internal_id: Option<InternalId>,
    ) -> Result<StoredNode, StorageError> {
        let key = external_id.as_bytes();
        let node = self
            .tree
            .transaction(|tx| {
                let bytes = tx.get(key)?.ok_or_else(|| {
                    ConflictableTransactionError::Abort(StorageError::NodeNotFound(
                        external_id.to_string(),
                    ))
                })?;
                let mut node = decode(&bytes).map_err(ConflictableTransactionError::Abort)?;
                node.parent_internal_id = parent_internal_id;
                let bytes = encode(&node).map_err(ConflictableTransactionError::Abort)?;
                tx.insert(key, bytes)?;
                Ok(node)
            })
            .map_err(unwrap_transaction)?;
        self.tree.flush()?;
        Ok(node)
    }

    fn delete_all(&self) -> Result<usize, StorageError> {
        let removed = self.tree.len();
        self.tree.clear()?;
        self.tree.flush()?;
        Ok(removed)
    }
}
