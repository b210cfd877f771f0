//! Batch import
//!
//! Upserts flattened nodes one at a time. Parents are resolved from the ids assigned
//! earlier in the same run before falling back to the repository, so a pre-ordered
//! batch links every in-batch parent without a second read. A failing node is
//! recorded and the batch moves on.

use crate::error::{MalformedNodeError, NodeError};
use crate::store::{NodeRepository, NodeUpsert, ParentRef, UpsertKind, Upserted};
use crate::tree::node::FlatNode;
use crate::types::{is_root_parent, InternalId, ROOT_PARENT};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A node the importer could not store
#[derive(Debug)]
pub struct NodeFailure {
    /// External id of the node, if it had one
    pub external_id: Option<String>,
    pub error: NodeError,
}

/// Outcome of an import run
#[derive(Debug, Default)]
pub struct ImportResult {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Nodes stored without an internal parent link
    pub pending_parent: Vec<String>,
    pub failures: Vec<NodeFailure>,
}

impl ImportResult {
    /// Nodes seen by the run, successful or not
    pub fn processed(&self) -> usize {
        self.created + self.updated + self.unchanged + self.failures.len()
    }

    pub fn merge(&mut self, other: ImportResult) {
        self.created += other.created;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.pending_parent.extend(other.pending_parent);
        self.failures.extend(other.failures);
    }

    fn record(&mut self, upserted: &Upserted, parent: ParentRef) {
        match upserted.kind {
            UpsertKind::Created => self.created += 1,
            UpsertKind::Updated => self.updated += 1,
            UpsertKind::Unchanged => self.unchanged += 1,
        }
        if parent == ParentRef::Pending && upserted.node.parent_internal_id.is_none() {
            self.pending_parent.push(upserted.node.external_id.clone());
        }
    }
}

/// External id to internal id map for one import run
#[derive(Debug, Default)]
pub struct ImportSession {
    assigned: HashMap<String, InternalId>,
    result: ImportResult,
}

impl ImportSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn result(&self) -> &ImportResult {
        &self.result
    }

    pub fn finish(self) -> ImportResult {
        self.result
    }
}

/// Validate required fields of a flattened node
pub fn validate(node: &FlatNode) -> Result<(), MalformedNodeError> {
    let external_id = node.external_id.trim();
    if external_id.is_empty() || external_id == ROOT_PARENT {
        return Err(MalformedNodeError {
            external_id: None,
            field: "externalId",
        });
    }
    if node.name.trim().is_empty() {
        return Err(MalformedNodeError {
            external_id: Some(external_id.to_string()),
            field: "name",
        });
    }
    Ok(())
}

pub struct BatchImporter {
    repository: Arc<dyn NodeRepository>,
}

impl BatchImporter {
    pub fn new(repository: Arc<dyn NodeRepository>) -> Self {
        Self { repository }
    }

    /// Import an ordered sequence of nodes.
    pub fn import_batch<I>(&self, nodes: I) -> ImportResult
    where
        I: IntoIterator<Item = FlatNode>,
    {
        let mut session = ImportSession::new();
        for node in nodes {
            self.import_node(&mut session, &node);
        }
        let result = session.finish();

        info!(
            scope = %self.repository.scope(),
            created = result.created,
            updated = result.updated,
            unchanged = result.unchanged,
            pending_parent = result.pending_parent.len(),
            failed = result.failures.len(),
            "Import batch finished"
        );
        result
    }

    /// Import one node within `session`, recording success or failure there.
    pub fn import_node(&self, session: &mut ImportSession, node: &FlatNode) {
        if let Err(err) = validate(node) {
            warn!(error = %err, "Rejected malformed node");
            session.result.failures.push(NodeFailure {
                external_id: err.external_id.clone(),
                error: err.into(),
            });
            return;
        }

        let external_id = node.external_id.trim().to_string();
        let outcome = self
            .resolve_parent(session, node)
            .and_then(|parent| {
                let upsert = NodeUpsert::from_flat(node, parent);
                self.repository.upsert(&upsert).map(|upserted| (upserted, parent))
            });

        match outcome {
            Ok((upserted, parent)) => {
                debug!(
                    external_id = %external_id,
                    internal_id = upserted.node.internal_id,
                    parent = ?parent,
                    "Imported node"
                );
                session
                    .assigned
                    .insert(external_id, upserted.node.internal_id);
                session.result.record(&upserted, parent);
            }
            Err(err) => {
                warn!(external_id = %external_id, error = %err, "Failed to import node");
                session.result.failures.push(NodeFailure {
                    external_id: Some(external_id),
                    error: NodeError::Write(err),
                });
            }
        }
    }

    fn resolve_parent(
        &self,
        session: &ImportSession,
        node: &FlatNode,
    ) -> Result<ParentRef, crate::error::StorageError> {
        let parent_external_id = node.parent_external_id.trim();
        if is_root_parent(parent_external_id) {
            return Ok(ParentRef::Root);
        }
        // A node never links to itself; the linker reports it.
        if parent_external_id == node.external_id.trim() {
            return Ok(ParentRef::Pending);
        }
        if let Some(id) = session.assigned.get(parent_external_id) {
            return Ok(ParentRef::Linked(*id));
        }
        Ok(match self.repository.find_by_external_id(parent_external_id)? {
            Some(parent) => ParentRef::Linked(parent.internal_id),
            None => ParentRef::Pending,
        })
    }
}
