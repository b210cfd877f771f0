//! Parent link reconciliation
//!
//! Walks every stored node of the scope and makes its internal parent link agree
//! with its declared parent external id. Safe to run after any import and on its own
//! as a repair pass. A node whose declared parents lead back to itself is reported as
//! an orphan and left unlinked.

use crate::error::NodeError;
use crate::store::{NodeRepository, StoredNode};
use crate::sync::importer::NodeFailure;
use crate::types::InternalId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a relink pass
#[derive(Debug, Default)]
pub struct RelinkResult {
    pub examined: usize,
    /// Links set or corrected
    pub linked: usize,
    /// Stale links removed from top-level nodes
    pub unlinked: usize,
    /// External ids whose declared parent does not exist
    pub orphaned: Vec<String>,
    pub failures: Vec<NodeFailure>,
}

enum Repair {
    Keep,
    Link(InternalId),
    Clear,
    Orphan { clear: bool },
}

fn declared_parent(
    node: &StoredNode,
    by_external_id: &HashMap<&str, InternalId>,
) -> Option<InternalId> {
    if node.is_top_level() {
        return None;
    }
    by_external_id.get(node.parent_external_id.trim()).copied()
}

/// Internal ids whose chain of declared parents loops back on itself
fn cyclic_ids(parents: &HashMap<InternalId, InternalId>) -> HashSet<InternalId> {
    let mut cyclic = HashSet::new();
    let mut settled: HashSet<InternalId> = HashSet::new();

    for &start in parents.keys() {
        let mut path: Vec<InternalId> = Vec::new();
        let mut current = Some(start);
        while let Some(id) = current {
            if settled.contains(&id) {
                break;
            }
            if let Some(pos) = path.iter().position(|p| *p == id) {
                cyclic.extend(path[pos..].iter().copied());
                break;
            }
            path.push(id);
            current = parents.get(&id).copied();
        }
        settled.extend(path);
    }
    cyclic
}

fn plan(
    node: &StoredNode,
    by_external_id: &HashMap<&str, InternalId>,
    cyclic: &HashSet<InternalId>,
) -> Repair {
    if node.is_top_level() {
        return if node.parent_internal_id.is_some() {
            Repair::Clear
        } else {
            Repair::Keep
        };
    }
    if cyclic.contains(&node.internal_id) {
        return Repair::Orphan {
            clear: node.parent_internal_id.is_some(),
        };
    }
    match by_external_id.get(node.parent_external_id.trim()) {
        Some(&target) if node.parent_internal_id == Some(target) => Repair::Keep,
        Some(&target) => Repair::Link(target),
        None => Repair::Orphan {
            clear: node.parent_internal_id.is_some(),
        },
    }
}

pub struct ParentLinker {
    repository: Arc<dyn NodeRepository>,
}

impl ParentLinker {
    pub fn new(repository: Arc<dyn NodeRepository>) -> Self {
        Self { repository }
    }

    pub fn relink(&self) -> Result<RelinkResult, crate::error::StorageError> {
        let nodes = self.repository.list_all()?;
        let by_external_id: HashMap<&str, InternalId> = nodes
            .iter()
            .map(|n| (n.external_id.as_str(), n.internal_id))
            .collect();
        let parents: HashMap<InternalId, InternalId> = nodes
            .iter()
            .filter_map(|n| declared_parent(n, &by_external_id).map(|p| (n.internal_id, p)))
            .collect();
        let cyclic = cyclic_ids(&parents);

        let mut result = RelinkResult {
            examined: nodes.len(),
            ..RelinkResult::default()
        };

        for node in &nodes {
            let write = match plan(node, &by_external_id, &cyclic) {
                Repair::Keep => continue,
                Repair::Link(target) => {
                    debug!(
                        external_id = %node.external_id,
                        parent_internal_id = target,
                        "Linking node to parent"
                    );
                    self.repository
                        .set_parent(&node.external_id, Some(target))
                        .map(|_| result.linked += 1)
                }
                Repair::Clear => self
                    .repository
                    .set_parent(&node.external_id, None)
                    .map(|_| result.unlinked += 1),
                Repair::Orphan { clear } => {
                    result.orphaned.push(node.external_id.clone());
                    if clear {
                        self.repository
                            .set_parent(&node.external_id, None)
                            .map(|_| ())
                    } else {
                        Ok(())
                    }
                }
            };

            if let Err(err) = write {
                warn!(external_id = %node.external_id, error = %err, "Failed to relink node");
                result.failures.push(NodeFailure {
                    external_id: Some(node.external_id.clone()),
                    error: NodeError::Write(err),
                });
            }
        }

        if !result.orphaned.is_empty() {
            warn!(
                scope = %self.repository.scope(),
                orphaned = result.orphaned.len(),
                "Nodes reference parents that are not stored or loop back"
            );
        }
        info!(
            scope = %self.repository.scope(),
            examined = result.examined,
            linked = result.linked,
            unlinked = result.unlinked,
            orphaned = result.orphaned.len(),
            failed = result.failures.len(),
            "Relink finished"
        );
        Ok(result)
    }
}
