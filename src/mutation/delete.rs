//! Deletion engine
//!
//! Three strategies:
//! - detach: remove one entity and every edge touching it; owned children survive
//! - cascade: remove the owned subtree bottom-up, one repository call per edge and node
//! - bulk: same subtree and order as cascade, with edge removals and entity
//!   deletions grouped into batches
//!
//! Traversal follows ownership edges only and keeps a per-call visited set, so
//! cycles and nodes reachable over several ownership paths are handled once.

use crate::error::{EngineResult, MutationError};
use crate::graph::{Edge, EdgeKey, EntityId, EntityType};
use crate::repository::{GraphTransaction, RepositoryResult};
use indexmap::IndexSet;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

/// What a deletion removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionReport {
    pub root: EntityId,
    /// Deleted entities in deletion order (children before parents)
    pub deleted: Vec<EntityId>,
    pub edges_removed: usize,
    /// Mutating repository calls issued
    pub write_calls: usize,
}

impl DeletionReport {
    fn new(root: EntityId) -> Self {
        DeletionReport {
            root,
            deleted: Vec::new(),
            edges_removed: 0,
            write_calls: 0,
        }
    }
}

/// Post-order subtree with the outgoing edges read while walking it
struct Walk {
    order: Vec<EntityId>,
    outgoing: FxHashMap<EntityId, Vec<EdgeKey>>,
}

pub struct DeletionEngine {
    batch_size: usize,
}

impl DeletionEngine {
    pub fn new(batch_size: usize) -> Self {
        DeletionEngine {
            batch_size: batch_size.max(1),
        }
    }

    /// Delete one entity, with or without its owned subtree
    pub fn delete<T: GraphTransaction>(
        &self,
        tx: &mut T,
        entity_type: Option<EntityType>,
        id: &EntityId,
        cascade: bool,
    ) -> EngineResult<DeletionReport> {
        self.require(tx, entity_type, id)?;
        let report = if cascade {
            let order = self.plan(tx, id)?;
            self.cascade(tx, id, order)?
        } else {
            self.detach(tx, id)?
        };
        Ok(report)
    }

    /// Cascading delete with batched repository writes
    pub fn bulk_delete<T: GraphTransaction>(
        &self,
        tx: &mut T,
        entity_type: Option<EntityType>,
        id: &EntityId,
    ) -> EngineResult<DeletionReport> {
        self.require(tx, entity_type, id)?;
        let walk = self.walk(tx, id)?;
        Ok(self.batched(tx, id, walk)?)
    }

    fn require<T: GraphTransaction>(
        &self,
        tx: &T,
        entity_type: Option<EntityType>,
        id: &EntityId,
    ) -> EngineResult<()> {
        let found = tx
            .get_entity(id)?
            .map_or(false, |e| entity_type.map_or(true, |t| e.entity_type == t));
        if !found {
            return Err(MutationError::NotFound(format!(
                "{} {} not found",
                entity_type.map_or("Entity", |t| t.as_str()),
                id
            )));
        }
        Ok(())
    }

    /// Owned subtree of `root` in post-order (every child before its owner)
    pub fn plan<T: GraphTransaction>(
        &self,
        tx: &T,
        root: &EntityId,
    ) -> RepositoryResult<Vec<EntityId>> {
        Ok(self.walk(tx, root)?.order)
    }

    fn walk<T: GraphTransaction>(&self, tx: &T, root: &EntityId) -> RepositoryResult<Walk> {
        let mut visited: FxHashSet<EntityId> = FxHashSet::default();
        let mut outgoing = FxHashMap::default();
        let mut order = Vec::new();
        let mut stack = vec![(root.clone(), false)];

        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            if !visited.insert(id.clone()) {
                continue;
            }

            stack.push((id.clone(), true));
            let edges = tx.edges_from(&id, None)?;
            // Reversed so children are visited in insertion order
            for edge in edges.iter().rev().filter(|e| e.is_ownership()) {
                if !visited.contains(&edge.target) {
                    stack.push((edge.target.clone(), false));
                }
            }
            outgoing.insert(id, edges.iter().map(Edge::key).collect());
        }

        debug!("Planned deletion of {} entities under {}", order.len(), root);
        Ok(Walk { order, outgoing })
    }

    /// Every edge touching an entity, self-loops once
    fn touching<T: GraphTransaction>(tx: &T, id: &EntityId) -> RepositoryResult<Vec<EdgeKey>> {
        let mut keys: Vec<EdgeKey> = tx.edges_from(id, None)?.iter().map(Edge::key).collect();
        keys.extend(Self::incoming(tx, id)?);
        Ok(keys)
    }

    fn incoming<T: GraphTransaction>(tx: &T, id: &EntityId) -> RepositoryResult<Vec<EdgeKey>> {
        Ok(tx
            .edges_to(id, None)?
            .iter()
            .filter(|e| &e.source != id)
            .map(Edge::key)
            .collect())
    }

    fn detach<T: GraphTransaction>(
        &self,
        tx: &mut T,
        id: &EntityId,
    ) -> RepositoryResult<DeletionReport> {
        let mut report = DeletionReport::new(id.clone());
        for key in Self::touching(tx, id)? {
            if tx.remove_edge(&key)? {
                report.edges_removed += 1;
            }
            report.write_calls += 1;
        }
        tx.delete_entity(id)?;
        report.write_calls += 1;
        report.deleted.push(id.clone());

        debug!("Detached {} ({} edges)", id, report.edges_removed);
        Ok(report)
    }

    fn cascade<T: GraphTransaction>(
        &self,
        tx: &mut T,
        root: &EntityId,
        order: Vec<EntityId>,
    ) -> RepositoryResult<DeletionReport> {
        let mut report = DeletionReport::new(root.clone());
        for id in order {
            for key in Self::touching(tx, &id)? {
                if tx.remove_edge(&key)? {
                    report.edges_removed += 1;
                }
                report.write_calls += 1;
            }
            tx.delete_entity(&id)?;
            report.write_calls += 1;
            report.deleted.push(id);
        }

        debug!(
            "Cascade removed {} entities and {} edges under {}",
            report.deleted.len(),
            report.edges_removed,
            root
        );
        Ok(report)
    }

    fn batched<T: GraphTransaction>(
        &self,
        tx: &mut T,
        root: &EntityId,
        mut walk: Walk,
    ) -> RepositoryResult<DeletionReport> {
        let mut report = DeletionReport::new(root.clone());

        // Outgoing edges come from the walk; keys already gone are skipped by the store
        for chunk in walk.order.chunks(self.batch_size) {
            let mut pending: IndexSet<EdgeKey> = IndexSet::new();
            for id in chunk {
                pending.extend(walk.outgoing.remove(id).unwrap_or_default());
                pending.extend(Self::incoming(tx, id)?);
            }

            let pending: Vec<EdgeKey> = pending.into_iter().collect();
            for keys in pending.chunks(self.batch_size) {
                report.edges_removed += tx.remove_edges(keys)?;
                report.write_calls += 1;
            }

            tx.delete_entities(chunk)?;
            report.write_calls += 1;
            report.deleted.extend(chunk.iter().cloned());
        }

        debug!(
            "Bulk removed {} entities and {} edges under {} in {} calls",
            report.deleted.len(),
            report.edges_removed,
            root,
            report.write_calls
        );
        Ok(report)
    }
}
