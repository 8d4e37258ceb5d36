//! In-memory repository with undo-journal transactions

use super::{GraphRepository, GraphTransaction, RepositoryError, RepositoryResult};
use crate::graph::{
    Edge, EdgeKey, EdgeSlot, Entity, EntityId, EntityType, GraphSnapshot, GraphStore,
    Predicate,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockWriteGuard};
use tracing::{debug, warn};

/// Counters describing how the repository has been used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepositoryStats {
    /// Store calls issued from transactions; a batched call counts once
    pub round_trips: u64,
    pub commits: u64,
    pub rollbacks: u64,
}

#[derive(Debug, Default)]
struct Counters {
    round_trips: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
}

impl Counters {
    fn trip(&self) {
        self.round_trips.fetch_add(1, Ordering::Relaxed);
    }
}

/// Reference adapter over a [`GraphStore`]
///
/// A transaction holds the store's write lock until it finishes, so transactions
/// are serialized.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    store: RwLock<GraphStore>,
    counters: Counters,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: GraphStore) -> Self {
        MemoryRepository {
            store: RwLock::new(store),
            counters: Counters::default(),
        }
    }

    pub fn stats(&self) -> RepositoryStats {
        RepositoryStats {
            round_trips: self.counters.round_trips.load(Ordering::Relaxed),
            commits: self.counters.commits.load(Ordering::Relaxed),
            rollbacks: self.counters.rollbacks.load(Ordering::Relaxed),
        }
    }

    pub fn reset_stats(&self) {
        self.counters.round_trips.store(0, Ordering::Relaxed);
        self.counters.commits.store(0, Ordering::Relaxed);
        self.counters.rollbacks.store(0, Ordering::Relaxed);
    }

    /// Committed state of the store
    pub fn snapshot(&self) -> RepositoryResult<GraphSnapshot> {
        let store = self.store.read().map_err(|_| poisoned())?;
        Ok(store.snapshot())
    }

    pub fn entity_count(&self) -> RepositoryResult<usize> {
        Ok(self.store.read().map_err(|_| poisoned())?.entity_count())
    }

    pub fn edge_count(&self) -> RepositoryResult<usize> {
        Ok(self.store.read().map_err(|_| poisoned())?.edge_count())
    }
}

fn poisoned() -> RepositoryError {
    RepositoryError::Unavailable("graph store lock poisoned".to_string())
}

impl GraphRepository for MemoryRepository {
    type Tx<'a> = MemoryTransaction<'a>;

    fn begin(&self) -> RepositoryResult<MemoryTransaction<'_>> {
        let guard = self.store.write().map_err(|_| poisoned())?;
        Ok(MemoryTransaction {
            guard,
            counters: &self.counters,
            journal: Vec::new(),
            finished: false,
        })
    }
}

/// Inverse of one applied change
#[derive(Debug)]
enum UndoEntry {
    RemoveEntity(EntityId),
    /// Previous version of an updated entity
    RestoreEntity(Entity),
    /// Deleted entity and its index in the type listing
    ReinsertEntity(Entity, usize),
    RemoveEdge(EdgeKey),
    RestoreEdge(Edge, EdgeSlot),
}

/// Open transaction on a [`MemoryRepository`]
///
/// Changes are applied to the store directly and recorded in an undo journal;
/// rollback replays the journal backwards.
pub struct MemoryTransaction<'a> {
    guard: RwLockWriteGuard<'a, GraphStore>,
    counters: &'a Counters,
    journal: Vec<UndoEntry>,
    finished: bool,
}

impl MemoryTransaction<'_> {
    /// Number of changes recorded so far
    pub fn pending_changes(&self) -> usize {
        self.journal.len()
    }

    fn undo_all(&mut self) {
        let store = &mut *self.guard;
        while let Some(entry) = self.journal.pop() {
            match entry {
                UndoEntry::RemoveEntity(id) => {
                    if let Err(e) = store.remove_entity(&id) {
                        warn!("Rollback could not remove {}: {}", id, e);
                    }
                }
                UndoEntry::RestoreEntity(entity) => {
                    store.put_entity(entity);
                }
                UndoEntry::ReinsertEntity(entity, position) => {
                    store.restore_entity(entity, position);
                }
                UndoEntry::RemoveEdge(key) => {
                    store.remove_edge(&key);
                }
                UndoEntry::RestoreEdge(edge, slot) => {
                    if let Err(e) = store.restore_edge(edge, slot) {
                        warn!("Rollback could not restore edge: {}", e);
                    }
                }
            }
        }
    }

    fn take_entity(&mut self, id: &EntityId) -> RepositoryResult<()> {
        let removed = self.guard.take_entity(id)?;
        // Edges are restored after their endpoint on rollback
        self.journal.extend(
            removed
                .edges
                .into_iter()
                .map(|(edge, slot)| UndoEntry::RestoreEdge(edge, slot)),
        );
        self.journal
            .push(UndoEntry::ReinsertEntity(removed.entity, removed.position));
        Ok(())
    }

    fn take_edge(&mut self, key: &EdgeKey) -> bool {
        match self.guard.take_edge(key) {
            Some((edge, slot)) => {
                self.journal.push(UndoEntry::RestoreEdge(edge, slot));
                true
            }
            None => false,
        }
    }
}

impl GraphTransaction for MemoryTransaction<'_> {
    fn get_entity(&self, id: &EntityId) -> RepositoryResult<Option<Entity>> {
        self.counters.trip();
        Ok(self.guard.get_entity(id).cloned())
    }

    fn put_entity(&mut self, entity: Entity) -> RepositoryResult<()> {
        self.counters.trip();
        let id = entity.id.clone();
        match self.guard.put_entity(entity) {
            Some(previous) => self.journal.push(UndoEntry::RestoreEntity(previous)),
            None => self.journal.push(UndoEntry::RemoveEntity(id)),
        }
        Ok(())
    }

    fn delete_entity(&mut self, id: &EntityId) -> RepositoryResult<bool> {
        self.counters.trip();
        if !self.guard.has_entity(id) {
            return Ok(false);
        }
        self.take_entity(id)?;
        Ok(true)
    }

    fn add_edge(&mut self, edge: Edge) -> RepositoryResult<bool> {
        self.counters.trip();
        let key = edge.key();
        let inserted = self.guard.insert_edge(edge)?;
        if inserted {
            self.journal.push(UndoEntry::RemoveEdge(key));
        }
        Ok(inserted)
    }

    fn remove_edge(&mut self, key: &EdgeKey) -> RepositoryResult<bool> {
        self.counters.trip();
        Ok(self.take_edge(key))
    }

    fn find_edge(&self, key: &EdgeKey) -> RepositoryResult<Option<Edge>> {
        self.counters.trip();
        Ok(self.guard.edge(key))
    }

    fn edges_from(
        &self,
        id: &EntityId,
        predicate: Option<&Predicate>,
    ) -> RepositoryResult<Vec<Edge>> {
        self.counters.trip();
        Ok(self.guard.edges_from(id, predicate))
    }

    fn edges_to(
        &self,
        id: &EntityId,
        predicate: Option<&Predicate>,
    ) -> RepositoryResult<Vec<Edge>> {
        self.counters.trip();
        Ok(self.guard.edges_to(id, predicate))
    }

    fn entities_of_type(&self, entity_type: EntityType) -> RepositoryResult<Vec<Entity>> {
        self.counters.trip();
        Ok(self
            .guard
            .entities_of_type(entity_type)
            .into_iter()
            .cloned()
            .collect())
    }

    fn remove_edges(&mut self, keys: &[EdgeKey]) -> RepositoryResult<usize> {
        self.counters.trip();
        let mut removed = 0;
        for key in keys {
            if self.take_edge(key) {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn delete_entities(&mut self, ids: &[EntityId]) -> RepositoryResult<usize> {
        self.counters.trip();
        let mut deleted = 0;
        for id in ids {
            if !self.guard.has_entity(id) {
                continue;
            }
            self.take_entity(id)?;
            deleted += 1;
        }
        Ok(deleted)
    }

    fn commit(mut self) -> RepositoryResult<()> {
        debug!("Committing {} changes", self.journal.len());
        self.journal.clear();
        self.finished = true;
        self.counters.commits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn rollback(mut self) -> RepositoryResult<()> {
        self.undo_all();
        self.finished = true;
        self.counters.rollbacks.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl Drop for MemoryTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!(
                "Transaction dropped with {} uncommitted changes, rolling back",
                self.journal.len()
            );
            self.undo_all();
            self.counters.rollbacks.fetch_add(1, Ordering::Relaxed);
        }
    }
}
