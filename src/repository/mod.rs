//! Graph repository adapter
//!
//! The mutation engine talks to storage only through [`GraphRepository`] and the
//! [`GraphTransaction`] it hands out. Every engine call runs inside exactly one
//! transaction; infrastructure failures surface as [`RepositoryError`] and are
//! never turned into result envelopes.

pub mod memory;

pub use memory::{MemoryRepository, MemoryTransaction, RepositoryStats};

use crate::graph::{Edge, EdgeKey, Entity, EntityId, EntityType, GraphError, Predicate};
use thiserror::Error;

/// Adapter failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    /// Store unreachable (or its lock poisoned)
    #[error("Repository unavailable: {0}")]
    Unavailable(String),

    /// Transaction aborted by the adapter
    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),

    /// Storage-level integrity error
    #[error("Storage error: {0}")]
    Storage(#[from] GraphError),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// A store that can open transactions
pub trait GraphRepository {
    type Tx<'a>: GraphTransaction
    where
        Self: 'a;

    /// Open a transaction. It stays open until committed, rolled back or dropped;
    /// dropping an unfinished transaction must roll it back.
    fn begin(&self) -> RepositoryResult<Self::Tx<'_>>;
}

/// Transactional CRUD over entities and edges
pub trait GraphTransaction {
    fn get_entity(&self, id: &EntityId) -> RepositoryResult<Option<Entity>>;

    /// Insert or overwrite an entity
    fn put_entity(&mut self, entity: Entity) -> RepositoryResult<()>;

    /// Delete an entity. Returns `false` if it did not exist.
    fn delete_entity(&mut self, id: &EntityId) -> RepositoryResult<bool>;

    /// Insert an edge. Returns `false` if an edge with the same identity exists.
    fn add_edge(&mut self, edge: Edge) -> RepositoryResult<bool>;

    /// Remove an edge. Returns `false` if it was absent.
    fn remove_edge(&mut self, key: &EdgeKey) -> RepositoryResult<bool>;

    fn find_edge(&self, key: &EdgeKey) -> RepositoryResult<Option<Edge>>;

    fn edges_from(
        &self,
        id: &EntityId,
        predicate: Option<&Predicate>,
    ) -> RepositoryResult<Vec<Edge>>;

    fn edges_to(&self, id: &EntityId, predicate: Option<&Predicate>) -> RepositoryResult<Vec<Edge>>;

    fn entities_of_type(&self, entity_type: EntityType) -> RepositoryResult<Vec<Entity>>;

    fn commit(self) -> RepositoryResult<()>
    where
        Self: Sized;

    fn rollback(self) -> RepositoryResult<()>
    where
        Self: Sized;

    fn exists(&self, id: &EntityId) -> RepositoryResult<bool> {
        Ok(self.get_entity(id)?.is_some())
    }

    fn has_edge(&self, key: &EdgeKey) -> RepositoryResult<bool> {
        Ok(self.find_edge(key)?.is_some())
    }

    /// The ownership edge pointing at an entity, if it has an owner
    fn owner_of(&self, id: &EntityId) -> RepositoryResult<Option<Edge>> {
        Ok(self.edges_to(id, None)?.into_iter().find(Edge::is_ownership))
    }

    /// Remove several edges in one call. Returns how many were present.
    fn remove_edges(&mut self, keys: &[EdgeKey]) -> RepositoryResult<usize> {
        let mut removed = 0;
        for key in keys {
            if self.remove_edge(key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Delete several entities in one call. Returns how many existed.
    fn delete_entities(&mut self, ids: &[EntityId]) -> RepositoryResult<usize> {
        let mut deleted = 0;
        for id in ids {
            if self.delete_entity(id)? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}
