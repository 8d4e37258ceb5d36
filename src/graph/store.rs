//! In-memory graph storage implementation
//!
//! Entities are kept in a hash map keyed by identifier, edges in two adjacency
//! indexes: subject-keyed (`source -> predicate -> target`) and object-keyed
//! (`target -> (predicate, source)`), mirroring the SPO/OSP layout of a triple store.

use super::edge::{Edge, EdgeKey, EdgeKind};
use super::entity::Entity;
use super::property::PropertyMap;
use super::types::{EntityId, EntityType, Predicate};
use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

/// Errors that can occur during graph operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Entity {0} not found")]
    EntityNotFound(EntityId),

    #[error("Invalid edge: source entity {0} does not exist")]
    InvalidEdgeSource(EntityId),

    #[error("Invalid edge: target entity {0} does not exist")]
    InvalidEdgeTarget(EntityId),
}

pub type GraphResult<T> = Result<T, GraphError>;

type PredicateTargets = IndexMap<Predicate, IndexMap<EntityId, EdgeKind>>;

/// In-memory graph storage
///
/// Uses hash maps for O(1) lookup:
/// - entities: EntityId -> Entity
/// - type_index: EntityType -> ids (insertion ordered)
/// - outgoing: source -> predicate -> target -> kind
/// - incoming: target -> (predicate, source)
#[derive(Debug, Default)]
pub struct GraphStore {
    entities: FxHashMap<EntityId, Entity>,
    type_index: HashMap<EntityType, IndexSet<EntityId>>,
    outgoing: FxHashMap<EntityId, PredicateTargets>,
    incoming: FxHashMap<EntityId, IndexSet<(Predicate, EntityId)>>,
    edge_count: usize,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn has_entity(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// Insert or replace an entity, returning the previous version
    pub fn put_entity(&mut self, entity: Entity) -> Option<Entity> {
        let id = entity.id.clone();
        let entity_type = entity.entity_type;
        let previous = self.entities.insert(id.clone(), entity);

        if let Some(prev) = &previous {
            if prev.entity_type != entity_type {
                if let Some(ids) = self.type_index.get_mut(&prev.entity_type) {
                    ids.shift_remove(&id);
                }
            }
        }
        self.type_index.entry(entity_type).or_default().insert(id);

        previous
    }

    /// Remove an entity together with every edge touching it
    ///
    /// Returns the removed entity and the removed edges (outgoing first).
    pub fn remove_entity(&mut self, id: &EntityId) -> GraphResult<(Entity, Vec<Edge>)> {
        let removed = self.take_entity(id)?;
        let edges = removed.edges.into_iter().map(|(edge, _)| edge).collect();
        Ok((removed.entity, edges))
    }

    /// Remove an entity and its touching edges, remembering where each one sat
    /// so that [`GraphStore::restore_entity`] and [`GraphStore::restore_edge`]
    /// can put them back in place
    pub fn take_entity(&mut self, id: &EntityId) -> GraphResult<RemovedEntity> {
        let entity = self
            .entities
            .remove(id)
            .ok_or_else(|| GraphError::EntityNotFound(id.clone()))?;

        let position = self
            .type_index
            .get_mut(&entity.entity_type)
            .and_then(|ids| ids.shift_remove_full(id))
            .map_or(0, |(index, _)| index);

        let mut touching = self.edges_from(id, None);
        touching.extend(self.edges_to(id, None).into_iter().filter(|e| &e.source != id));
        let edges = touching
            .into_iter()
            .filter_map(|edge| self.take_edge(&edge.key()))
            .collect();

        Ok(RemovedEntity {
            entity,
            position,
            edges,
        })
    }

    /// Put a removed entity back at its former position in its type listing
    pub fn restore_entity(&mut self, entity: Entity, position: usize) {
        let ids = self.type_index.entry(entity.entity_type).or_default();
        ids.shift_insert(position.min(ids.len()), entity.id.clone());
        self.entities.insert(entity.id.clone(), entity);
    }

    /// Insert an edge
    ///
    /// Returns `Ok(false)` if an edge with the same identity already exists; the
    /// stored edge (and its kind) is kept.
    pub fn insert_edge(&mut self, edge: Edge) -> GraphResult<bool> {
        self.check_endpoints(&edge)?;

        let targets = self
            .outgoing
            .entry(edge.source.clone())
            .or_default()
            .entry(edge.predicate.clone())
            .or_default();
        if targets.contains_key(&edge.target) {
            return Ok(false);
        }
        targets.insert(edge.target.clone(), edge.kind);

        self.incoming
            .entry(edge.target)
            .or_default()
            .insert((edge.predicate, edge.source));
        self.edge_count += 1;

        Ok(true)
    }

    /// Re-insert a removed edge at the positions recorded in `slot`
    ///
    /// Restores must be applied in the reverse order of the removals for the
    /// positions to line up.
    pub fn restore_edge(&mut self, edge: Edge, slot: EdgeSlot) -> GraphResult<bool> {
        self.check_endpoints(&edge)?;

        let by_predicate = self.outgoing.entry(edge.source.clone()).or_default();
        let predicate = match by_predicate.get_index_of(&edge.predicate) {
            Some(index) => index,
            None => {
                let index = slot.predicate.min(by_predicate.len());
                by_predicate.shift_insert(index, edge.predicate.clone(), IndexMap::new());
                index
            }
        };
        let Some((_, targets)) = by_predicate.get_index_mut(predicate) else {
            return Ok(false);
        };
        if targets.contains_key(&edge.target) {
            return Ok(false);
        }
        targets.shift_insert(slot.target.min(targets.len()), edge.target.clone(), edge.kind);

        let sources = self.incoming.entry(edge.target).or_default();
        sources.shift_insert(slot.incoming.min(sources.len()), (edge.predicate, edge.source));
        self.edge_count += 1;

        Ok(true)
    }

    fn check_endpoints(&self, edge: &Edge) -> GraphResult<()> {
        if !self.entities.contains_key(&edge.source) {
            return Err(GraphError::InvalidEdgeSource(edge.source.clone()));
        }
        if !self.entities.contains_key(&edge.target) {
            return Err(GraphError::InvalidEdgeTarget(edge.target.clone()));
        }
        Ok(())
    }

    /// Remove an edge by identity, returning it if it was present
    pub fn remove_edge(&mut self, key: &EdgeKey) -> Option<Edge> {
        self.take_edge(key).map(|(edge, _)| edge)
    }

    /// Remove an edge by identity, returning it with the positions it occupied
    pub fn take_edge(&mut self, key: &EdgeKey) -> Option<(Edge, EdgeSlot)> {
        let by_predicate = self.outgoing.get_mut(&key.source)?;
        let (predicate, _, targets) = by_predicate.get_full_mut(&key.predicate)?;
        let (target, _, kind) = targets.shift_remove_full(&key.target)?;

        if targets.is_empty() {
            by_predicate.shift_remove_index(predicate);
        }
        if by_predicate.is_empty() {
            self.outgoing.remove(&key.source);
        }

        let mut incoming = 0;
        if let Some(sources) = self.incoming.get_mut(&key.target) {
            if let Some((index, _)) =
                sources.shift_remove_full(&(key.predicate.clone(), key.source.clone()))
            {
                incoming = index;
            }
            if sources.is_empty() {
                self.incoming.remove(&key.target);
            }
        }
        self.edge_count -= 1;

        let edge = Edge::new(
            key.predicate.clone(),
            key.source.clone(),
            key.target.clone(),
            kind,
        );
        let slot = EdgeSlot {
            predicate,
            target,
            incoming,
        };
        Some((edge, slot))
    }

    /// Look up an edge by identity
    pub fn edge(&self, key: &EdgeKey) -> Option<Edge> {
        let kind = self
            .outgoing
            .get(&key.source)?
            .get(&key.predicate)?
            .get(&key.target)?;
        Some(Edge::new(
            key.predicate.clone(),
            key.source.clone(),
            key.target.clone(),
            *kind,
        ))
    }

    /// Outgoing edges of an entity, optionally restricted to one predicate
    pub fn edges_from(&self, id: &EntityId, predicate: Option<&Predicate>) -> Vec<Edge> {
        let Some(by_predicate) = self.outgoing.get(id) else {
            return Vec::new();
        };

        by_predicate
            .iter()
            .filter(|(p, _)| predicate.map_or(true, |wanted| *p == wanted))
            .flat_map(|(p, targets)| {
                targets.iter().map(move |(target, kind)| {
                    Edge::new(p.clone(), id.clone(), target.clone(), *kind)
                })
            })
            .collect()
    }

    /// Incoming edges of an entity, optionally restricted to one predicate
    pub fn edges_to(&self, id: &EntityId, predicate: Option<&Predicate>) -> Vec<Edge> {
        let Some(sources) = self.incoming.get(id) else {
            return Vec::new();
        };

        sources
            .iter()
            .filter(|(p, _)| predicate.map_or(true, |wanted| p == wanted))
            .filter_map(|(p, source)| {
                self.edge(&EdgeKey::new(p.clone(), source.clone(), id.clone()))
            })
            .collect()
    }

    /// Entities of one type in insertion order
    pub fn entities_of_type(&self, entity_type: EntityType) -> Vec<&Entity> {
        self.type_index
            .get(&entity_type)
            .map(|ids| ids.iter().filter_map(|id| self.entities.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.type_index.clear();
        self.outgoing.clear();
        self.incoming.clear();
        self.edge_count = 0;
    }

    /// Observable state of the store: entity types and fields plus the edge set.
    /// Versions and timestamps are excluded.
    pub fn snapshot(&self) -> GraphSnapshot {
        let entities = self
            .entities
            .values()
            .map(|e| (e.id.clone(), (e.entity_type, e.fields.clone())))
            .collect();

        let edges = self
            .outgoing
            .iter()
            .flat_map(|(source, by_predicate)| {
                by_predicate.iter().flat_map(move |(p, targets)| {
                    targets.iter().map(move |(target, kind)| {
                        (EdgeKey::new(p.clone(), source.clone(), target.clone()), *kind)
                    })
                })
            })
            .collect();

        GraphSnapshot { entities, edges }
    }
}

/// Positions an edge held in the ordered indexes before it was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeSlot {
    predicate: usize,
    target: usize,
    incoming: usize,
}

/// An entity taken out of a [`GraphStore`] with its touching edges
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedEntity {
    pub entity: Entity,
    /// Index within its type listing
    pub position: usize,
    /// Touching edges in removal order
    pub edges: Vec<(Edge, EdgeSlot)>,
}

/// Order-independent picture of a graph, comparable across stores
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphSnapshot {
    pub entities: BTreeMap<EntityId, (EntityType, PropertyMap)>,
    pub edges: BTreeSet<(EdgeKey, EdgeKind)>,
}

impl GraphSnapshot {
    /// Check whether any edge mentions the given entity
    pub fn references(&self, id: &EntityId) -> bool {
        self.edges
            .iter()
            .any(|(key, _)| &key.source == id || &key.target == id)
    }
}
