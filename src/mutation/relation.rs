//! Relationship editor: idempotent add/remove of association edges

use crate::error::{EngineResult, MutationError};
use crate::graph::{Edge, EdgeKey, EntityId, EntityType};
use crate::identity::{Dataset, IdentifierService};
use crate::repository::{GraphTransaction, RepositoryResult};
use crate::schema::{Cardinality, Ownership, RelationDef, SchemaRegistry};
use tracing::debug;

/// Outcome of one edge edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeChange {
    pub edge: EdgeKey,
    /// Whether the edge set changed
    pub changed: bool,
    /// Targets unlinked because the relation holds a single value
    pub replaced: Vec<EntityId>,
}

/// Insert an association edge, replacing the previous association of a
/// single-valued relation. Returns whether the edge was new and which targets
/// were unlinked.
pub(crate) fn insert_association<T: GraphTransaction>(
    tx: &mut T,
    relation: &RelationDef,
    source: &EntityId,
    target: &EntityId,
) -> RepositoryResult<(bool, Vec<EntityId>)> {
    let mut replaced = Vec::new();
    if relation.cardinality == Cardinality::One {
        for edge in tx.edges_from(source, Some(&relation.predicate))? {
            if !edge.is_ownership() && &edge.target != target {
                tx.remove_edge(&edge.key())?;
                replaced.push(edge.target);
            }
        }
    }

    let added = tx.add_edge(Edge::association(
        relation.predicate.clone(),
        source.clone(),
        target.clone(),
    ))?;
    Ok((added, replaced))
}

pub struct RelationEditor<'a> {
    registry: &'a SchemaRegistry,
    ids: &'a dyn IdentifierService,
    dataset: &'a Dataset,
}

impl<'a> RelationEditor<'a> {
    pub fn new(
        registry: &'a SchemaRegistry,
        ids: &'a dyn IdentifierService,
        dataset: &'a Dataset,
    ) -> Self {
        RelationEditor {
            registry,
            ids,
            dataset,
        }
    }

    /// Link `target` to `source` under `predicate`. Linking twice is a no-op.
    ///
    /// `source_type` restricts the source to one entity type; `None` accepts any
    /// type that declares the predicate.
    pub fn add_edge<T: GraphTransaction>(
        &self,
        tx: &mut T,
        source_type: Option<EntityType>,
        predicate: &str,
        source: &str,
        target: &str,
    ) -> EngineResult<EdgeChange> {
        let (relation, source, target) = self.resolve(tx, source_type, predicate, source, target)?;
        let key = EdgeKey::new(relation.predicate.clone(), source.clone(), target.clone());

        if tx.has_edge(&key)? {
            debug!("Edge {} already present", key);
            return Ok(EdgeChange {
                edge: key,
                changed: false,
                replaced: Vec::new(),
            });
        }

        let (changed, replaced) = insert_association(tx, &relation, &source, &target)?;
        debug!("Linked {} (replaced {})", key, replaced.len());
        Ok(EdgeChange {
            edge: key,
            changed,
            replaced,
        })
    }

    /// Unlink `target` from `source`. Removing an absent edge is a no-op;
    /// ownership edges cannot be removed this way.
    pub fn remove_edge<T: GraphTransaction>(
        &self,
        tx: &mut T,
        source_type: Option<EntityType>,
        predicate: &str,
        source: &str,
        target: &str,
    ) -> EngineResult<EdgeChange> {
        let (relation, source, target) = self.resolve(tx, source_type, predicate, source, target)?;
        let key = EdgeKey::new(relation.predicate.clone(), source, target);

        let changed = match tx.find_edge(&key)? {
            None => false,
            Some(edge) if edge.is_ownership() => {
                return Err(MutationError::OwnershipViolation(format!(
                    "{} is owned by {} through '{}'; delete it instead of unlinking",
                    key.target, key.source, key.predicate
                )));
            }
            Some(_) => tx.remove_edge(&key)?,
        };

        debug!("Unlinked {} (changed: {})", key, changed);
        Ok(EdgeChange {
            edge: key,
            changed,
            replaced: Vec::new(),
        })
    }

    /// Check both endpoints and the declared relation
    fn resolve<T: GraphTransaction>(
        &self,
        tx: &T,
        source_type: Option<EntityType>,
        predicate: &str,
        source: &str,
        target: &str,
    ) -> EngineResult<(RelationDef, EntityId, EntityId)> {
        let source_id = self.ids.validate(self.dataset, source)?;
        let target_id = self.ids.validate(self.dataset, target)?;

        let source_entity = tx
            .get_entity(&source_id)?
            .filter(|e| source_type.map_or(true, |t| e.entity_type == t))
            .ok_or_else(|| {
                MutationError::NotFound(format!(
                    "{} {} not found",
                    source_type.map_or("Entity", |t| t.as_str()),
                    source_id
                ))
            })?;
        let target_entity = tx
            .get_entity(&target_id)?
            .ok_or_else(|| MutationError::NotFound(format!("Entity {} not found", target_id)))?;

        let relation = self
            .registry
            .relation(source_entity.entity_type, predicate)?
            .clone();

        if relation.ownership == Ownership::Owned {
            return Err(MutationError::OwnershipViolation(format!(
                "'{}' of {} is a composition; its elements are created nested \
                 and removed by deletion",
                predicate, source_entity.entity_type
            )));
        }
        if target_entity.entity_type != relation.target {
            return Err(MutationError::Validation(format!(
                "'{}' of {} expects {}, got {} {}",
                predicate,
                source_entity.entity_type,
                relation.target,
                target_entity.entity_type,
                target_id
            )));
        }

        Ok((relation, source_id, target_id))
    }
}
