//! Upsert engine
//!
//! Turns one nested [`EntityInput`] into entity creations, merges and edge
//! writes. Each node of the input is matched by identity: a node without an id
//! is created, a node with an id updates the existing entity. Within a node,
//! nested elements are processed before references.

use super::input::{EntityInput, InputValue};
use super::relation::insert_association;
use crate::error::{EngineResult, MutationError};
use crate::graph::{Edge, EdgeKey, Entity, EntityId, EntityType, PropertyValue};
use crate::identity::{Dataset, IdentifierService};
use crate::repository::GraphTransaction;
use crate::schema::{Cardinality, FieldKind, RelationDef, SchemaRegistry, TypeSchema};
use tracing::debug;

/// What an upsert wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Root entity of the input tree
    pub id: EntityId,
    /// Created entities, parents before children
    pub created: Vec<EntityId>,
    /// Updated entities
    pub updated: Vec<EntityId>,
    pub edges_added: usize,
    pub edges_removed: usize,
}

#[derive(Debug, Default)]
struct Tally {
    created: Vec<EntityId>,
    updated: Vec<EntityId>,
    edges_added: usize,
    edges_removed: usize,
}

impl Tally {
    fn finish(self, id: EntityId) -> UpsertOutcome {
        UpsertOutcome {
            id,
            created: self.created,
            updated: self.updated,
            edges_added: self.edges_added,
            edges_removed: self.edges_removed,
        }
    }
}

/// Input of one node, checked against its type schema
struct NodePlan<'i, 's> {
    scalars: Vec<(&'i str, PropertyValue)>,
    relations: Vec<(&'s RelationDef, Vec<&'i InputValue>)>,
}

pub struct UpsertEngine<'a> {
    registry: &'a SchemaRegistry,
    ids: &'a dyn IdentifierService,
    dataset: &'a Dataset,
    max_depth: usize,
}

impl<'a> UpsertEngine<'a> {
    pub fn new(
        registry: &'a SchemaRegistry,
        ids: &'a dyn IdentifierService,
        dataset: &'a Dataset,
        max_depth: usize,
    ) -> Self {
        UpsertEngine {
            registry,
            ids,
            dataset,
            max_depth,
        }
    }

    /// Create or update, depending on whether the input carries an id
    pub fn upsert<T: GraphTransaction>(
        &self,
        tx: &mut T,
        entity_type: EntityType,
        input: &EntityInput,
    ) -> EngineResult<UpsertOutcome> {
        match &input.id {
            Some(id) => {
                let id = self.ids.validate(self.dataset, id)?;
                self.update(tx, entity_type, &id, input)
            }
            None => self.create(tx, entity_type, input),
        }
    }

    /// Create a new entity tree
    pub fn create<T: GraphTransaction>(
        &self,
        tx: &mut T,
        entity_type: EntityType,
        input: &EntityInput,
    ) -> EngineResult<UpsertOutcome> {
        if input.id.is_some() {
            return Err(MutationError::Validation(format!(
                "Cannot create {} with a caller-supplied id",
                entity_type
            )));
        }
        let mut tally = Tally::default();
        let id = self.create_node(tx, entity_type, input, 0, &mut tally)?;
        Ok(tally.finish(id))
    }

    /// Merge the input into an existing entity tree
    pub fn update<T: GraphTransaction>(
        &self,
        tx: &mut T,
        entity_type: EntityType,
        id: &EntityId,
        input: &EntityInput,
    ) -> EngineResult<UpsertOutcome> {
        if let Some(given) = &input.id {
            if given != id.as_str() {
                return Err(MutationError::Validation(format!(
                    "Input id {} does not match {}",
                    given, id
                )));
            }
        }
        let mut tally = Tally::default();
        self.update_node(tx, entity_type, id, input, 0, &mut tally)?;
        Ok(tally.finish(id.clone()))
    }

    fn plan<'i, 's>(
        &self,
        schema: &'s TypeSchema,
        input: &'i EntityInput,
    ) -> EngineResult<NodePlan<'i, 's>> {
        let entity_type = schema.entity_type;
        let mut plan = NodePlan {
            scalars: Vec::new(),
            relations: Vec::new(),
        };

        for (name, value) in &input.values {
            let field = schema.field(name).ok_or_else(|| {
                MutationError::Validation(format!("{} has no field '{}'", entity_type, name))
            })?;

            match &field.kind {
                FieldKind::Scalar(_) => {
                    let scalar = value.to_property().ok_or_else(|| {
                        MutationError::Validation(format!(
                            "Field '{}' of {} expects a scalar value",
                            name, entity_type
                        ))
                    })?;
                    self.registry.check_scalar(entity_type, name, &scalar)?;
                    plan.scalars.push((name.as_str(), scalar));
                }
                FieldKind::Relation(relation) => {
                    let elements = value.elements();
                    if relation.cardinality == Cardinality::One && elements.len() > 1 {
                        return Err(MutationError::Validation(format!(
                            "Field '{}' of {} holds a single value, got {}",
                            name,
                            entity_type,
                            elements.len()
                        )));
                    }
                    plan.relations.push((relation, elements));
                }
            }
        }

        Ok(plan)
    }

    fn check_depth(&self, entity_type: EntityType, depth: usize) -> EngineResult<()> {
        if depth > self.max_depth {
            return Err(MutationError::Validation(format!(
                "{} nested deeper than {} levels",
                entity_type, self.max_depth
            )));
        }
        Ok(())
    }

    fn create_node<T: GraphTransaction>(
        &self,
        tx: &mut T,
        entity_type: EntityType,
        input: &EntityInput,
        depth: usize,
        tally: &mut Tally,
    ) -> EngineResult<EntityId> {
        self.check_depth(entity_type, depth)?;
        let schema = self.registry.get(entity_type)?;
        let plan = self.plan(schema, input)?;

        for required in schema.required_fields() {
            let present = plan
                .scalars
                .iter()
                .any(|(name, value)| *name == required && !value.is_null());
            if !present {
                return Err(MutationError::Validation(format!(
                    "Field '{}' of {} is required",
                    required, entity_type
                )));
            }
        }

        let id = self.ids.new_id(self.dataset, entity_type);
        if tx.exists(&id)? {
            return Err(MutationError::Conflict(format!(
                "Identifier {} is already taken",
                id
            )));
        }

        let mut entity = Entity::new(id.clone(), entity_type);
        for (name, value) in plan.scalars {
            if !value.is_null() {
                entity.set_field(name, value);
            }
        }
        tx.put_entity(entity)?;
        debug!("Created {} {}", entity_type, id);
        tally.created.push(id.clone());

        self.apply_relations(tx, &id, entity_type, &plan.relations, depth, tally)?;
        Ok(id)
    }

    fn update_node<T: GraphTransaction>(
        &self,
        tx: &mut T,
        entity_type: EntityType,
        id: &EntityId,
        input: &EntityInput,
        depth: usize,
        tally: &mut Tally,
    ) -> EngineResult<()> {
        self.check_depth(entity_type, depth)?;
        let schema = self.registry.get(entity_type)?;
        let plan = self.plan(schema, input)?;

        let mut entity = tx
            .get_entity(id)?
            .filter(|e| e.entity_type == entity_type)
            .ok_or_else(|| MutationError::NotFound(format!("{} {} not found", entity_type, id)))?;

        if !plan.scalars.is_empty() {
            for (name, value) in plan.scalars {
                if value.is_null() {
                    entity.remove_field(name);
                } else {
                    entity.set_field(name, value);
                }
            }
            entity.touch();
            tx.put_entity(entity)?;
        }
        debug!("Updated {} {}", entity_type, id);
        tally.updated.push(id.clone());

        self.apply_relations(tx, id, entity_type, &plan.relations, depth, tally)
    }

    fn apply_relations<T: GraphTransaction>(
        &self,
        tx: &mut T,
        owner: &EntityId,
        owner_type: EntityType,
        relations: &[(&RelationDef, Vec<&InputValue>)],
        depth: usize,
        tally: &mut Tally,
    ) -> EngineResult<()> {
        // Nested elements first
        for (relation, elements) in relations {
            for element in elements {
                if let InputValue::Object(child) = element {
                    self.apply_nested(tx, owner, owner_type, relation, child, depth, tally)?;
                }
            }
        }

        for (relation, elements) in relations {
            for element in elements {
                match element {
                    InputValue::Object(_) => {}
                    InputValue::Scalar(PropertyValue::String(target)) => {
                        self.link(tx, owner, owner_type, relation, target, tally)?;
                    }
                    InputValue::Scalar(PropertyValue::Null) => {
                        self.unlink_all(tx, owner, owner_type, relation, tally)?;
                    }
                    _ => {
                        return Err(MutationError::Validation(format!(
                            "Field '{}' of {} expects nested objects or identifiers",
                            relation.predicate, owner_type
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_nested<T: GraphTransaction>(
        &self,
        tx: &mut T,
        owner: &EntityId,
        owner_type: EntityType,
        relation: &RelationDef,
        child: &EntityInput,
        depth: usize,
        tally: &mut Tally,
    ) -> EngineResult<()> {
        if !relation.ownership.allows_inline() {
            return Err(MutationError::Validation(format!(
                "Field '{}' of {} links existing entities; pass identifiers instead of objects",
                relation.predicate, owner_type
            )));
        }

        match &child.id {
            None => {
                if relation.cardinality == Cardinality::One {
                    let existing = tx
                        .edges_from(owner, Some(&relation.predicate))?
                        .into_iter()
                        .find(Edge::is_ownership);
                    if let Some(edge) = existing {
                        return Err(MutationError::Validation(format!(
                            "{} {} already owns {} through '{}'; update it by id",
                            owner_type, owner, edge.target, relation.predicate
                        )));
                    }
                }

                let child_id = self.create_node(tx, relation.target, child, depth + 1, tally)?;
                tx.add_edge(Edge::ownership(
                    relation.predicate.clone(),
                    owner.clone(),
                    child_id,
                ))?;
                tally.edges_added += 1;
            }
            Some(raw) => {
                let child_id = self.ids.validate(self.dataset, raw)?;
                if !tx.exists(&child_id)? {
                    return Err(MutationError::NotFound(format!(
                        "{} {} not found",
                        relation.target, child_id
                    )));
                }

                let key = EdgeKey::new(relation.predicate.clone(), owner.clone(), child_id.clone());
                match tx.find_edge(&key)? {
                    Some(edge) if edge.is_ownership() => {
                        self.update_node(tx, relation.target, &child_id, child, depth + 1, tally)?;
                    }
                    _ => {
                        return Err(MutationError::OwnershipViolation(format!(
                            "{} is not owned by {} through '{}'",
                            child_id, owner, relation.predicate
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    fn link<T: GraphTransaction>(
        &self,
        tx: &mut T,
        owner: &EntityId,
        owner_type: EntityType,
        relation: &RelationDef,
        target: &str,
        tally: &mut Tally,
    ) -> EngineResult<()> {
        if !relation.ownership.allows_reference() {
            return Err(MutationError::Validation(format!(
                "Field '{}' of {} owns its elements; pass nested objects instead of identifiers",
                relation.predicate, owner_type
            )));
        }

        let target_id = self.ids.validate(self.dataset, target)?;
        let entity = tx
            .get_entity(&target_id)?
            .ok_or_else(|| MutationError::NotFound(format!("Entity {} not found", target_id)))?;
        if entity.entity_type != relation.target {
            return Err(MutationError::Validation(format!(
                "'{}' of {} expects {}, got {} {}",
                relation.predicate, owner_type, relation.target, entity.entity_type, target_id
            )));
        }

        let (added, replaced) = insert_association(tx, relation, owner, &target_id)?;
        if added {
            debug!("Linked {} -[{}]-> {}", owner, relation.predicate, target_id);
            tally.edges_added += 1;
        }
        tally.edges_removed += replaced.len();
        Ok(())
    }

    /// `null` on a relation field drops its association edges
    fn unlink_all<T: GraphTransaction>(
        &self,
        tx: &mut T,
        owner: &EntityId,
        owner_type: EntityType,
        relation: &RelationDef,
        tally: &mut Tally,
    ) -> EngineResult<()> {
        if !relation.ownership.allows_reference() {
            return Err(MutationError::Validation(format!(
                "Field '{}' of {} owns its elements and cannot be cleared",
                relation.predicate, owner_type
            )));
        }

        for edge in tx.edges_from(owner, Some(&relation.predicate))? {
            if !edge.is_ownership() && tx.remove_edge(&edge.key())? {
                tally.edges_removed += 1;
            }
        }
        Ok(())
    }
}
