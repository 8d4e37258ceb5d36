//! Read projection of entities into nested trees

use crate::graph::{Entity, EntityId, EntityType, PropertyMap, PropertyValue};
use crate::repository::{GraphTransaction, RepositoryResult};
use crate::schema::{Cardinality, SchemaRegistry};
use indexmap::IndexMap;
use serde::Serialize;

/// An entity with its relation fields expanded
///
/// Serializes flat, GraphQL style: `{"id": .., "type": .., <fields>, <relations>}`.
/// Entities beyond the projection depth, or already on the current path, appear
/// as stubs carrying only id and type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityTree {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    #[serde(flatten)]
    pub fields: PropertyMap,
    #[serde(flatten)]
    pub relations: IndexMap<String, RelationValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RelationValue {
    One(Option<Box<EntityTree>>),
    Many(Vec<EntityTree>),
}

impl RelationValue {
    pub fn trees(&self) -> Vec<&EntityTree> {
        match self {
            RelationValue::One(tree) => tree.iter().map(|t| &**t).collect(),
            RelationValue::Many(trees) => trees.iter().collect(),
        }
    }
}

impl EntityTree {
    fn stub(id: EntityId, entity_type: EntityType) -> Self {
        EntityTree {
            id,
            entity_type,
            fields: PropertyMap::new(),
            relations: IndexMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&PropertyValue> {
        self.fields.get(name)
    }

    pub fn relation(&self, name: &str) -> Option<&RelationValue> {
        self.relations.get(name)
    }

    /// Related entities of a relation field (empty if unset)
    pub fn children(&self, name: &str) -> Vec<&EntityTree> {
        self.relation(name).map(RelationValue::trees).unwrap_or_default()
    }

    /// Identifiers held by a relation field
    pub fn ids(&self, name: &str) -> Vec<&EntityId> {
        self.children(name).into_iter().map(|t| &t.id).collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

pub struct Projector<'a> {
    registry: &'a SchemaRegistry,
    depth: usize,
}

impl<'a> Projector<'a> {
    pub fn new(registry: &'a SchemaRegistry, depth: usize) -> Self {
        Projector { registry, depth }
    }

    /// Project one entity. `None` if absent or not of the requested type.
    pub fn project<T: GraphTransaction>(
        &self,
        tx: &T,
        entity_type: Option<EntityType>,
        id: &EntityId,
    ) -> RepositoryResult<Option<EntityTree>> {
        let entity = tx
            .get_entity(id)?
            .filter(|e| entity_type.map_or(true, |t| e.entity_type == t));
        match entity {
            Some(entity) => Ok(Some(self.build(tx, entity, self.depth, &mut Vec::new())?)),
            None => Ok(None),
        }
    }

    /// Project every entity of a type
    pub fn list<T: GraphTransaction>(
        &self,
        tx: &T,
        entity_type: EntityType,
    ) -> RepositoryResult<Vec<EntityTree>> {
        tx.entities_of_type(entity_type)?
            .into_iter()
            .map(|entity| self.build(tx, entity, self.depth, &mut Vec::new()))
            .collect()
    }

    fn build<T: GraphTransaction>(
        &self,
        tx: &T,
        entity: Entity,
        depth_left: usize,
        path: &mut Vec<EntityId>,
    ) -> RepositoryResult<EntityTree> {
        let mut tree = EntityTree::stub(entity.id, entity.entity_type);
        tree.fields = entity.fields;

        let Ok(schema) = self.registry.get(tree.entity_type) else {
            return Ok(tree);
        };

        path.push(tree.id.clone());
        for relation in schema.relations() {
            let mut related = Vec::new();
            for edge in tx.edges_from(&tree.id, Some(&relation.predicate))? {
                if depth_left == 0 || path.contains(&edge.target) {
                    related.push(EntityTree::stub(edge.target, relation.target));
                    continue;
                }
                if let Some(child) = tx.get_entity(&edge.target)? {
                    related.push(self.build(tx, child, depth_left - 1, path)?);
                }
            }

            if related.is_empty() {
                continue;
            }
            let value = match relation.cardinality {
                Cardinality::One => RelationValue::One(related.into_iter().next().map(Box::new)),
                Cardinality::Many => RelationValue::Many(related),
            };
            tree.relations
                .insert(relation.predicate.as_str().to_string(), value);
        }
        path.pop();

        Ok(tree)
    }
}
